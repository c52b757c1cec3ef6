use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::ServiceError,
    models::{BillingContact, CheckoutSession, Notice, OrderId, OrderStatus},
    processor::PaymentSourceKind,
    services::payment_session::PaymentSessionOutcome,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct PaymentSessionRequest {
    pub payment_source: PaymentSourceKind,
    #[serde(default)]
    pub contact: Option<BillingContact>,
    #[serde(default)]
    pub session: Option<CheckoutSession>,
}

#[derive(Debug, Serialize)]
pub struct PaymentSessionResponse {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub outcome: PaymentSessionOutcome,
    pub notices: Vec<Notice>,
    pub cart_cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct PayerActionResponse {
    pub order_id: OrderId,
    pub href: String,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

// POST /api/v1/orders/:order_id/payment-session
pub async fn create_payment_session(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(request): Json<PaymentSessionRequest>,
) -> ApiResult<PaymentSessionResponse> {
    let mut session = request.session.unwrap_or_default();
    let outcome = state
        .payment_session_service()
        .begin_payment(order_id, request.payment_source, request.contact, &mut session)
        .await
        .map_err(ServiceError::from)?;

    info!(%order_id, "payment session started");
    Ok(Json(ApiResponse::success(PaymentSessionResponse {
        order_id,
        outcome,
        notices: session.notices().to_vec(),
        cart_cleared: session.cart_cleared(),
    })))
}

// GET /api/v1/orders/:order_id/payer-action
pub async fn get_payer_action(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> ApiResult<PayerActionResponse> {
    let href = state
        .payment_session_service()
        .payer_action_url(order_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} has no payer action", order_id)))?;

    Ok(Json(ApiResponse::success(PayerActionResponse { order_id, href })))
}

// POST /api/v1/orders/:order_id/retry
pub async fn retry_payment(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> ApiResult<OrderStatusResponse> {
    let change = state.order_status_service().retry(order_id).await?;
    Ok(Json(ApiResponse::success(OrderStatusResponse {
        order_id,
        status: change.order.status,
    })))
}
