use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ServiceError,
    models::{Cart, CheckoutSession, OrderId},
    services::checkout_eligibility::{is_valid_birth_date, DEFAULT_BIRTH_DATE_FORMAT},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub min: Decimal,
    pub max: Decimal,
    #[serde(default)]
    pub cart: Option<Cart>,
    #[serde(default)]
    pub order_pay: Option<OrderId>,
    /// Checked when present, e.g. for pay-upon-invoice style methods.
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub birth_date_format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub amount_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date_valid: Option<bool>,
}

// POST /api/v1/checkout/eligibility
pub async fn check_eligibility(
    State(state): State<AppState>,
    Json(request): Json<EligibilityRequest>,
) -> ApiResult<EligibilityResponse> {
    if request.min > request.max {
        return Err(ServiceError::BadRequest(
            "min must not exceed max".to_string(),
        ));
    }

    let mut session = request
        .cart
        .map(CheckoutSession::with_cart)
        .unwrap_or_default();
    session.order_pay = request.order_pay;
    let amount_allowed = state
        .eligibility_service()
        .is_amount_allowed(&session, request.min, request.max)
        .await?;

    let birth_date_valid = request.birth_date.as_deref().map(|date| {
        is_valid_birth_date(
            date,
            request
                .birth_date_format
                .as_deref()
                .unwrap_or(DEFAULT_BIRTH_DATE_FORMAT),
        )
    });

    Ok(Json(ApiResponse::success(EligibilityResponse {
        amount_allowed,
        birth_date_valid,
    })))
}
