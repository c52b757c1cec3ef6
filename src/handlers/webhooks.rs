use axum::{extract::State, http::HeaderMap, response::Json};
use bytes::Bytes;
use metrics::counter;
use tracing::{info, warn};

use crate::{
    errors::ServiceError,
    webhooks::{signature::verify_signature, ReconciliationResult, WebhookNotification, WebhookResponse},
    AppState,
};

fn outcome_label(result: &ReconciliationResult) -> &'static str {
    match result {
        ReconciliationResult::NotResponsible => "not_responsible",
        ReconciliationResult::MalformedPayload(_) => "malformed",
        ReconciliationResult::MissingCorrelationKey => "missing_correlation_key",
        ReconciliationResult::NoMatchingSubscription { .. } => "no_matching_subscription",
        ReconciliationResult::LookupFailed(_) => "lookup_failed",
        ReconciliationResult::Reconciled { .. } => "reconciled",
    }
}

// POST /api/v1/webhooks
//
// Answers 200 for every notification it could authenticate, including
// business failures; only a bad signature is rejected.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ServiceError> {
    if let Some(secret) = state.config.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
        let now = chrono::Utc::now().timestamp();
        if let Err(err) = verify_signature(
            &headers,
            &body,
            secret,
            state.config.webhook_tolerance_secs,
            now,
        ) {
            warn!(error = %err, "webhook signature verification failed");
            counter!("webhooks.rejected", 1);
            return Err(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            ));
        }
    }

    let notification: WebhookNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(err) => {
            warn!(error = %err, "unparseable webhook payload");
            counter!("webhooks.received", 1, "outcome" => "malformed");
            return Ok(Json(
                ReconciliationResult::MalformedPayload(format!("Invalid notification payload: {}", err))
                    .into_response(),
            ));
        }
    };

    info!(webhook_id = ?notification.id, event_type = %notification.event_type, "webhook received");
    let result = state.webhooks.dispatch(&notification).await;
    counter!("webhooks.received", 1, "outcome" => outcome_label(&result));

    Ok(Json(result.into_response()))
}
