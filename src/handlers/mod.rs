pub mod eligibility;
pub mod health;
pub mod payment_sessions;
pub mod setup_tokens;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Upper bound on a whole request; processor calls time out well before this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks", post(webhooks::receive_webhook))
        .route(
            "/orders/:order_id/payment-session",
            post(payment_sessions::create_payment_session),
        )
        .route(
            "/orders/:order_id/payer-action",
            get(payment_sessions::get_payer_action),
        )
        .route("/orders/:order_id/retry", post(payment_sessions::retry_payment))
        .route("/checkout/eligibility", post(eligibility::check_eligibility))
        .route("/setup-tokens", post(setup_tokens::create_setup_token))
}

/// Full application router with HTTP tracing and a request timeout.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
