use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use metrics::counter;

use crate::{ApiResponse, AppState};

// POST /api/v1/setup-tokens
//
// Processor failures are logged by the service; the buyer only learns that
// vaulting did not work.
pub async fn create_setup_token(State(state): State<AppState>) -> Response {
    match state.setup_token_service().create_setup_token().await {
        Ok(token) => {
            counter!("vault.setup_tokens.created", 1);
            (StatusCode::OK, Json(ApiResponse::success(token))).into_response()
        }
        Err(_) => {
            counter!("vault.setup_tokens.failed", 1);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::<()>::error(
                    "Could not create setup token.".to_string(),
                )),
            )
                .into_response()
        }
    }
}
