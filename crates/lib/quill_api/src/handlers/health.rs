//! Health endpoint.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::HealthResponse;

/// `GET /api/health` — core version and credit-ledger reachability.
pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        version: quill_core::version().to_string(),
        ledger_connected: state.ledger.is_reachable().await,
    }))
}
