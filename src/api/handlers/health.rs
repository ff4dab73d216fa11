//! Health endpoint reporting the backend store's state

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::routes::ApiState;

pub const UNHEALTHY_STATUS_TEXT: &str =
    "Internal Server Error your backend store is unhealthy, has it been initialized and unsealed?";

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: u16,
    pub status_text: String,
}

/// `GET /v1/health`
///
/// 200 when the store reports healthy, 500 otherwise. With redirects configured
/// only the default backend is probed.
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    if state.store.healthy().await {
        let status = StatusCode::OK;
        return (
            status,
            Json(HealthResponse { status: status.as_u16(), status_text: "OK".to_string() }),
        );
    }

    warn!("Backend store reported unhealthy");
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (
        status,
        Json(HealthResponse {
            status: status.as_u16(),
            status_text: UNHEALTHY_STATUS_TEXT.to_string(),
        }),
    )
}
