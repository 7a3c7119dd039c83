use axum::{extract::State, http::StatusCode, Json};
use tracing::debug;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Health check requested");
    match state.hub.connection_count().await {
        Ok(connections) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                message: "Server is running".to_string(),
                connections,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "error".to_string(),
                message: e.to_string(),
                connections: 0,
            }),
        ),
    }
}
