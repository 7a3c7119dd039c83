use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::state::AppState;

/// Raw content of the status file
pub async fn status_text(State(state): State<AppState>) -> Response {
    match state.status_file.read().await {
        Ok(content) => ([(header::CONTENT_TYPE, "text/plain")], content).into_response(),
        Err(e) => {
            warn!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Status not available").into_response()
        }
    }
}
