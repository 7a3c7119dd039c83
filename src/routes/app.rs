use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{health_check, serve_page, status_text};
use crate::state::AppState;
use crate::websocket::handler::websocket_handler;

/// Path of the raw status endpoint, named after the file the page used to fetch directly
pub const STATUS_PATH: &str = "/loading-status.txt";

/// Create the application routes
pub fn create_app_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route(STATUS_PATH, get(status_text))
        .route("/healthz", get(health_check))
        .fallback(serve_page)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
