use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::state::AppState;

/// Content type for the extensions the loading page ships with
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => Some("text/html"),
        Some("css") => Some("text/css"),
        Some("js") => Some("application/javascript"),
        _ => None,
    }
}

/// Map a request path onto a file next to the page markup, refusing anything
/// that could escape that directory
fn asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(relative))
}

/// Fallback route: page assets by extension, the page markup for everything else
pub async fn serve_page(State(state): State<AppState>, uri: Uri) -> Response {
    let html_file = &state.config.html_file;

    if let Some(root) = html_file.parent() {
        if let Some(asset) = asset_path(root, uri.path()) {
            if let Some(content_type) = content_type_for(&asset) {
                if let Ok(body) = tokio::fs::read(&asset).await {
                    debug!("Serving asset {}", asset.display());
                    return ([(header::CONTENT_TYPE, content_type)], body).into_response();
                }
            }
        }
    }

    match tokio::fs::read(html_file).await {
        Ok(body) => ([(header::CONTENT_TYPE, "text/html")], body).into_response(),
        Err(e) => {
            debug!("Failed to read {}: {}", html_file.display(), e);
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}
