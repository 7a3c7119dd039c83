use std::sync::Arc;

use crate::config::Config;
use crate::services::status_file::StatusFile;
use crate::websocket::hub::HubHandle;

/// Shared by every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: HubHandle,
    pub status_file: StatusFile,
}
