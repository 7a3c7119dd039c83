use serde::{Deserialize, Serialize};

/// API response for health check
#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Live websocket clients
    pub connections: usize,
}
