//! Browser-facing websocket: the upgrade endpoint and the connection hub.

pub mod handler;
pub mod hub;
