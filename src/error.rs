use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or bootstrapping the status file
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to read status file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors talking to the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub control loop is no longer running
    #[error("connection hub is closed")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
}

/// Errors starting or running the HTTP server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
