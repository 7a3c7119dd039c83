use std::path::PathBuf;
use tracing::info;

use crate::error::StatusError;

/// Placeholder written when the status file does not exist yet
pub const INITIAL_STATUS: &str = "Loading status... Server starting...";

/// The externally written progress file
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the current content of the file. Bytes that are not UTF-8 become U+FFFD.
    pub async fn read(&self) -> Result<String, StatusError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StatusError::Read {
                path: self.path.clone(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Create the parent directory and a placeholder file if they are missing.
    /// An existing file is left untouched.
    pub async fn ensure_exists(&self) -> Result<(), StatusError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StatusError::Create {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }

        tokio::fs::write(&self.path, INITIAL_STATUS)
            .await
            .map_err(|source| StatusError::Create {
                path: self.path.clone(),
                source,
            })?;
        info!("Created status file {}", self.path.display());
        Ok(())
    }
}
