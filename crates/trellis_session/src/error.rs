//! Error types for trellis_session

use std::path::PathBuf;

use thiserror::Error;

/// Failures of session persistence and configuration loading
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A blob source failed to read a blob
    #[error("blob source failed: {0}")]
    Blob(String),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for trellis_session operations
pub type Result<T> = std::result::Result<T, SessionError>;
