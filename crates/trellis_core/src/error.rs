//! Error types for trellis_core

use thiserror::Error;

/// Errors raised while reading or decoding widget state
#[derive(Error, Debug)]
pub enum CoreError {
    /// Source text was not valid JSON
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON was valid but not an object
    #[error("expected a JSON object, got: {0}")]
    NotAnObject(String),

    /// A state key held a value of an unexpected type
    #[error("state value for '{key}' is not a {expected}")]
    WrongType { key: String, expected: &'static str },
}

/// Result type for trellis_core operations
pub type Result<T> = std::result::Result<T, CoreError>;
