//! Error types for bondfeed-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
