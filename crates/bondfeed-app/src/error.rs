//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] bondfeed_feed::FeedError),

    #[error("API error: {0}")]
    Api(#[from] crate::api::ApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
