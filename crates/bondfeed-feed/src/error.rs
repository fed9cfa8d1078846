//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),
}

pub type FeedResult<T> = Result<T, FeedError>;
