//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Message has no type discriminator")]
    MissingType,

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Unknown event name: {0}")]
    UnknownEvent(String),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type WsResult<T> = Result<T, WsError>;
