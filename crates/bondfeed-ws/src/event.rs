//! Feed events delivered to registered listeners.

use crate::error::WsError;
use bondfeed_core::Transaction;
use std::fmt;
use std::str::FromStr;

/// The fixed set of event names a listener can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InitialData,
    NewTransactions,
    Open,
    Close,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::InitialData,
        Self::NewTransactions,
        Self::Open,
        Self::Close,
        Self::Error,
    ];

    /// Event name as exposed to consumers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialData => "initialData",
            Self::NewTransactions => "newTransactions",
            Self::Open => "open",
            Self::Close => "close",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = WsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| WsError::UnknownEvent(s.to_string()))
    }
}

/// An event emitted by the connector.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Snapshot sent by the server once per connection.
    InitialData(Vec<Transaction>),
    /// Incremental batch pushed by the server.
    NewTransactions(Vec<Transaction>),
    /// Transport opened.
    Open,
    /// Transport closed (by the server, by a failure, or by `disconnect`).
    Close { code: u16, reason: String },
    /// Transport failure. Always followed by `Close`.
    Error { message: String },
}

impl FeedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::InitialData(_) => EventKind::InitialData,
            Self::NewTransactions(_) => EventKind::NewTransactions,
            Self::Open => EventKind::Open,
            Self::Close { .. } => EventKind::Close,
            Self::Error { .. } => EventKind::Error,
        }
    }
}
