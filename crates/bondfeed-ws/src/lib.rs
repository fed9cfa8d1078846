//! Live transaction feed connector.
//!
//! Provides a single managed WebSocket connection to the transaction feed with:
//! - Idempotent connect and explicit, terminal disconnect
//! - Automatic reconnection with exponential backoff
//! - Classification of inbound frames into typed feed events
//! - Listener registration with disposable subscription handles

pub mod connection;
pub mod error;
pub mod event;
pub mod listener;
pub mod message;
pub mod reconnect;

pub use connection::{ConnectionState, ConnectorConfig, FeedConnector};
pub use error::{WsError, WsResult};
pub use event::{EventKind, FeedEvent};
pub use listener::{ListenerId, Subscription};
pub use message::{classify, InboundMessage};
pub use reconnect::{ReconnectConfig, ReconnectPhase, ReconnectPolicy};
