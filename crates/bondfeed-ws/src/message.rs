//! Inbound message classification.
//!
//! The server sends JSON envelopes of the form `{"type": ..., "payload": ...}`.
//! The bond backend uses `data` instead of `payload`; both are accepted.

use crate::error::{WsError, WsResult};
use crate::event::FeedEvent;
use bondfeed_core::Transaction;
use serde::Deserialize;
use serde_json::Value;

/// Snapshot sent once after the connection opens.
pub const TYPE_INITIAL_DATA: &str = "initial_data";
/// Incremental batch of transactions.
pub const TYPE_NEW_TRANSACTIONS: &str = "new_transactions";
/// Single-transaction broadcast used by the bond backend.
pub const TYPE_NEW_TRANSACTION: &str = "new_transaction";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default, alias = "data")]
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Transaction>),
    One(Transaction),
}

impl From<OneOrMany> for Vec<Transaction> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(txs) => txs,
            OneOrMany::One(tx) => vec![tx],
        }
    }
}

/// A data-bearing message recognised by the connector.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    InitialData(Vec<Transaction>),
    NewTransactions(Vec<Transaction>),
}

impl InboundMessage {
    pub fn into_event(self) -> FeedEvent {
        match self {
            Self::InitialData(txs) => FeedEvent::InitialData(txs),
            Self::NewTransactions(txs) => FeedEvent::NewTransactions(txs),
        }
    }
}

/// Classify a raw text frame.
///
/// Returns `Ok(None)` for well-formed messages of a type the feed does not
/// consume (e.g. `bond_update`), and `Err` for anything malformed. Neither
/// outcome is surfaced to listeners.
pub fn classify(text: &str) -> WsResult<Option<InboundMessage>> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let kind = envelope.kind.ok_or(WsError::MissingType)?;

    let invalid = |e: serde_json::Error| WsError::InvalidPayload {
        kind: kind.clone(),
        reason: e.to_string(),
    };

    match kind.as_str() {
        TYPE_INITIAL_DATA => {
            // An absent snapshot is an empty one
            if envelope.payload.is_null() {
                return Ok(Some(InboundMessage::InitialData(Vec::new())));
            }
            let txs: Vec<Transaction> = serde_json::from_value(envelope.payload).map_err(invalid)?;
            Ok(Some(InboundMessage::InitialData(txs)))
        }
        TYPE_NEW_TRANSACTIONS | TYPE_NEW_TRANSACTION => {
            if envelope.payload.is_null() {
                return Err(WsError::InvalidPayload {
                    kind: kind.clone(),
                    reason: "missing payload".to_string(),
                });
            }
            let txs: OneOrMany = serde_json::from_value(envelope.payload).map_err(invalid)?;
            Ok(Some(InboundMessage::NewTransactions(txs.into())))
        }
        _ => Ok(None),
    }
}
