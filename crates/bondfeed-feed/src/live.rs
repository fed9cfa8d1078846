//! Live feed binding.
//!
//! `LiveFeed` subscribes to all five connector events, folds the data-bearing
//! ones through the reducer and tracks connection status. Consumers read a
//! `LiveSnapshot` and can await changes through a `watch` revision counter.

use crate::reducer::{FeedReducer, FeedState};
use bondfeed_core::Transaction;
use bondfeed_ws::{EventKind, FeedConnector, FeedEvent, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Message shown while the transport is failing.
pub const CONNECTION_ERROR_MESSAGE: &str = "WebSocket connection error";

/// Display-ready view of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    /// Transactions, newest first.
    pub transactions: Vec<Transaction>,
    /// `true` until the initial snapshot has arrived.
    pub loading: bool,
    pub connected: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct ViewState {
    feed: FeedState,
    connected: bool,
    error: Option<String>,
}

struct Shared {
    reducer: FeedReducer,
    view: Mutex<ViewState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn apply(&self, event: &FeedEvent) {
        {
            let mut view = self.view.lock();
            match event {
                FeedEvent::InitialData(txs) => {
                    let feed = std::mem::take(&mut view.feed);
                    view.feed = self.reducer.on_initial_data(feed, txs.iter().cloned());
                    debug!(count = view.feed.len(), "Live view seeded");
                }
                FeedEvent::NewTransactions(txs) => {
                    let feed = std::mem::take(&mut view.feed);
                    view.feed = self.reducer.on_new_transactions(feed, txs.iter().cloned());
                    debug!(
                        incoming = txs.len(),
                        count = view.feed.len(),
                        "Live view merged"
                    );
                }
                FeedEvent::Open => {
                    view.connected = true;
                    view.error = None;
                }
                FeedEvent::Close { .. } => {
                    view.connected = false;
                }
                FeedEvent::Error { message } => {
                    warn!(%message, "Live feed transport error");
                    view.connected = false;
                    view.error = Some(CONNECTION_ERROR_MESSAGE.to_string());
                }
            }
        }
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn snapshot(&self) -> LiveSnapshot {
        let view = self.view.lock();
        LiveSnapshot {
            transactions: view.feed.transactions().to_vec(),
            loading: view.feed.is_loading(),
            connected: view.connected,
            error: view.error.clone(),
        }
    }
}

/// Reducer-backed live view over a `FeedConnector`.
///
/// Dropping the `LiveFeed` removes its listeners; if they were the
/// connector's last, the connection is torn down.
pub struct LiveFeed {
    shared: Arc<Shared>,
    connector: FeedConnector,
    _subscriptions: Vec<Subscription>,
}

impl LiveFeed {
    /// Register the view's listeners without opening the connection.
    pub fn new(connector: &FeedConnector, reducer: FeedReducer) -> Self {
        let (revision, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            reducer,
            view: Mutex::new(ViewState::default()),
            revision,
        });

        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let shared = shared.clone();
                connector.add_event_listener(kind, move |event| shared.apply(event))
            })
            .collect();

        Self {
            shared,
            connector: connector.clone(),
            _subscriptions: subscriptions,
        }
    }

    /// Register the view's listeners and connect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(connector: &FeedConnector, reducer: FeedReducer) -> Self {
        let live = Self::new(connector, reducer);
        connector.connect();
        live
    }

    pub fn connector(&self) -> &FeedConnector {
        &self.connector
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.shared.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.view.lock().connected
    }

    pub fn is_loading(&self) -> bool {
        self.shared.view.lock().feed.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.view.lock().error.clone()
    }

    /// Receiver whose value is bumped on every view change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}
