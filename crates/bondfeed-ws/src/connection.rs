//! Feed connection manager.
//!
//! Owns the single WebSocket connection to the transaction feed, drives the
//! reconnect state machine and dispatches classified messages to listeners.

use crate::error::WsError;
use crate::event::{EventKind, FeedEvent};
use crate::listener::{dispatch, ListenerId, ListenerRegistry, Subscription};
use crate::message::classify;
use crate::reconnect::{ReconnectConfig, ReconnectPhase, ReconnectPolicy};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Close code reported when the transport fails without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;
/// Close code reported for a client-initiated disconnect.
const NORMAL_CLOSE: u16 = 1000;

/// Connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// WebSocket URL of the transaction feed.
    pub url: String,
    /// Backoff between reconnection attempts.
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// How one transport session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Torn down locally; no events, no retry.
    Cancelled,
    /// Server close frame or end of stream.
    Closed { code: u16, reason: String },
    /// Connect or read failure.
    Failed(WsError),
}

struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}

/// Live transaction feed connector.
///
/// Clones share the same connection and listener registry. Construct one per
/// application and hand clones to consumers.
#[derive(Clone)]
pub struct FeedConnector {
    inner: Arc<ConnectorInner>,
}

pub(crate) struct ConnectorInner {
    config: ConnectorConfig,
    state: RwLock<ConnectionState>,
    phase: RwLock<ReconnectPhase>,
    reconnect_count: RwLock<u32>,
    listeners: Mutex<ListenerRegistry>,
    run: Mutex<Option<RunHandle>>,
}

impl FeedConnector {
    /// Create a new connector. Nothing is opened until `connect`.
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                phase: RwLock::new(ReconnectPhase::Idle),
                reconnect_count: RwLock::new(0),
                listeners: Mutex::new(ListenerRegistry::default()),
                run: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.inner.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Get current position in the retry cycle.
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        *self.inner.phase.read()
    }

    /// Retries since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        *self.inner.reconnect_count.read()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Open the feed.
    ///
    /// No-op while a connection task is live (connecting, connected or waiting
    /// to retry). Outcomes are reported through `open`/`error`/`close` events.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut run = self.inner.run.lock();
        if run.as_ref().is_some_and(RunHandle::is_live) {
            debug!(state = ?self.state(), "Connection already active, ignoring connect");
            return;
        }

        let token = CancellationToken::new();
        *self.inner.state.write() = ConnectionState::Connecting;
        *self.inner.phase.write() = ReconnectPhase::Attempting { attempt: 0 };
        *self.inner.reconnect_count.write() = 0;

        let task = tokio::spawn(self.inner.clone().run(token.clone()));
        *run = Some(RunHandle { token, task });
    }

    /// Close the feed and cancel any pending retry.
    ///
    /// Fires a single `close` event if a connection task was live. The
    /// connector stays down until `connect` is called again.
    pub fn disconnect(&self) {
        if self.inner.teardown("disconnect requested") {
            let handlers = self.inner.listeners.lock().snapshot(EventKind::Close);
            dispatch(
                &handlers,
                &FeedEvent::Close {
                    code: NORMAL_CLOSE,
                    reason: "Client disconnect".to_string(),
                },
            );
        }
    }

    /// Run a raw frame through classification and dispatch as if it had
    /// arrived on the transport (e.g. when replaying a captured session).
    pub fn inject_text(&self, text: &str) {
        self.inner.handle_text(&CancellationToken::new(), text);
    }

    /// Register `handler` for events of `kind`.
    ///
    /// Handlers for the same kind run in registration order. The returned
    /// handle removes exactly this registration when unsubscribed or dropped.
    pub fn add_event_listener<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        let id = self.inner.listeners.lock().add(kind, Arc::new(handler));
        debug!(event = %kind, ?id, "Listener registered");
        Subscription::new(id, kind, Arc::downgrade(&self.inner))
    }
}

impl ConnectorInner {
    pub(crate) fn remove_listener(&self, id: ListenerId) {
        let (removed, now_empty) = {
            let mut listeners = self.listeners.lock();
            let removed = listeners.remove(id);
            let now_empty = removed.is_some() && listeners.is_empty();
            (removed, now_empty)
        };
        // Dropped outside the lock: the handler may own further subscriptions
        drop(removed);
        debug!(?id, "Listener removed");

        if now_empty {
            self.teardown("last listener removed");
        }
    }

    /// Cancel the connection task. Returns whether one was live.
    fn teardown(&self, reason: &str) -> bool {
        let Some(handle) = self.run.lock().take() else {
            return false;
        };
        let was_live = handle.is_live();
        handle.token.cancel();

        *self.state.write() = ConnectionState::Disconnected;
        *self.phase.write() = ReconnectPhase::Idle;
        *self.reconnect_count.write() = 0;

        if was_live {
            info!(reason, "Feed connection torn down");
        }
        was_live
    }

    fn has_listeners(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    // The state setters and `emit` are no-ops once the run's token is
    // cancelled, so a stale task cannot overwrite a newer run's state.

    fn set_state(&self, token: &CancellationToken, state: ConnectionState) {
        if !token.is_cancelled() {
            *self.state.write() = state;
        }
    }

    fn set_phase(&self, token: &CancellationToken, phase: ReconnectPhase) {
        if !token.is_cancelled() {
            *self.phase.write() = phase;
        }
    }

    fn set_reconnect_count(&self, token: &CancellationToken, count: u32) {
        if !token.is_cancelled() {
            *self.reconnect_count.write() = count;
        }
    }

    fn emit(&self, token: &CancellationToken, event: FeedEvent) {
        if token.is_cancelled() {
            return;
        }
        let handlers = self.listeners.lock().snapshot(event.kind());
        dispatch(&handlers, &event);
    }

    /// Classify one text frame and dispatch it. Malformed and unknown
    /// messages are logged and dropped.
    fn handle_text(&self, token: &CancellationToken, text: &str) {
        match classify(text) {
            Ok(Some(message)) => {
                let event = message.into_event();
                if let FeedEvent::InitialData(txs) | FeedEvent::NewTransactions(txs) = &event {
                    debug!(event = %event.kind(), count = txs.len(), "Feed message received");
                }
                self.emit(token, event);
            }
            Ok(None) => {
                debug!(len = text.len(), "Ignoring message of unrecognized type");
            }
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed feed message");
            }
        }
    }

    /// Connection task: attempt, run session, back off, repeat.
    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            self.set_phase(
                &token,
                ReconnectPhase::Attempting {
                    attempt: policy.attempt_count(),
                },
            );
            self.set_state(&token, ConnectionState::Connecting);

            match self.run_session(&token, &mut policy).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed { code, reason } => {
                    warn!(code, %reason, "Feed connection closed");
                    self.set_state(&token, ConnectionState::Disconnected);
                    self.emit(&token, FeedEvent::Close { code, reason });
                }
                SessionEnd::Failed(e) => {
                    error!(error = %e, "Feed connection error");
                    let message = e.to_string();
                    self.set_state(&token, ConnectionState::Error);
                    self.emit(
                        &token,
                        FeedEvent::Error {
                            message: message.clone(),
                        },
                    );
                    self.emit(
                        &token,
                        FeedEvent::Close {
                            code: ABNORMAL_CLOSE,
                            reason: message,
                        },
                    );
                }
            }

            if token.is_cancelled() {
                break;
            }

            if !self.has_listeners() {
                info!("No listeners remain, not reconnecting");
                self.set_state(&token, ConnectionState::Disconnected);
                break;
            }

            let Some(delay) = policy.next_delay() else {
                let e = WsError::ConnectionFailed(format!(
                    "giving up after {} reconnection attempts",
                    policy.attempt_count()
                ));
                error!(error = %e, "Max reconnection attempts reached");
                self.set_state(&token, ConnectionState::Error);
                break;
            };

            let attempt = policy.attempt_count();
            self.set_reconnect_count(&token, attempt);
            self.set_phase(&token, ReconnectPhase::Waiting { attempt, delay });
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.set_phase(&token, ReconnectPhase::Idle);
        debug!("Feed connection task finished");
    }

    async fn run_session(
        &self,
        token: &CancellationToken,
        policy: &mut ReconnectPolicy,
    ) -> SessionEnd {
        info!(url = %self.config.url, "Connecting to feed");

        let connected = tokio::select! {
            biased;
            () = token.cancelled() => return SessionEnd::Cancelled,
            result = connect_async_tls_with_config(&self.config.url, None, true, None) => result,
        };
        let ws_stream = match connected {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => return SessionEnd::Failed(e.into()),
        };
        let (mut write, mut read) = ws_stream.split();

        if token.is_cancelled() {
            let _ = write.send(Message::Close(None)).await;
            return SessionEnd::Cancelled;
        }

        policy.reset();
        self.set_reconnect_count(token, 0);
        self.set_phase(token, ReconnectPhase::Idle);
        self.set_state(token, ConnectionState::Connected);
        info!("Feed connected");
        self.emit(token, FeedEvent::Open);

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send Close frame during teardown");
                    }
                    return SessionEnd::Cancelled;
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(token, &text);
                        }
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => self.handle_text(token, &text),
                            Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                return SessionEnd::Failed(e.into());
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((NORMAL_CLOSE, "Normal close".to_string()));
                            return SessionEnd::Closed { code, reason };
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return SessionEnd::Failed(e.into()),
                        None => {
                            return SessionEnd::Closed {
                                code: ABNORMAL_CLOSE,
                                reason: "Stream ended".to_string(),
                            };
                        }
                    }
                }
            }
        }
    }
}
