//! Feed connector lifecycle integration tests.
//!
//! Tests the connection lifecycle against a local server:
//! - Connection establishment and idempotent connect
//! - Event dispatch order over a real transport
//! - Reconnection, explicit disconnect and last-listener teardown

mod integration;
use integration::common::mock_feed::MockFeedServer;

use bondfeed_ws::{
    ConnectionState, ConnectorConfig, EventKind, FeedConnector, FeedEvent, ReconnectConfig,
    ReconnectPhase, Subscription,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

type EventLog = Arc<Mutex<Vec<FeedEvent>>>;

fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay_ms: 50,
        max_delay_ms: 200,
        multiplier: 2.0,
        max_jitter_ms: 0,
        max_attempts,
    }
}

fn connector_for(url: String, max_attempts: u32) -> FeedConnector {
    FeedConnector::new(ConnectorConfig {
        url,
        reconnect: fast_reconnect(max_attempts),
    })
}

/// Register one recorder for every event kind.
fn record_all(connector: &FeedConnector) -> (Vec<Subscription>, EventLog) {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let subs = EventKind::ALL
        .into_iter()
        .map(|kind| {
            let sink = log.clone();
            connector.add_event_listener(kind, move |event| sink.lock().push(event.clone()))
        })
        .collect();
    (subs, log)
}

fn count(log: &EventLog, kind: EventKind) -> usize {
    log.lock().iter().filter(|e| e.kind() == kind).count()
}

fn kinds(log: &EventLog) -> Vec<EventKind> {
    log.lock().iter().map(FeedEvent::kind).collect()
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let reached = timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "Timed out waiting for: {what}");
}

fn initial_frame() -> String {
    serde_json::json!({
        "type": "initial_data",
        "payload": [
            {"id": 1, "isin": "INE0001", "created_at": "2024-03-01T10:00:00Z"},
            {"id": 2, "isin": "INE0002", "created_at": "2024-03-01T09:59:00Z"}
        ]
    })
    .to_string()
}

/// Test that connect opens the feed and delivers the snapshot after `open`.
#[tokio::test]
async fn test_connect_emits_open_then_initial_data() {
    let server = MockFeedServer::start_with_greeting(vec![initial_frame()]).await;
    let connector = connector_for(server.url(), 3);
    let (_subs, log) = record_all(&connector);

    connector.connect();

    wait_until("initial data", || count(&log, EventKind::InitialData) == 1).await;
    assert_eq!(connector.state(), ConnectionState::Connected);
    assert_eq!(kinds(&log), vec![EventKind::Open, EventKind::InitialData]);

    match &log.lock()[1] {
        FeedEvent::InitialData(txs) => assert_eq!(txs.len(), 2),
        other => panic!("Expected InitialData, got {other:?}"),
    }

    connector.disconnect();
    server.shutdown().await;
}

/// Test that repeated connect calls reuse the live connection.
#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = MockFeedServer::start().await;
    let connector = connector_for(server.url(), 3);
    let (_subs, log) = record_all(&connector);

    connector.connect();
    connector.connect();
    wait_until("open", || connector.is_connected()).await;
    connector.connect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(count(&log, EventKind::Open), 1);

    connector.disconnect();
    server.shutdown().await;
}

/// Test that pushed batches arrive in order and junk frames are skipped.
#[tokio::test]
async fn test_pushed_batches_delivered_in_order() {
    let server = MockFeedServer::start().await;
    let connector = connector_for(server.url(), 3);
    let (_subs, log) = record_all(&connector);

    connector.connect();
    wait_until("open", || connector.is_connected()).await;

    server.push(r#"{"type": "new_transactions", "payload": [{"id": "a"}]}"#);
    server.push(r#"{"type": "bond_update", "data": {"isin": "INE0001"}}"#);
    server.push("garbage");
    server.push(r#"{"type": "new_transaction", "data": {"id": "b"}}"#);

    wait_until("two batches", || count(&log, EventKind::NewTransactions) == 2).await;

    let ids: Vec<String> = log
        .lock()
        .iter()
        .filter_map(|event| match event {
            FeedEvent::NewTransactions(txs) => txs[0].id.as_ref().map(|id| id.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(connector.state(), ConnectionState::Connected);
    assert_eq!(count(&log, EventKind::Error), 0);

    connector.disconnect();
    server.shutdown().await;
}

/// Test that a server-side close triggers `close` and a backoff reconnect.
#[tokio::test]
async fn test_server_close_reconnects() {
    let server = MockFeedServer::start().await;
    let connector = connector_for(server.url(), 0);
    let (_subs, log) = record_all(&connector);

    connector.connect();
    wait_until("open", || connector.is_connected()).await;

    server.close_all();

    wait_until("second open", || count(&log, EventKind::Open) == 2).await;
    assert_eq!(server.connection_count().await, 2);
    assert_eq!(
        kinds(&log),
        vec![EventKind::Open, EventKind::Close, EventKind::Open]
    );
    assert_eq!(connector.reconnect_attempts(), 0);

    connector.disconnect();
    server.shutdown().await;
}

/// Test that a refused connection reports `error` then `close` and stops
/// after the configured number of retries.
#[tokio::test]
async fn test_refused_connection_respects_max_attempts() {
    // Reserve a port, then free it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let connector = connector_for(url, 2);
    let (_subs, log) = record_all(&connector);

    connector.connect();

    // Initial attempt + 2 retries, each reporting error then close
    wait_until("retries exhausted", || {
        count(&log, EventKind::Close) == 3 && connector.reconnect_phase() == ReconnectPhase::Idle
    })
    .await;

    assert_eq!(connector.state(), ConnectionState::Error);
    assert_eq!(count(&log, EventKind::Open), 0);
    assert_eq!(
        kinds(&log),
        vec![
            EventKind::Error,
            EventKind::Close,
            EventKind::Error,
            EventKind::Close,
            EventKind::Error,
            EventKind::Close,
        ]
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(count(&log, EventKind::Error), 3, "No retries after giving up");
}

/// Test that explicit disconnect closes once and suppresses reconnection.
#[tokio::test]
async fn test_disconnect_is_terminal() {
    let server = MockFeedServer::start().await;
    let connector = connector_for(server.url(), 0);
    let (_subs, log) = record_all(&connector);

    connector.connect();
    wait_until("open", || connector.is_connected()).await;

    connector.disconnect();
    assert_eq!(connector.state(), ConnectionState::Disconnected);
    assert_eq!(count(&log, EventKind::Close), 1);

    let closed = timeout(Duration::from_secs(3), async {
        while server.client_close_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "Server should see a client Close frame");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count().await, 1, "No reconnect after disconnect");
    assert_eq!(count(&log, EventKind::Close), 1);
    assert_eq!(connector.reconnect_phase(), ReconnectPhase::Idle);

    // A fresh connect brings it back
    connector.connect();
    wait_until("reopen", || count(&log, EventKind::Open) == 2).await;

    connector.disconnect();
    server.shutdown().await;
}

/// Test that dropping the last listener tears the connection down and that a
/// later subscriber can connect again.
#[tokio::test]
async fn test_last_unsubscribe_tears_down() {
    let server = MockFeedServer::start().await;
    let connector = connector_for(server.url(), 0);
    let (subs, _log) = record_all(&connector);

    connector.connect();
    wait_until("open", || connector.is_connected()).await;

    let mut subs = subs;
    let last = subs.pop().unwrap();
    drop(subs);
    assert_eq!(connector.state(), ConnectionState::Connected);

    last.unsubscribe();
    assert_eq!(connector.state(), ConnectionState::Disconnected);
    assert_eq!(connector.listener_count(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connection_count().await, 1);

    let (_subs, log) = record_all(&connector);
    connector.connect();
    wait_until("reopen", || count(&log, EventKind::Open) == 1).await;
    assert_eq!(server.connection_count().await, 2);

    connector.disconnect();
    server.shutdown().await;
}

/// Test that a panicking listener does not break dispatch or the connection.
#[tokio::test]
async fn test_panicking_listener_isolated() {
    let server = MockFeedServer::start_with_greeting(vec![initial_frame()]).await;
    let connector = connector_for(server.url(), 0);

    let _bad = connector.add_event_listener(EventKind::InitialData, |_| panic!("listener bug"));
    let (_subs, log) = record_all(&connector);

    connector.connect();
    wait_until("initial data", || count(&log, EventKind::InitialData) == 1).await;

    server.push(r#"{"type": "new_transactions", "payload": [{"id": 3}]}"#);
    wait_until("batch", || count(&log, EventKind::NewTransactions) == 1).await;
    assert_eq!(connector.state(), ConnectionState::Connected);

    connector.disconnect();
    server.shutdown().await;
}
