//! Integration test support for bondfeed-ws.
//!
//! These tests run the connector against a local WebSocket server:
//! - Connection lifecycle and idempotent connect
//! - Message classification over a real transport
//! - Reconnection and teardown behavior

pub mod common;
