//! Mock transaction feed server for integration tests.
//!
//! Provides a simple WebSocket server that can:
//! - Accept connections and send a greeting (e.g. an `initial_data` frame)
//! - Push frames to every connected client
//! - Close every client connection from the server side

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Command {
    Send(String),
    CloseAll,
}

#[derive(Default)]
struct Counters {
    connections: u32,
    client_closes: u32,
}

/// A mock feed server for testing.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<Command>,
    counters: Arc<Mutex<Counters>>,
}

impl MockFeedServer {
    /// Start a server that sends nothing on connect.
    pub async fn start() -> Self {
        Self::start_with_greeting(Vec::new()).await
    }

    /// Start a server that sends `greeting` frames to each new connection.
    pub async fn start_with_greeting(greeting: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counters = Arc::new(Mutex::new(Counters::default()));
        let (commands, _) = broadcast::channel::<Command>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let counters_clone = counters.clone();
        let commands_clone = commands.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            greeting.clone(),
                            commands_clone.subscribe(),
                            counters_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            counters,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of completed WebSocket handshakes.
    pub async fn connection_count(&self) -> u32 {
        self.counters.lock().await.connections
    }

    /// Number of connections the client closed with a Close frame.
    pub async fn client_close_count(&self) -> u32 {
        self.counters.lock().await.client_closes
    }

    /// Push a text frame to every connected client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.commands.send(Command::Send(frame.into()));
    }

    /// Close every client connection with a Close frame.
    pub fn close_all(&self) {
        let _ = self.commands.send(Command::CloseAll);
    }

    /// Shutdown the listener.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    greeting: Vec<String>,
    mut commands: broadcast::Receiver<Command>,
    counters: Arc<Mutex<Counters>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    counters.lock().await.connections += 1;

    let (mut write, mut read) = ws_stream.split();

    for frame in greeting {
        if write.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Ok(Command::Send(frame)) => {
                        if write.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Command::CloseAll) => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    Err(_) => break,
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        counters.lock().await.client_closes += 1;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
}
