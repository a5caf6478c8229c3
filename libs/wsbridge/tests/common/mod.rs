//! Common test utilities for wsbridge integration tests
//!
//! Provides a scripted mock WebSocket server and event helpers.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use wsbridge::{BridgeEvent, ConnectionId, WebSocketBridge};

/// Default wait for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the mock server does with each accepted connection
#[derive(Debug, Clone)]
pub enum ServerBehavior {
    /// Echo text and binary frames back
    Echo,
    /// Send a close frame right after the handshake
    CloseWith { code: u16, reason: String },
    /// Send one binary frame, then wait for the client to go away
    SendBinary(Vec<u8>),
    /// Send a ping, then a text frame, then echo
    PingThenText(String),
    /// Drop the TCP stream right after the handshake
    DropAfterOpen,
    /// Complete the handshake, then never read or write again
    Mute,
    /// Send a close frame, then hold the stream open without reading
    CloseThenHold { code: u16, reason: String },
    /// Wait before answering the handshake, then echo
    DelayHandshake(Duration),
}

/// A scripted mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    origins: Arc<Mutex<Vec<Option<String>>>>,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockWsServer {
    /// Create and start a new echo server
    pub async fn start() -> Self {
        Self::start_with(ServerBehavior::Echo).await
    }

    /// Create and start a server with the given behavior
    pub async fn start_with(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let origins = Arc::new(Mutex::new(Vec::new()));
        let received = Arc::new(Mutex::new(Vec::new()));

        let shutdown_clone = Arc::clone(&shutdown);
        let origins_clone = Arc::clone(&origins);
        let received_clone = Arc::clone(&received);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = Arc::clone(&shutdown_clone);
                                let origins = Arc::clone(&origins_clone);
                                let received = Arc::clone(&received_clone);
                                let behavior = behavior.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, behavior, origins, received, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            origins,
            received,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        behavior: ServerBehavior,
        origins: Arc<Mutex<Vec<Option<String>>>>,
        received: Arc<Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
    ) {
        let record_origin = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let origin = request
                .headers()
                .get("origin")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            origins.lock().push(origin);
            Ok(response)
        };

        if let ServerBehavior::DelayHandshake(delay) = behavior {
            tokio::time::sleep(delay).await;
        }

        let ws_stream = match accept_hdr_async(stream, record_origin).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        match behavior {
            ServerBehavior::Echo => {}
            ServerBehavior::CloseWith { code, reason } => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: Cow::Owned(reason),
                };
                if write.send(Message::Close(Some(frame))).await.is_err() {
                    return;
                }
            }
            ServerBehavior::SendBinary(bytes) => {
                if write.send(Message::Binary(bytes)).await.is_err() {
                    return;
                }
            }
            ServerBehavior::PingThenText(text) => {
                if write.send(Message::Ping(vec![1, 2, 3])).await.is_err() {
                    return;
                }
                if write.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            ServerBehavior::DropAfterOpen => {
                return;
            }
            ServerBehavior::Mute => {
                shutdown.notified().await;
                return;
            }
            ServerBehavior::CloseThenHold { code, reason } => {
                let frame = CloseFrame {
                    code: CloseCode::from(code),
                    reason: Cow::Owned(reason),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                shutdown.notified().await;
                return;
            }
            ServerBehavior::DelayHandshake(_) => {}
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if let Message::Text(ref text) = msg {
                                received.lock().push(text.clone());
                            }
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            // Close frames are answered by the framing layer on the next read
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Origin headers seen on each handshake, in accept order
    pub fn origins(&self) -> Vec<Option<String>> {
        self.origins.lock().clone()
    }

    /// Text payloads received from clients
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A TCP server that accepts connections but never answers the handshake
pub struct SilentServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => held.push(stream),
                            Err(_) => break,
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self { addr, shutdown }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

/// URL of a local port with nothing listening
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Wait for the next event or panic
pub fn next_event(events: &Receiver<BridgeEvent>) -> BridgeEvent {
    events
        .recv_timeout(EVENT_TIMEOUT)
        .expect("timed out waiting for bridge event")
}

/// Assert that no event arrives within `wait`
pub fn assert_no_event(events: &Receiver<BridgeEvent>, wait: Duration) {
    if let Ok(event) = events.recv_timeout(wait) {
        panic!("unexpected event {:?}", event);
    }
}

/// Poll until `id` is no longer registered
pub fn wait_until_released(bridge: &WebSocketBridge, id: ConnectionId) {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while bridge.is_open(id) {
        assert!(Instant::now() < deadline, "id {} was never released", id);
        std::thread::sleep(Duration::from_millis(10));
    }
}
