//! Connection lifecycle controller
//!
//! Opens one connection per `connect` call and drives it until it reaches a
//! terminal state. Each connection runs as its own tokio task:
//!
//! ```text
//! spawn_connection ──> [task] handshake (connect timeout)
//!                        │
//!                        ├─ error / timeout ──> Failed
//!                        │
//!                        └─ ok ──> registry.put ──> Opened
//!                                    │
//!                                    ▼
//!                      select! { inbound frame ──> Dispatcher
//!                                command        ──> write (write timeout) }
//!                                    │
//!                                    ▼
//!                      registry.remove_if ──> terminal event ──> drain
//! ```

use crate::config::BridgeConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::handle::{ConnectionCommand, ConnectionHandle};
use crate::registry::ConnectionRegistry;
use crate::traits::{BridgeError, ConnectOptions, ConnectionId, EventSink, Result};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, ORIGIN};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// State shared by a bridge and all of its connection tasks
pub(crate) struct ConnectionContext {
    pub(crate) config: BridgeConfig,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) shutting_down: AtomicBool,
}

impl ConnectionContext {
    pub(crate) fn new(
        config: BridgeConfig,
        registry: Arc<ConnectionRegistry>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            registry,
            sink,
            shutting_down: AtomicBool::new(false),
        }
    }
}

/// Start a connection attempt and return without waiting for the network
///
/// The task is detached: dropping its `JoinHandle` releases the spawn
/// resource but never aborts the in-flight attempt.
pub(crate) fn spawn_connection(
    runtime: &Handle,
    context: Arc<ConnectionContext>,
    id: ConnectionId,
    url: String,
    options: ConnectOptions,
) {
    let task = runtime.spawn(run_connection(context, id, url, options));
    drop(task);
}

/// Build the handshake request, adding the `Origin` header when requested
pub(crate) fn build_request(url: &str, options: &ConnectOptions) -> Result<Request> {
    let mut request = url
        .into_client_request()
        .map_err(|e| BridgeError::WebSocket(e.to_string()))?;

    if let Some(ref origin) = options.origin {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                request.headers_mut().insert(ORIGIN, value);
            }
            Err(_) => {
                warn!("Ignoring: requested origin '{}', not a valid header value", origin);
            }
        }
    }

    Ok(request)
}

async fn run_connection(
    context: Arc<ConnectionContext>,
    id: ConnectionId,
    url: String,
    options: ConnectOptions,
) {
    let config = &context.config;
    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
    let metrics = Arc::new(AtomicMetrics::new());
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(command_tx, Arc::clone(&state), Arc::clone(&metrics));
    let token = handle.token();
    let dispatcher = Dispatcher::new(
        id,
        Arc::clone(&context.sink),
        Arc::clone(&state),
        Arc::clone(&metrics),
    )
    .with_registration(Arc::clone(&context.registry), token);

    let request = match build_request(&url, &options) {
        Ok(request) => request,
        Err(e) => {
            dispatcher.failed(e.to_string());
            return;
        }
    };

    info!("Connecting WebSocket {} to {}", id, url);

    let mut ws_stream = match timeout(config.connect_timeout(), connect_async(request)).await {
        Ok(Ok((ws_stream, _response))) => ws_stream,
        Ok(Err(e)) => {
            dispatcher.failed(e.to_string());
            return;
        }
        Err(_) => {
            let e = BridgeError::Timeout(format!(
                "connect to {} exceeded {:?}",
                url,
                config.connect_timeout()
            ));
            dispatcher.failed(e.to_string());
            return;
        }
    };

    if context.registry.put(id, handle).is_err() {
        // Another attempt with the same id won the race; its event stream
        // stays untouched.
        error!("Dropping duplicate WebSocket connection for id {}", id);
        close_quietly(&mut ws_stream, CloseCode::Policy, config).await;
        return;
    }

    // Checked after registering: a shutdown that drained the registry before
    // `put` has already set the flag.
    if context.shutting_down.load(Ordering::Acquire) {
        debug!("Bridge shut down while WebSocket {} was connecting", id);
        dispatcher.failed("WebSocket bridge has been shut down");
        close_quietly(&mut ws_stream, CloseCode::Away, config).await;
        return;
    }

    info!("WebSocket {} open", id);
    dispatcher.opened();

    handle_connection(ws_stream, &dispatcher, config, &metrics, command_rx).await;

    if !dispatcher.is_finished() {
        dispatcher.failed("WebSocket connection task ended unexpectedly");
    }
    debug!("WebSocket {} task finished in {:?}", id, state.get());
}

/// Read/write loop for an open connection
///
/// Returns once a terminal event has been emitted.
async fn handle_connection(
    ws_stream: WsStream,
    dispatcher: &Dispatcher,
    config: &BridgeConfig,
    metrics: &AtomicMetrics,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
) {
    let id = dispatcher.id();
    let (mut write, mut read) = ws_stream.split();
    let mut commands_open = true;

    // Armed once our close frame is written; the peer must answer in time
    let close_deadline = sleep(config.close_drain_timeout());
    tokio::pin!(close_deadline);
    let mut closing = false;

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(frame)) => match dispatcher.dispatch(frame) {
                        DispatchOutcome::Continue => {}
                        DispatchOutcome::Closed => break,
                        DispatchOutcome::Failed => {
                            let close = Message::Close(Some(CloseFrame {
                                code: CloseCode::Invalid,
                                reason: "invalid UTF-8 payload".into(),
                            }));
                            let _ = timeout(config.write_timeout(), write.send(close)).await;
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        dispatcher.failed(e.to_string());
                        return;
                    }
                    None => {
                        let e = BridgeError::ConnectionClosed(
                            "stream ended without a close frame".into(),
                        );
                        dispatcher.failed(e.to_string());
                        return;
                    }
                }
            }

            command = command_rx.recv(), if commands_open => {
                match command {
                    Some(ConnectionCommand::Send(text)) => {
                        match timeout(config.write_timeout(), write.send(Message::Text(text))).await {
                            Ok(Ok(())) => metrics.increment_sent(),
                            Ok(Err(e)) => {
                                dispatcher.failed(e.to_string());
                                return;
                            }
                            Err(_) => {
                                let e = BridgeError::Timeout(format!(
                                    "write exceeded {:?}",
                                    config.write_timeout()
                                ));
                                dispatcher.failed(e.to_string());
                                return;
                            }
                        }
                    }
                    Some(ConnectionCommand::Close { code, reason }) => {
                        let close = Message::Close(Some(CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        }));
                        match timeout(config.write_timeout(), write.send(close)).await {
                            Ok(Ok(())) => {
                                debug!("Close handshake started for WebSocket {}", id);
                                if !closing {
                                    closing = true;
                                    close_deadline
                                        .as_mut()
                                        .reset(Instant::now() + config.close_drain_timeout());
                                }
                            }
                            Ok(Err(e)) => {
                                error!("Could not close WebSocket connection for id {}: {}", id, e);
                                dispatcher.failed(e.to_string());
                                return;
                            }
                            Err(_) => {
                                error!("Timed out closing WebSocket connection for id {}", id);
                                let e = BridgeError::Timeout(format!(
                                    "close exceeded {:?}",
                                    config.write_timeout()
                                ));
                                dispatcher.failed(e.to_string());
                                return;
                            }
                        }
                    }
                    None => {
                        // Handle removed from the registry; keep reading
                        // until the peer finishes the closing handshake.
                        commands_open = false;
                    }
                }
            }

            _ = &mut close_deadline, if closing => {
                let e = BridgeError::Timeout(format!(
                    "peer did not answer close within {:?}",
                    config.close_drain_timeout()
                ));
                dispatcher.failed(e.to_string());
                return;
            }
        }
    }

    // Let the framing layer flush the close reply and observe the end of stream
    let drained = timeout(config.close_drain_timeout(), async {
        while let Some(Ok(_)) = read.next().await {}
    })
    .await;
    if drained.is_err() {
        debug!("WebSocket {} did not finish closing in time, dropping socket", id);
    }
}

async fn close_quietly(ws_stream: &mut WsStream, code: CloseCode, config: &BridgeConfig) {
    let frame = CloseFrame {
        code,
        reason: "".into(),
    };
    if let Ok(Err(e)) = timeout(config.write_timeout(), ws_stream.close(Some(frame))).await {
        debug!("Error closing rejected WebSocket: {}", e);
    }
}
