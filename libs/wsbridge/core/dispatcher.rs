//! Inbound frame dispatch
//!
//! Each connection task owns one [`Dispatcher`] holding the connection id and
//! the event sink. Every event for that id goes through it, which is what
//! gives the per-id ordering and exactly-one-terminal-event guarantees.
//! The id is released from the registry before the terminal event is
//! emitted, so a consumer reacting to `Closed`/`Failed` can reuse it at once:
//!
//! ```text
//! frame ──> Dispatcher::dispatch ──┬─ Text / Binary(utf-8) ──> Message
//!                                  ├─ Binary(invalid)      ──> Failed
//!                                  ├─ Close                ──> Closed
//!                                  └─ Ping / Pong / Frame  ──> (nothing)
//! ```

use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::registry::ConnectionRegistry;
use crate::traits::{BridgeError, BridgeEvent, ConnectionId, EventSink};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Close code reported when a close frame carries no status
pub const NO_STATUS_CODE: u16 = 1005;

/// What the connection task should do after a frame was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep reading
    Continue,
    /// Peer sent a close frame
    Closed,
    /// Payload could not be decoded; the connection is unusable
    Failed,
}

/// Per-connection event emitter
pub struct Dispatcher {
    id: ConnectionId,
    sink: Arc<dyn EventSink>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    registration: Option<(Arc<ConnectionRegistry>, u64)>,
}

impl Dispatcher {
    pub fn new(
        id: ConnectionId,
        sink: Arc<dyn EventSink>,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            id,
            sink,
            state,
            metrics,
            registration: None,
        }
    }

    /// Release the handle carrying `token` from `registry` on the terminal event
    pub fn with_registration(mut self, registry: Arc<ConnectionRegistry>, token: u64) -> Self {
        self.registration = Some((registry, token));
        self
    }

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether a terminal event was already emitted
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Handshake completed and the handle is registered
    pub fn opened(&self) {
        if self
            .state
            .compare_exchange(ConnectionState::Connecting, ConnectionState::Open)
            .is_ok()
        {
            self.sink.emit(BridgeEvent::Opened { id: self.id });
        }
    }

    /// Emit `Failed` unless a terminal event was already emitted
    ///
    /// Returns `true` if the event was emitted.
    pub fn failed(&self, message: impl Into<String>) -> bool {
        if !self.state.finish(ConnectionState::Failed) {
            return false;
        }

        let mut message = message.into();
        if message.is_empty() {
            message = "Unknown WebSocket failure".to_string();
        }
        warn!("WebSocket {} failed: {}", self.id, message);

        self.release();
        self.sink.emit(BridgeEvent::Failed {
            id: self.id,
            message,
        });
        true
    }

    /// Emit `Closed` unless a terminal event was already emitted
    pub fn closed(&self, code: u16, reason: String) -> bool {
        if !self.state.finish(ConnectionState::Closed) {
            return false;
        }

        debug!("WebSocket {} closed by peer: {} {}", self.id, code, reason);
        self.release();
        self.sink.emit(BridgeEvent::Closed {
            id: self.id,
            code,
            reason,
        });
        true
    }

    /// Classify one inbound frame and emit the matching event
    ///
    /// The frame is consumed; its buffer is released when this returns,
    /// whatever the decode outcome.
    pub fn dispatch(&self, frame: Message) -> DispatchOutcome {
        if self.is_finished() {
            return DispatchOutcome::Continue;
        }

        match frame {
            Message::Text(text) => {
                self.metrics.increment_received();
                self.message(text);
                DispatchOutcome::Continue
            }
            Message::Binary(bytes) => {
                self.metrics.increment_received();
                match String::from_utf8(bytes) {
                    Ok(text) => {
                        self.message(text);
                        DispatchOutcome::Continue
                    }
                    Err(e) => {
                        self.failed(BridgeError::Decode(e.utf8_error().to_string()).to_string());
                        DispatchOutcome::Failed
                    }
                }
            }
            Message::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.into_owned()))
                    .unwrap_or((NO_STATUS_CODE, String::new()));
                self.closed(code, reason);
                DispatchOutcome::Closed
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => DispatchOutcome::Continue,
        }
    }

    fn release(&self) {
        if let Some((registry, token)) = &self.registration {
            if registry.remove_if(self.id, *token) {
                debug!("Released WebSocket {} from registry", self.id);
            }
        }
    }

    fn message(&self, data: String) {
        self.sink.emit(BridgeEvent::Message { id: self.id, data });
    }
}
