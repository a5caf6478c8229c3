use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::traits::{BridgeError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Commands delivered to a connection task
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    /// Write a text frame
    Send(String),
    /// Start the closing handshake
    Close { code: u16, reason: String },
}

/// Snapshot of a connection's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub connection_state: ConnectionState,
}

/// Addressable handle of one open connection
///
/// Cloning is cheap; all clones talk to the same connection task. The
/// `token` is unique per process so that cleanup performed by a finished
/// connection task cannot remove a newer handle registered under the same id.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    token: u64,
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        command_tx: mpsc::UnboundedSender<ConnectionCommand>,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        Self {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            command_tx,
            state,
            metrics,
        }
    }

    #[inline]
    pub fn token(&self) -> u64 {
        self.token
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn metrics(&self) -> ConnectionMetrics {
        ConnectionMetrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            connection_state: self.state.get(),
        }
    }

    /// Queue a text frame for the connection's writer
    pub(crate) fn send_text(&self, message: &str) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(message.to_string()))
            .map_err(|_| BridgeError::ConnectionClosed("connection task has exited".into()))
    }

    /// Ask the connection task to start the closing handshake
    pub(crate) fn request_close(&self, code: u16, reason: &str) -> Result<()> {
        let _ = self
            .state
            .compare_exchange(ConnectionState::Open, ConnectionState::Closing);

        self.command_tx
            .send(ConnectionCommand::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| BridgeError::ConnectionClosed("connection task has exited".into()))
    }
}
