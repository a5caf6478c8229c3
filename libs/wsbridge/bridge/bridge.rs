use crate::config::BridgeConfig;
use crate::connection::{spawn_connection, ConnectionContext};
use crate::connection_state::ConnectionState;
use crate::handle::ConnectionMetrics;
use crate::registry::ConnectionRegistry;
use crate::traits::{
    BridgeError, BridgeEvent, ChannelSink, ConnectOptions, ConnectionId, EventSink, Result,
};
use crossbeam_channel::{unbounded, Receiver};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Close code used when the bridge itself tears connections down
pub const GOING_AWAY_CODE: u16 = 1001;

/// Multiplexes logical WebSocket connections addressed by integer ids
///
/// Commands return immediately. Everything the network does is reported
/// through the [`EventSink`] the bridge was built with.
///
/// # Example
/// ```ignore
/// let (bridge, events) = WebSocketBridge::with_channel(BridgeConfig::default())?;
///
/// bridge.connect("wss://echo.example.com", None, Some(&json!({ "origin": "https://app" })), 1)?;
///
/// while let Ok(event) = events.recv() {
///     match event {
///         BridgeEvent::Opened { id } => bridge.send("hello", id)?,
///         BridgeEvent::Message { id, data } => {
///             println!("{}: {}", id, data);
///             bridge.close(1000, "done", id)?;
///         }
///         other => println!("{:?}", other),
///     }
/// }
/// ```
pub struct WebSocketBridge {
    context: Arc<ConnectionContext>,
    runtime: Handle,
}

impl WebSocketBridge {
    /// Create a bridge driven by the current tokio runtime
    ///
    /// # Errors
    /// Returns [`BridgeError::Runtime`] when called outside a tokio runtime and
    /// [`BridgeError::Configuration`] for invalid timeouts.
    pub fn new(config: BridgeConfig, sink: impl EventSink) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| BridgeError::Runtime(e.to_string()))?;
        Self::with_runtime(config, sink, runtime)
    }

    /// Create a bridge whose connections run on `runtime`
    pub fn with_runtime(config: BridgeConfig, sink: impl EventSink, runtime: Handle) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ConnectionRegistry::new());
        let sink: Arc<dyn EventSink> = Arc::new(sink);

        Ok(Self {
            context: Arc::new(ConnectionContext::new(config, registry, sink)),
            runtime,
        })
    }

    /// Create a bridge that delivers events on a crossbeam channel
    pub fn with_channel(config: BridgeConfig) -> Result<(Self, Receiver<BridgeEvent>)> {
        let (tx, rx) = unbounded();
        let bridge = Self::new(config, ChannelSink::new(tx))?;
        Ok((bridge, rx))
    }

    /// Open a connection for `id` without waiting for the network
    ///
    /// `protocols` is accepted for interface compatibility only: subprotocol
    /// negotiation is not implemented and the list is never sent.
    /// `options` is the host's option map; see [`ConnectOptions::from_value`].
    ///
    /// The outcome arrives later as `Opened` or `Failed`.
    ///
    /// # Errors
    /// [`BridgeError::ConnectionIdInUse`] if `id` already has an open connection.
    pub fn connect(
        &self,
        url: &str,
        protocols: Option<&[String]>,
        options: Option<&Value>,
        id: ConnectionId,
    ) -> Result<()> {
        if let Some(protocols) = protocols.filter(|p| !p.is_empty()) {
            debug!(
                "Ignoring subprotocols {:?} for WebSocket {}, negotiation is not supported",
                protocols, id
            );
        }

        self.connect_with_options(url, ConnectOptions::from_value(options), id)
    }

    /// Typed variant of [`connect`](Self::connect)
    pub fn connect_with_options(
        &self,
        url: &str,
        options: ConnectOptions,
        id: ConnectionId,
    ) -> Result<()> {
        if self.context.shutting_down.load(Ordering::Acquire) {
            return Err(BridgeError::Runtime("WebSocket bridge has been shut down".into()));
        }

        if self.context.registry.contains(id) {
            return Err(BridgeError::ConnectionIdInUse(id));
        }

        spawn_connection(
            &self.runtime,
            Arc::clone(&self.context),
            id,
            url.to_string(),
            options,
        );
        Ok(())
    }

    /// Send a text frame on an open connection
    ///
    /// Write failures are reported as `Failed` events, not as errors.
    ///
    /// # Errors
    /// [`BridgeError::UnknownConnection`] if `id` is not open. This is a
    /// programmer error and no event is emitted for it.
    pub fn send(&self, message: &str, id: ConnectionId) -> Result<()> {
        let handle = self
            .context
            .registry
            .get(id)
            .ok_or(BridgeError::UnknownConnection(id))?;

        if let Err(e) = handle.send_text(message) {
            // The connection already emitted its terminal event
            debug!("Dropping message for WebSocket {}: {}", id, e);
        }
        Ok(())
    }

    /// Start the closing handshake and forget the id
    ///
    /// Closing an unknown or already closed id is a logged no-op. The id is
    /// removed right away; the peer's close frame still produces `Closed`.
    pub fn close(&self, code: u16, reason: &str, id: ConnectionId) -> Result<()> {
        let handle = match self.context.registry.get(id) {
            Some(handle) => handle,
            None => {
                warn!("Cannot close WebSocket. Unknown WebSocket id {}", id);
                return Ok(());
            }
        };

        if let Err(e) = handle.request_close(code, reason) {
            error!("Could not close WebSocket connection for id {}: {}", id, e);
        }

        self.context.registry.remove_if(id, handle.token());
        Ok(())
    }

    /// Whether `id` currently maps to an open connection
    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.context.registry.contains(id)
    }

    pub fn connection_state(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.context.registry.get(id).map(|handle| handle.state())
    }

    pub fn metrics(&self, id: ConnectionId) -> Option<ConnectionMetrics> {
        self.context.registry.get(id).map(|handle| handle.metrics())
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.context.registry.ids()
    }

    pub fn connection_count(&self) -> usize {
        self.context.registry.len()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.context.config
    }

    /// Close every open connection with code 1001 and refuse new ones
    ///
    /// Connections still handshaking are closed as soon as they open and
    /// reported as `Failed`.
    pub fn shutdown(&self) {
        if self.context.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let connections = self.context.registry.drain();
        info!("Shutting down WebSocket bridge ({} open connections)", connections.len());

        for (id, handle) in connections {
            if let Err(e) = handle.request_close(GOING_AWAY_CODE, "Bridge shutting down") {
                debug!("WebSocket {} already finished: {}", id, e);
            }
        }
    }
}

impl Drop for WebSocketBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
