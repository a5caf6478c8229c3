use crate::traits::event::BridgeEvent;
use crossbeam_channel::Sender;
use tracing::debug;

/// Receiver of bridge events
///
/// Implement this trait to forward events to the host application.
/// `emit` is called from connection tasks, possibly from several tasks at
/// once, so it must not block for long.
///
/// # Example
/// ```ignore
/// struct HostEmitter { host: HostHandle }
///
/// impl EventSink for HostEmitter {
///     fn emit(&self, event: BridgeEvent) {
///         self.host.emit(event.name(), event.payload());
///     }
/// }
/// ```
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one event
    fn emit(&self, event: BridgeEvent);
}

impl<F> EventSink for F
where
    F: Fn(BridgeEvent) + Send + Sync + 'static,
{
    fn emit(&self, event: BridgeEvent) {
        self(event)
    }
}

/// Event sink backed by an unbounded crossbeam channel
pub struct ChannelSink {
    tx: Sender<BridgeEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<BridgeEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: BridgeEvent) {
        // Receiver gone means the host stopped listening
        if let Err(e) = self.tx.send(event) {
            debug!("Dropping event {}, receiver disconnected", e.0.name());
        }
    }
}

/// A sink that discards every event
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: BridgeEvent) {}
}
