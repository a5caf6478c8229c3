use crate::traits::ConnectionId;
use serde_json::{Map, Value};

/// Event name emitted when a handshake completes
pub const EVENT_OPEN: &str = "websocketOpen";
/// Event name emitted when a close frame is received
pub const EVENT_CLOSED: &str = "websocketClosed";
/// Event name emitted on any network, protocol or decode failure
pub const EVENT_FAILED: &str = "websocketFailed";
/// Event name emitted for every decoded data frame
pub const EVENT_MESSAGE: &str = "websocketMessage";

/// Lifecycle and message events delivered to the event sink
///
/// For a given connection id, `Opened` always comes first and at most one of
/// `Closed` / `Failed` follows, always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Handshake completed, connection registered
    Opened { id: ConnectionId },
    /// Close frame received from the peer
    Closed {
        id: ConnectionId,
        code: u16,
        reason: String,
    },
    /// Handshake, I/O or decode failure; the connection is gone
    Failed { id: ConnectionId, message: String },
    /// Decoded text payload
    Message { id: ConnectionId, data: String },
}

impl BridgeEvent {
    /// Connection id this event belongs to
    pub fn id(&self) -> ConnectionId {
        match self {
            BridgeEvent::Opened { id }
            | BridgeEvent::Closed { id, .. }
            | BridgeEvent::Failed { id, .. }
            | BridgeEvent::Message { id, .. } => *id,
        }
    }

    /// Name under which the host application receives this event
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Opened { .. } => EVENT_OPEN,
            BridgeEvent::Closed { .. } => EVENT_CLOSED,
            BridgeEvent::Failed { .. } => EVENT_FAILED,
            BridgeEvent::Message { .. } => EVENT_MESSAGE,
        }
    }

    /// Whether this is the last event a connection will ever produce
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeEvent::Closed { .. } | BridgeEvent::Failed { .. })
    }

    /// Payload map handed to the host alongside `name()`
    pub fn payload(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("id".to_string(), Value::from(self.id()));

        match self {
            BridgeEvent::Opened { .. } => {}
            BridgeEvent::Closed { code, reason, .. } => {
                params.insert("code".to_string(), Value::from(*code));
                params.insert("reason".to_string(), Value::from(reason.as_str()));
            }
            BridgeEvent::Failed { message, .. } => {
                params.insert("message".to_string(), Value::from(message.as_str()));
            }
            BridgeEvent::Message { data, .. } => {
                params.insert("data".to_string(), Value::from(data.as_str()));
            }
        }

        params
    }
}
