use crate::traits::ConnectionId;
use thiserror::Error;

/// Main error type for wsbridge
///
/// Only the misuse variants are ever returned from the command interface.
/// Network-side variants are rendered into `BridgeEvent::Failed` messages
/// by the connection task and never reach the caller as `Err`.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// `send` addressed an id with no open connection (programmer error)
    #[error("Cannot send a message. Unknown WebSocket id {0}")]
    UnknownConnection(ConnectionId),

    /// `connect` addressed an id that already has an open connection
    #[error("WebSocket id {0} is already in use")]
    ConnectionIdInUse(ConnectionId),

    /// WebSocket handshake or transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connect or write exceeded its timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Inbound payload could not be decoded as UTF-8
    #[error("Decode error: {0}")]
    Decode(String),

    /// Connection ended without a close frame
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// No async runtime available to drive connections
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    /// Whether this error indicates invalid caller usage rather than a
    /// network condition. Misuse faults should be treated as integration bugs.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownConnection(_) | BridgeError::ConnectionIdInUse(_)
        )
    }
}

/// Result type for wsbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
