//! # wsbridge Traits
//!
//! Shared types and seams for the bridge:
//!
//! - **BridgeEvent**: lifecycle and message events with host-facing names
//! - **EventSink**: where events are delivered
//! - **ConnectOptions**: handshake options parsed from the host's dynamic map
//! - **BridgeError**: misuse faults and network error descriptions

pub mod error;
pub mod event;
pub mod options;
pub mod sink;

/// Caller-assigned identifier of a logical connection
pub type ConnectionId = u32;

pub use error::{BridgeError, Result};
pub use event::{BridgeEvent, EVENT_CLOSED, EVENT_FAILED, EVENT_MESSAGE, EVENT_OPEN};
pub use options::ConnectOptions;
pub use sink::{ChannelSink, EventSink, NoOpSink};
