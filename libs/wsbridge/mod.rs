//! # wsbridge
//!
//! A WebSocket client bridge that multiplexes many logical connections,
//! addressed by small integer ids, inside one process.
//!
//! ## Features
//!
//! - **Fire-and-forget connect**: handshakes run on tokio tasks, outcomes arrive as events
//! - **Per-connection tasks**: one task per socket, events ordered per id
//! - **Concurrent registry**: `parking_lot` guarded map, never locked across I/O
//! - **Distinct misuse faults**: only caller mistakes come back as `Err`,
//!   network trouble is always a `websocketFailed` event
//! - **Bounded writes**: 10 s connect and write timeouts, unbounded reads

pub mod traits;
pub mod core;
pub mod bridge;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    config, connection, connection_state, dispatcher, handle, registry,
    config::BridgeConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    dispatcher::{DispatchOutcome, Dispatcher},
    handle::{ConnectionHandle, ConnectionMetrics},
    registry::ConnectionRegistry,
};

// Re-export the command interface
pub use bridge::{WebSocketBridge, GOING_AWAY_CODE};
