//! # wsbridge Core
//!
//! Per-connection machinery: configuration, state, the registry of open
//! handles, the inbound dispatcher and the connection task itself.

pub mod config;
pub mod connection;
pub mod connection_state;
pub mod dispatcher;
pub mod handle;
pub mod registry;

pub use config::BridgeConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use dispatcher::{DispatchOutcome, Dispatcher, NO_STATUS_CODE};
pub use handle::{ConnectionHandle, ConnectionMetrics};
pub use registry::ConnectionRegistry;

pub use crate::traits::*;
