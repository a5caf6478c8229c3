//! # wsbridge Bridge
//!
//! Command interface over the connection registry: `connect`, `send` and
//! `close` addressed by caller-assigned ids.

pub mod bridge;

pub use bridge::{WebSocketBridge, GOING_AWAY_CODE};
