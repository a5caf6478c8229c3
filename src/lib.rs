//! WebSocket Bridge - Main Library
//!
//! Host-side glue around the `wsbridge` workspace library.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config, logging, runners)
//! - **wsbridge**: Connection registry, lifecycle controller, dispatcher and
//!   command interface (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use websocket_bridge::bin_common::{init_tracing, load_bridge_config, load_config_from_env, ConfigType};
//! use websocket_bridge::wsbridge::WebSocketBridge;
//! ```

// Re-export workspace libraries for convenience
pub use wsbridge;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;
    pub mod runner;

    pub use cli::{load_bridge_config, load_config_from_env, parse_args, ConfigError, ConfigType};
    pub use logging::init_tracing;
    pub use runner::{BinaryRunner, RunConfig};
}
