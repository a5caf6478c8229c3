//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use wsbridge::BridgeConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Bridge timeouts (config/bridge.yaml)
    Bridge,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Bridge => "config/bridge.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Bridge => "BRIDGE_CONFIG_PATH",
            ConfigType::Custom(_) => "BRIDGE_CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use websocket_bridge::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Bridge);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    match config_type {
        ConfigType::Custom(path) => path.into(),
        other => std::env::var(other.env_var_name())
            .unwrap_or_else(|_| other.default_path().to_string())
            .into(),
    }
}

/// Load bridge timeouts from a YAML file
///
/// A missing file yields the defaults (10 s connect and write timeouts).
pub fn load_bridge_config(path: impl AsRef<Path>) -> Result<BridgeConfig, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        info!("No bridge config at {}, using defaults", path.display());
        return Ok(BridgeConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: BridgeConfig = serde_yaml::from_str(&contents)?;
    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    info!("Loaded bridge config from {}", path.display());
    Ok(config)
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
