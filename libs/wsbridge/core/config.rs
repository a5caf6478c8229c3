use crate::traits::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for TCP connect plus handshake, and for each write
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Timeouts applied to every connection opened by a bridge
///
/// Reads are never timed out: connections are long-lived and server-push
/// driven, so a silent peer simply produces no events.
///
/// Deserializable from YAML:
/// ```yaml
/// connect_timeout_secs: 10
/// write_timeout_secs: 10
/// close_drain_timeout_secs: 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound for TCP connect and the upgrade handshake
    pub connect_timeout_secs: u64,

    /// Upper bound for each outbound frame write
    pub write_timeout_secs: u64,

    /// How long a connection that already emitted its terminal event keeps
    /// reading so the closing handshake can be flushed
    pub close_drain_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_TIMEOUT_SECS,
            close_drain_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BridgeConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_close_drain_timeout(mut self, timeout: Duration) -> Self {
        self.close_drain_timeout_secs = timeout.as_secs();
        self
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[inline]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    #[inline]
    pub fn close_drain_timeout(&self) -> Duration {
        Duration::from_secs(self.close_drain_timeout_secs)
    }

    /// Reject timeouts that would fail every operation immediately
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.write_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "write_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.close_drain_timeout_secs == 0 {
            return Err(BridgeError::Configuration(
                "close_drain_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
        assert_eq!(config.close_drain_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = BridgeConfig::default()
            .with_connect_timeout(Duration::from_secs(3))
            .with_write_timeout(Duration::from_secs(5))
            .with_close_drain_timeout(Duration::from_secs(1));

        assert_eq!(config.connect_timeout_secs, 3);
        assert_eq!(config.write_timeout_secs, 5);
        assert_eq!(config.close_drain_timeout_secs, 1);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = BridgeConfig {
            write_timeout_secs: 0,
            ..BridgeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: BridgeConfig = serde_yaml::from_str("connect_timeout_secs: 4\n").unwrap();
        assert_eq!(config.connect_timeout_secs, 4);
        assert_eq!(config.write_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.close_drain_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
