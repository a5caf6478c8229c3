use serde_json::Value;
use tracing::{debug, warn};

/// Key of the only recognised connect option
pub const ORIGIN_KEY: &str = "origin";

/// Per-connection handshake options
///
/// The host hands options over as a loosely typed map. Anything that is not
/// understood is dropped with a log line, never turned into an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Value for the `Origin` header of the handshake request
    pub origin: Option<String>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Origin` header value
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Read options from the host's dynamic representation
    ///
    /// `null` or a non-object yields empty options. A non-string `origin` is
    /// ignored with a warning.
    pub fn from_value(value: Option<&Value>) -> Self {
        let map = match value {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => return Self::default(),
            Some(other) => {
                warn!("Ignoring: connect options are not an object ({})", other);
                return Self::default();
            }
        };

        let mut options = Self::default();

        for (key, value) in map {
            if key == ORIGIN_KEY {
                match value {
                    Value::String(origin) => options.origin = Some(origin.clone()),
                    _ => warn!("Ignoring: requested origin, value not a string"),
                }
            } else {
                debug!("Ignoring unknown connect option '{}'", key);
            }
        }

        options
    }
}
