//! Probe binary for the WebSocket bridge
//!
//! Opens one bridged connection, sends the given messages once it is open,
//! logs every event the bridge emits and closes with code 1000 when the peer
//! goes quiet or on Ctrl+C.
//!
//! Usage:
//!   cargo run --bin ws_probe -- <url> [--origin <origin>] [message ...]
//!
//! Optional environment variables:
//!   BRIDGE_CONFIG_PATH - YAML file with bridge timeouts (default: config/bridge.yaml)
//!   RUST_LOG           - log filter (default: info)

use anyhow::{bail, Result};
use crossbeam_channel::Receiver;
use serde_json::{json, Value};
use tracing::{info, warn};
use websocket_bridge::bin_common::{
    init_tracing, load_bridge_config, load_config_from_env, parse_args, BinaryRunner, ConfigType,
    RunConfig,
};
use websocket_bridge::wsbridge::{BridgeEvent, ConnectionId, WebSocketBridge};

/// The probe only ever drives a single connection
const PROBE_ID: ConnectionId = 1;

struct Probe {
    config: RunConfig,
    bridge: WebSocketBridge,
    events: Receiver<BridgeEvent>,
    url: String,
    options: Option<Value>,
    messages: Vec<String>,
}

impl Probe {
    async fn next_event(&self) -> Result<Option<BridgeEvent>> {
        let events = self.events.clone();
        let idle = self.config.idle_timeout();
        let result = tokio::task::spawn_blocking(move || events.recv_timeout(idle)).await?;

        match result {
            Ok(event) => Ok(Some(event)),
            Err(e) if e.is_timeout() => Ok(None),
            Err(_) => bail!("bridge event channel disconnected"),
        }
    }

    fn log_event(event: &BridgeEvent) {
        info!("{} {}", event.name(), serde_json::Value::Object(event.payload()));
    }
}

impl BinaryRunner for Probe {
    async fn run(&mut self) -> Result<()> {
        self.bridge
            .connect(&self.url, None, self.options.as_ref(), PROBE_ID)?;

        loop {
            let event = tokio::select! {
                event = self.next_event() => event?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received");
                    break;
                }
            };

            let Some(event) = event else {
                info!("No events for {:?}, closing", self.config.idle_timeout());
                break;
            };

            Self::log_event(&event);
            match event {
                BridgeEvent::Opened { id } => {
                    for message in &self.messages {
                        self.bridge.send(message, id)?;
                    }
                }
                BridgeEvent::Closed { .. } | BridgeEvent::Failed { .. } => return Ok(()),
                BridgeEvent::Message { .. } => {}
            }
        }

        self.bridge.close(1000, "probe finished", PROBE_ID)?;

        // Wait for the peer's close frame
        while let Some(event) = self.next_event().await? {
            Self::log_event(&event);
            if event.is_terminal() {
                break;
            }
        }

        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.config
    }
}

fn parse_probe_args(args: Vec<String>) -> Result<(String, Option<Value>, Vec<String>)> {
    let mut args = args.into_iter();
    let Some(url) = args.next() else {
        bail!("usage: ws_probe <url> [--origin <origin>] [message ...]");
    };

    let mut origin = None;
    let mut messages = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--origin" {
            match args.next() {
                Some(value) => origin = Some(value),
                None => bail!("--origin requires a value"),
            }
        } else {
            messages.push(arg);
        }
    }

    let options = origin.map(|origin| json!({ "origin": origin }));
    Ok((url, options, messages))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();
    init_tracing();

    let (url, options, messages) = parse_probe_args(parse_args())?;

    let config_path = load_config_from_env(ConfigType::Bridge);
    let bridge_config = load_bridge_config(&config_path)?;
    let (bridge, events) = WebSocketBridge::with_channel(bridge_config)?;

    let mut probe = Probe {
        config: RunConfig::new("ws_probe"),
        bridge,
        events,
        url,
        options,
        messages,
    };

    if let Err(e) = probe.execute().await {
        warn!("Probe failed: {}", e);
        return Err(e);
    }

    Ok(())
}
