//! Node configuration types

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// DHT participation mode passed through to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhtMode {
    /// No DHT participation
    #[default]
    Off,
    /// DHT client only (queries, no records served)
    Client,
    /// Full DHT node
    Full,
}

impl FromStr for DhtMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(Self::Off),
            "client" => Ok(Self::Client),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::UnknownDhtMode(other.to_string())),
        }
    }
}

/// Connection manager thresholds. Each field is independently optional; the
/// daemon falls back to its own default for anything unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnManagerConfig {
    pub low_watermark: Option<u32>,
    pub high_watermark: Option<u32>,
    pub grace_period: Option<u32>,
}

/// Immutable configuration of a supervised daemon node.
///
/// `conn_manager` being `Some` is what enables connection management;
/// watermark and grace values are only valid inside it, which
/// [`NodeConfig::from_attrs`] enforces at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Path to the daemon executable.
    pub command: PathBuf,
    /// Node working directory; sockets, logs and the pid file live here.
    pub dir: PathBuf,
    pub dht_mode: DhtMode,
    pub bootstrap: bool,
    /// Comma-separated bootstrap peer list, passed through verbatim.
    pub bootstrap_peers: String,
    pub conn_manager: Option<ConnManagerConfig>,
}

impl NodeConfig {
    /// Minimal configuration: DHT off, no bootstrap, no connection manager.
    pub fn new(command: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            dir: dir.into(),
            dht_mode: DhtMode::Off,
            bootstrap: false,
            bootstrap_peers: String::new(),
            conn_manager: None,
        }
    }

    /// Build a configuration from a string attribute map.
    ///
    /// Recognized keys: `command`, `dhtmode`, `bootstrap`, `bootstrapPeers`,
    /// `connmanager`, `connmanagerlowmark`, `connmanagerhighmark`,
    /// `connmanagergraceperiod`. `bootstrap` and `connmanager` are presence
    /// flags; their value is ignored. Unrecognized keys are ignored.
    pub fn from_attrs(dir: impl Into<PathBuf>, attrs: &HashMap<String, String>) -> Result<Self> {
        let dht_mode = match attrs.get("dhtmode") {
            Some(raw) => raw.parse()?,
            None => DhtMode::Off,
        };

        let mut conn_manager = if attrs.contains_key("connmanager") {
            Some(ConnManagerConfig::default())
        } else {
            None
        };

        if let Some(raw) = attrs.get("connmanagerlowmark") {
            let cm = enabled(&mut conn_manager, "low watermark")?;
            cm.low_watermark = Some(parse_u32("low watermark", raw)?);
        }

        if let Some(raw) = attrs.get("connmanagerhighmark") {
            let cm = enabled(&mut conn_manager, "high watermark")?;
            cm.high_watermark = Some(parse_u32("high watermark", raw)?);
        }

        if let Some(raw) = attrs.get("connmanagergraceperiod") {
            let cm = enabled(&mut conn_manager, "grace period")?;
            cm.grace_period = Some(parse_u32("grace period", raw)?);
        }

        Ok(Self {
            command: attrs.get("command").map(PathBuf::from).unwrap_or_default(),
            dir: dir.into(),
            dht_mode,
            bootstrap: attrs.contains_key("bootstrap"),
            bootstrap_peers: attrs.get("bootstrapPeers").cloned().unwrap_or_default(),
            conn_manager,
        })
    }
}

fn enabled<'a>(
    conn_manager: &'a mut Option<ConnManagerConfig>,
    field: &'static str,
) -> Result<&'a mut ConnManagerConfig> {
    conn_manager
        .as_mut()
        .ok_or(ConfigError::ConnManagerNotEnabled { field })
}

fn parse_u32(field: &'static str, raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|source| ConfigError::InvalidNumber { field, source })
}
