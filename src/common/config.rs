//! Configuration for replog nodes
//!
//! Values are layered: an optional TOML file, then `REPLOG_*` environment
//! variables (`REPLOG_MASTER__BIND_ADDR`, `REPLOG_SECONDARY__ROLE`, ...), then
//! whatever the binaries override from their command line.

use crate::common::{Error, ReplicaRole, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "REPLOG";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "replog";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node ID (unique identifier, used in logs)
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Role (master or secondary)
    #[serde(default)]
    pub role: NodeRole,

    /// Master-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<MasterConfig>,

    /// Secondary-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondaryConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "replog".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            role: NodeRole::default(),
            master: None,
            secondary: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or `replog.toml` if present) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Master section, falling back to defaults
    pub fn master_or_default(&self) -> MasterConfig {
        self.master.clone().unwrap_or_default()
    }

    /// Secondary section, falling back to defaults
    pub fn secondary_or_default(&self) -> SecondaryConfig {
        self.secondary.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Master,
    Secondary,
}

/// Master configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Bind address for HTTP API
    #[serde(default = "default_master_bind")]
    pub bind_addr: SocketAddr,

    /// Base URL of the `secondary-1` node
    #[serde(default = "default_secondary_1_url")]
    pub secondary_1: String,

    /// Base URL of the `secondary-2` node
    #[serde(default = "default_secondary_2_url")]
    pub secondary_2: String,

    /// TCP connect timeout for replication calls.
    /// Only bounds connection setup, never an in-flight (possibly delayed) call.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Interval between heartbeat rounds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,

    /// Probes per secondary per round
    #[serde(default = "default_heartbeats_number")]
    pub heartbeats_number: u32,
}

fn default_master_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
fn default_secondary_1_url() -> String {
    "http://127.0.0.1:8081".to_string()
}
fn default_secondary_2_url() -> String {
    "http://127.0.0.1:8082".to_string()
}
fn default_connect_timeout() -> u64 {
    1_000
}
fn default_heartbeat_interval() -> u64 {
    1_000
}
fn default_heartbeats_number() -> u32 {
    3
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_master_bind(),
            secondary_1: default_secondary_1_url(),
            secondary_2: default_secondary_2_url(),
            connect_timeout_ms: default_connect_timeout(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            heartbeats_number: default_heartbeats_number(),
        }
    }
}

impl MasterConfig {
    pub fn secondary_url(&self, role: ReplicaRole) -> &str {
        match role {
            ReplicaRole::Secondary1 => &self.secondary_1,
            ReplicaRole::Secondary2 => &self.secondary_2,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Reject configurations the master cannot start with
    pub fn validate(&self) -> Result<()> {
        for role in ReplicaRole::ALL {
            let url = self.secondary_url(role);
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidConfig(format!("{} address {:?}: {}", role, url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig(format!(
                    "{} address {:?}: expected an http(s) URL",
                    role, url
                )));
            }
        }
        if self.secondary_1 == self.secondary_2 {
            return Err(Error::InvalidConfig(
                "secondary-1 and secondary-2 point at the same address".into(),
            ));
        }
        if self.heartbeats_number == 0 {
            return Err(Error::InvalidConfig("heartbeats_number must be >= 1".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "heartbeat_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Secondary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Bind address for HTTP API
    #[serde(default = "default_secondary_bind")]
    pub bind_addr: SocketAddr,

    /// Which directive slot this node obeys
    #[serde(default = "default_role")]
    pub role: ReplicaRole,

    /// How long a buffered entry waits for its gap to close before a negative ack
    #[serde(default = "default_apply_wait_timeout")]
    pub apply_wait_timeout_ms: u64,
}

fn default_secondary_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}
fn default_role() -> ReplicaRole {
    ReplicaRole::Secondary1
}
fn default_apply_wait_timeout() -> u64 {
    30_000
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_secondary_bind(),
            role: default_role(),
            apply_wait_timeout_ms: default_apply_wait_timeout(),
        }
    }
}

impl SecondaryConfig {
    pub fn apply_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.apply_wait_timeout_ms)
    }
}
