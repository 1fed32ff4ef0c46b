//! configuration types for proxyctl.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// main configuration for the proxyctl master.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// address to bind the http server to.
    pub listen_addr: String,

    /// database configuration.
    pub database: DatabaseConfig,

    /// push transport tuning.
    pub push: PushConfig,

    /// policy enforcement loop configuration.
    pub policy: PolicyConfig,

    /// proxy engine configuration (used by the node agent).
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9080".to_string(),
            database: DatabaseConfig::default(),
            push: PushConfig::default(),
            policy: PolicyConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// database connection string or file path.
    pub connection_string: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "/var/lib/proxyctl/db.sqlite".to_string(),
        }
    }
}

/// push transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// how long to wait for a node's apply acknowledgment before the
    /// push is reported as timed out.
    pub ack_timeout_secs: u64,

    /// buffered capacity of each node channel's command queue.
    pub channel_capacity: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ack_timeout_secs: 30,
            channel_capacity: 8,
        }
    }
}

/// policy enforcement loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// seconds between enforcement runs; 0 disables the loop.
    pub interval_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// proxy engine configuration, consumed by the node-side agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// path to the proxy engine binary.
    pub binary_path: PathBuf,

    /// where the applied configuration document is written.
    pub config_path: PathBuf,

    /// locally-bound port of the engine's stats/control api.
    pub api_port: u16,

    /// seconds between traffic reports to the master; 0 disables them.
    pub report_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("/usr/local/bin/xray"),
            config_path: PathBuf::from("/var/lib/proxyctl/engine.json"),
            api_port: 10085,
            report_interval_secs: 10,
        }
    }
}
