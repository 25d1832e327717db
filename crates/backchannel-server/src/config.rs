//! Backchannel configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for the backchannel process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackchannelConfig {
    /// HTTP API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Embedded agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Harness synchronization settings.
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// did:indy namespace ledger objects are registered under.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Whether the agent holds a public DID (required to act as issuer).
    #[serde(default = "default_true")]
    pub public_did: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// How long a state wait may block before failing, in milliseconds.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Maximum number of state events kept for replay.
    #[serde(default = "default_event_buffer_capacity")]
    pub event_buffer_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "0.0.0.0".into()
}
fn default_api_port() -> u16 {
    9020
}
fn default_namespace() -> String {
    backchannel_core::DEFAULT_NAMESPACE.into()
}
fn default_true() -> bool {
    true
}
fn default_wait_timeout_ms() -> u64 {
    20_000
}
fn default_event_buffer_capacity() -> usize {
    4096
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            public_did: true,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
            event_buffer_capacity: default_event_buffer_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BackchannelConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields or a missing file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: BackchannelConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
