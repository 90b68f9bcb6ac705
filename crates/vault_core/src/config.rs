//! Configuration for the vault poller
//!
//! Everything except the vault id and API key can live in a TOML file;
//! command line flags are overlaid on top with [`merge_configs`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, backoff::Backoff, error::CoreError};

/// Production JSON-RPC endpoint of The Code Registry
pub const DEFAULT_MCP_URL: &str = "https://integrator.app.thecoderegistry.com/api/ai/router";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub poll: PollConfig,
}

/// Where the API key travels on each request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `X-API-Key` request header
    #[default]
    Header,
    /// `api_key` merged into the tool arguments
    Body,
}

/// RPC client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub auth_mode: AuthMode,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Poll loop settings, all in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_MCP_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_initial_delay_secs() -> u64 {
    5
}

fn default_max_delay_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auth_mode: AuthMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::from_secs(self.initial_delay_secs, self.max_delay_secs)
    }
}

/// Settings supplied on the command line; unset fields keep the base value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub auth_mode: Option<AuthMode>,
    pub request_timeout_secs: Option<u64>,
    pub initial_delay_secs: Option<u64>,
    pub max_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Overlay command line settings on a loaded configuration
pub fn merge_configs(base: VaultConfig, overlay: ConfigOverrides) -> VaultConfig {
    VaultConfig {
        client: ClientConfig {
            endpoint: overlay.endpoint.unwrap_or(base.client.endpoint),
            auth_mode: overlay.auth_mode.unwrap_or(base.client.auth_mode),
            request_timeout_secs: overlay
                .request_timeout_secs
                .unwrap_or(base.client.request_timeout_secs),
        },
        poll: PollConfig {
            initial_delay_secs: overlay
                .initial_delay_secs
                .unwrap_or(base.poll.initial_delay_secs),
            max_delay_secs: overlay.max_delay_secs.unwrap_or(base.poll.max_delay_secs),
            timeout_secs: overlay.timeout_secs.unwrap_or(base.poll.timeout_secs),
        },
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<VaultConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::config(path.display().to_string(), "file", "readable TOML file", e)
    })?;

    toml::from_str(&content).map_err(|e| {
        CoreError::config(
            path.display().to_string(),
            "content",
            "valid TOML configuration",
            e,
        )
    })
}

/// Standard config file locations
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("vault-poll.toml")];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("vault-poll").join("config.toml"));
    }

    paths
}

/// Load configuration from standard locations, falling back to defaults
pub async fn load_config_from_standard_locations() -> Result<VaultConfig> {
    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            return load_config(&path).await;
        }
    }

    Ok(VaultConfig::default())
}
