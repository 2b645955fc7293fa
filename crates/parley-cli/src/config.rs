//! `parley.toml` loading.

use parley_inference::InferenceConfig;
use parley_session::StorageConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Full configuration file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ParleyConfig {
    /// `[server]`
    #[serde(default)]
    pub server: ServerConfig,
    /// `[storage]` and `[storage.remote]`
    #[serde(default)]
    pub storage: StorageConfig,
    /// `[inference]`
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// `[server]` section.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Bind address; `--host` overrides it.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port; `--port` overrides it.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prompts longer than this many characters are refused.
    #[serde(default = "default_max_prompt_length")]
    pub max_prompt_length: usize,
    /// A login unused for this many seconds has to log in again.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_prompt_length: default_max_prompt_length(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_prompt_length() -> usize {
    32_000
}
fn default_idle_timeout_secs() -> u64 {
    parley_gateway::DEFAULT_IDLE_TIMEOUT.as_secs()
}

impl ParleyConfig {
    /// Read and parse `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let config: Self = toml::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
                })?;
                info!(path = %path.display(), "Config loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            )),
        }
    }
}
