use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[storage]` section of `parley.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per session.
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// Keep each user's sessions in their own subdirectory.
    #[serde(default = "default_true")]
    pub namespace_by_user: bool,
    /// Optional second tier.
    #[serde(default)]
    pub remote: RemoteTableConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
            namespace_by_user: true,
            remote: RemoteTableConfig::default(),
        }
    }
}

/// `[storage.remote]`: the DynamoDB tier. Disabled means local testing mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTableConfig {
    /// Off means local files only.
    #[serde(default)]
    pub enabled: bool,
    /// Table name, `ChatHistory` by default.
    #[serde(default = "default_table")]
    pub table: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Override for local emulators, e.g. `http://localhost:8000`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteTableConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            table: default_table(),
            region: default_region(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteTableConfig {
    /// The configured endpoint, or the regional AWS one.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(url) => url.clone(),
            None => format!("https://dynamodb.{}.amazonaws.com/", self.region),
        }
    }
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("./chat_logs")
}
fn default_true() -> bool {
    true
}
fn default_table() -> String {
    "ChatHistory".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
