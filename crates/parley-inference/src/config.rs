use serde::{Deserialize, Serialize};

/// `[inference]` section of `parley.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Endpoint receiving `POST {"prompt": ...}`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Whole-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// When present, requests are signed with SigV4 using caller credentials
    /// from the environment.
    #[serde(default)]
    pub signing: Option<SigningConfig>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            signing: None,
        }
    }
}

/// `[inference.signing]`: presence turns signing on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Service name in the credential scope, e.g. `lambda` or `execute-api`.
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            service: default_service(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:9000/chat".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_service() -> String {
    "lambda".to_string()
}
