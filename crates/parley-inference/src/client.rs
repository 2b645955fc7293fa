use crate::config::InferenceConfig;
use async_trait::async_trait;
use chrono::Utc;
use parley_core::{ParleyError, ParleyResult};
use parley_security::{AwsCredentials, SigV4Signer};
use serde_json::Value;
use std::fmt::Write;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Reply used when the endpoint answers with JSON that carries no `response`.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Something that turns a prompt into an assistant reply.
///
/// Implementations never fail: problems are reported inside the returned text
/// so the conversation can continue.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Reply text for `prompt`; failures come back as readable text.
    async fn ask(&self, prompt: &str) -> String;
}

/// Single-attempt HTTP client for the inference endpoint.
pub struct InferenceClient {
    url: String,
    http: reqwest::Client,
    signer: Option<SigV4Signer>,
    credentials: Option<AwsCredentials>,
}

impl InferenceClient {
    /// HTTP client with the configured timeout and optional signer.
    pub fn new(config: &InferenceConfig) -> ParleyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::Http(format!("Failed to create HTTP client: {e}")))?;
        let signer = config
            .signing
            .as_ref()
            .map(|s| SigV4Signer::new(&s.region, &s.service));
        Ok(Self {
            url: config.url.clone(),
            http,
            signer,
            credentials: None,
        })
    }

    /// Sign with fixed credentials instead of reading the environment per call.
    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Endpoint receiving prompts.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether requests get SigV4 headers.
    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }

    /// One POST. `Ok(None)` means the body was JSON without a usable `response`.
    pub async fn try_ask(&self, prompt: &str) -> ParleyResult<Option<String>> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .build()
            .map_err(|e| ParleyError::Http(e.to_string()))?;

        if let Some(signer) = &self.signer {
            let credentials = match &self.credentials {
                Some(c) => c.clone(),
                None => AwsCredentials::from_env()?,
            };
            signer.sign(&credentials, &mut request, Utc::now())?;
        }

        let started = Instant::now();
        let resp = self
            .http
            .execute(request)
            .await
            .map_err(|e| ParleyError::Http(describe_transport(&e)))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ParleyError::Http(describe_transport(&e)))?;

        if !status.is_success() {
            warn!(status = %status, url = %self.url, "Inference endpoint returned an error status");
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ParleyError::Inference(format!("invalid JSON from endpoint: {e}")))?;

        info!(
            url = %self.url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inference reply received"
        );
        Ok(extract_reply(&value))
    }
}

#[async_trait]
impl InferenceBackend for InferenceClient {
    async fn ask(&self, prompt: &str) -> String {
        match self.try_ask(prompt).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                warn!(url = %self.url, "Inference response had no `response` field");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Inference call failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Kind of transport failure followed by the full cause chain.
fn describe_transport(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    let mut detail = format!("{kind}: {e}");
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let _ = write!(detail, ": {cause}");
        source = cause.source();
    }
    detail
}

/// `response` at the top level, or inside a proxy-style `body` string as
/// returned by a directly invoked function.
fn extract_reply(value: &Value) -> Option<String> {
    if let Some(reply) = value.get("response").and_then(Value::as_str) {
        return Some(reply.to_string());
    }
    let body = value.get("body").and_then(Value::as_str)?;
    let inner: Value = serde_json::from_str(body).ok()?;
    inner
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
}
