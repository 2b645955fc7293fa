//! AWS Signature Version 4 for outbound `reqwest` requests.
//!
//! Signs `host`, `content-type`, and every `x-amz-*` header present on the
//! request, plus the SHA-256 of the buffered body. Streaming bodies are signed
//! as empty, which callers never send.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use parley_core::{ParleyError, ParleyResult};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Short-lived caller credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    /// `AWS_ACCESS_KEY_ID`
    pub access_key_id: String,
    /// `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: String,
    /// Present for temporary credentials.
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Discover credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
    /// and the optional `AWS_SESSION_TOKEN`.
    pub fn from_env() -> ParleyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AwsCredentials::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> ParleyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let access_key_id = read("AWS_ACCESS_KEY_ID")
            .ok_or_else(|| ParleyError::Signing("AWS_ACCESS_KEY_ID is not set".into()))?;
        let secret_access_key = read("AWS_SECRET_ACCESS_KEY")
            .ok_or_else(|| ParleyError::Signing("AWS_SECRET_ACCESS_KEY is not set".into()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: read("AWS_SESSION_TOKEN"),
        })
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Signs requests for one region/service pair.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    region: String,
    service: String,
}

impl SigV4Signer {
    /// Signer for one region/service credential scope.
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }

    /// Region in the credential scope.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service in the credential scope.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Add `x-amz-date`, `x-amz-security-token` (when present) and
    /// `authorization` to `request`.
    pub fn sign(
        &self,
        credentials: &AwsCredentials,
        request: &mut reqwest::Request,
        now: DateTime<Utc>,
    ) -> ParleyResult<()> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        insert_header(request, "x-amz-date", &amz_date)?;
        if let Some(token) = &credentials.session_token {
            insert_header(request, "x-amz-security-token", token)?;
        }

        let (canonical, signed_headers) = canonical_request(request)?;
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let key = signing_key(
            &credentials.secret_access_key,
            &date,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        );
        insert_header(request, AUTHORIZATION.as_str(), &authorization)
    }
}

fn insert_header(request: &mut reqwest::Request, name: &str, value: &str) -> ParleyResult<()> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ParleyError::Signing(format!("invalid header name {name}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| ParleyError::Signing(format!("invalid value for {name}: {e}")))?;
    request.headers_mut().insert(name, value);
    Ok(())
}

/// Returns the canonical request and the `SignedHeaders` list.
fn canonical_request(request: &reqwest::Request) -> ParleyResult<(String, String)> {
    let url = request.url();
    let host = url
        .host_str()
        .ok_or_else(|| ParleyError::Signing(format!("URL has no host: {url}")))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    headers.insert("host".into(), host);
    for (name, value) in request.headers() {
        let name = name.as_str();
        if name == "content-type" || name.starts_with("x-amz-") {
            let value = value
                .to_str()
                .map_err(|e| ParleyError::Signing(format!("header {name} is not ASCII: {e}")))?;
            headers.insert(name.to_string(), normalize_header_value(value));
        }
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let path = if url.path().is_empty() { "/" } else { url.path() };
    let canonical_uri = path
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/");

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    query.sort();
    let canonical_query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let payload = request.body().and_then(|b| b.as_bytes()).unwrap_or_default();
    let payload_hash = hex::encode(Sha256::digest(payload));

    let canonical = format!(
        "{}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        request.method().as_str()
    );
    Ok((canonical, signed_headers))
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn hmac(key: &[u8], data: &[u8]) -> ParleyResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ParleyError::Signing(format!("HMAC key rejected: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> ParleyResult<Vec<u8>> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}
