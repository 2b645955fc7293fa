//! Remote session tier backed by a DynamoDB table.
//!
//! Speaks the DynamoDB JSON protocol directly: one signed POST per call with
//! the operation named in `x-amz-target`. Items look like
//!
//! ```json
//! {"SessionId": {"S": "2024-05-01T09-30-00"},
//!  "Username": {"S": "alice"},
//!  "ChatHistory": {"L": [{"M": {"role": {"S": "user"}, "content": {"S": "hello"}}}]}}
//! ```

use crate::config::RemoteTableConfig;
use crate::session_id::SessionId;
use crate::store::{SessionStore, StoreScope};
use crate::transcript::Transcript;
use async_trait::async_trait;
use chrono::Utc;
use parley_core::{ChatTurn, ParleyError, ParleyResult, Role};
use parley_security::{AwsCredentials, SigV4Signer};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const TARGET_PREFIX: &str = "DynamoDB_20120810";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Session store talking to a DynamoDB table keyed by `SessionId`.
pub struct DynamoTable {
    table: String,
    endpoint: String,
    signer: SigV4Signer,
    credentials: Option<AwsCredentials>,
    http: reqwest::Client,
}

impl DynamoTable {
    /// Client for `[storage.remote]`; credentials are read per call unless fixed.
    pub fn new(config: &RemoteTableConfig) -> ParleyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::Http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            table: config.table.clone(),
            endpoint: config.endpoint_url(),
            signer: SigV4Signer::new(&config.region, "dynamodb"),
            credentials: None,
            http,
        })
    }

    /// Use fixed credentials instead of discovering them from the environment on every call.
    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Table name in use.
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn call(&self, operation: &str, body: Value) -> ParleyResult<Value> {
        let credentials = match &self.credentials {
            Some(c) => c.clone(),
            None => AwsCredentials::from_env()?,
        };

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", format!("{TARGET_PREFIX}.{operation}"))
            .body(serde_json::to_vec(&body)?)
            .build()
            .map_err(|e| ParleyError::Http(e.to_string()))?;
        self.signer.sign(&credentials, &mut request, Utc::now())?;

        let resp = self
            .http
            .execute(request)
            .await
            .map_err(|e| ParleyError::Storage(format!("{operation} failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ParleyError::Storage(format!("{operation} failed: {e}")))?;

        if !status.is_success() {
            return Err(ParleyError::Storage(format!(
                "{operation} on {} returned {status}: {}",
                self.table,
                describe_error(&text)
            )));
        }
        serde_json::from_str(&text)
            .map_err(|e| ParleyError::Storage(format!("{operation} returned invalid JSON: {e}")))
    }
}

#[async_trait]
impl SessionStore for DynamoTable {
    async fn fetch(&self, scope: &StoreScope, id: &SessionId) -> ParleyResult<Option<Transcript>> {
        let body = json!({
            "TableName": self.table,
            "Key": {"SessionId": {"S": id.as_str()}},
            "ConsistentRead": true,
        });
        let resp = self.call("GetItem", body).await?;
        let Some(item) = resp.get("Item") else {
            return Ok(None);
        };

        if let Some(user) = &scope.user {
            let owner = item
                .get("Username")
                .and_then(|u| u.get("S"))
                .and_then(Value::as_str);
            // Items without an owner are only visible to unscoped lookups.
            if owner != Some(user.as_str()) {
                debug!(session_id = %id, "Remote item not owned by this user, treating as miss");
                return Ok(None);
            }
        }

        let turns = decode_history(item)?;
        Ok(Some(Transcript::with_turns(id.clone(), turns)))
    }

    async fn save(&self, scope: &StoreScope, transcript: &Transcript) -> ParleyResult<()> {
        let body = json!({
            "TableName": self.table,
            "Item": encode_item(scope, transcript),
        });
        self.call("PutItem", body).await?;
        debug!(session_id = %transcript.session_id(), table = %self.table, "Session written to remote table");
        Ok(())
    }

    async fn list(&self, scope: &StoreScope) -> ParleyResult<Vec<SessionId>> {
        let mut ids = Vec::new();
        let mut start_key: Option<Value> = None;

        loop {
            let mut body = json!({
                "TableName": self.table,
                "ProjectionExpression": "SessionId",
            });
            if let Some(user) = &scope.user {
                body["FilterExpression"] = json!("Username = :u");
                body["ExpressionAttributeValues"] = json!({":u": {"S": user}});
            }
            if let Some(key) = start_key.take() {
                body["ExclusiveStartKey"] = key;
            }

            let resp = self.call("Scan", body).await?;
            for item in resp["Items"].as_array().into_iter().flatten() {
                match item["SessionId"]["S"].as_str().map(SessionId::parse) {
                    Some(Ok(id)) => ids.push(id),
                    _ => warn!(table = %self.table, "Skipping remote item with unusable SessionId"),
                }
            }

            match resp.get("LastEvaluatedKey") {
                Some(key) if !key.is_null() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

fn encode_item(scope: &StoreScope, transcript: &Transcript) -> Value {
    let history: Vec<Value> = transcript
        .turns()
        .iter()
        .map(|turn| {
            json!({"M": {
                "role": {"S": turn.role.as_str()},
                "content": {"S": turn.content},
            }})
        })
        .collect();

    let mut item = json!({
        "SessionId": {"S": transcript.session_id().as_str()},
        "ChatHistory": {"L": history},
    });
    if let Some(user) = &scope.user {
        item["Username"] = json!({"S": user});
    }
    item
}

fn decode_history(item: &Value) -> ParleyResult<Vec<ChatTurn>> {
    let Some(list) = item.get("ChatHistory") else {
        return Ok(Vec::new());
    };
    let entries = list["L"]
        .as_array()
        .ok_or_else(|| ParleyError::Storage("ChatHistory is not a list".into()))?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let fields = &entry["M"];
            let role = fields["role"]["S"]
                .as_str()
                .and_then(Role::parse)
                .ok_or_else(|| ParleyError::Storage(format!("ChatHistory[{i}] has no valid role")))?;
            let content = fields["content"]["S"]
                .as_str()
                .ok_or_else(|| ParleyError::Storage(format!("ChatHistory[{i}] has no content")))?;
            Ok(ChatTurn::new(role, content))
        })
        .collect()
}

/// Pull `__type` and `message` out of a DynamoDB error body.
fn describe_error(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => {
            let kind = v["__type"]
                .as_str()
                .and_then(|t| t.rsplit('#').next())
                .unwrap_or("UnknownError");
            let message = v["message"]
                .as_str()
                .or_else(|| v["Message"].as_str())
                .unwrap_or("");
            format!("{kind}: {message}")
        }
        Err(_) => body.chars().take(200).collect(),
    }
}
