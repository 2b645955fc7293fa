#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use parley_core::{ChatTurn, ParleyError, ParleyResult, Role};
use parley_security::AwsCredentials;
use parley_session::{
    DynamoTable, FileSessionStore, RemoteTableConfig, SessionId, SessionPicker, SessionStore,
    StoreScope, TieredSessionStore, Transcript,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: create a namespaced FileSessionStore in a temp directory.
async fn temp_store() -> (FileSessionStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(tmp.path().join("chat_logs"), true)
        .await
        .unwrap();
    (store, tmp)
}

fn sid(s: &str) -> SessionId {
    SessionId::parse(s).unwrap()
}

fn two_turns(id: &str) -> Transcript {
    let mut t = Transcript::new(sid(id));
    t.push_user("hello");
    t.push_assistant("hi");
    t
}

/// In-memory tier that counts calls and can be told to fail writes.
#[derive(Default)]
struct MemoryTier {
    items: Mutex<HashMap<String, Vec<ChatTurn>>>,
    fetches: AtomicUsize,
    fail_writes: bool,
}

#[async_trait]
impl SessionStore for MemoryTier {
    async fn fetch(&self, _scope: &StoreScope, id: &SessionId) -> ParleyResult<Option<Transcript>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let items = self.items.lock().unwrap();
        Ok(items
            .get(id.as_str())
            .map(|turns| Transcript::with_turns(id.clone(), turns.clone())))
    }

    async fn save(&self, _scope: &StoreScope, transcript: &Transcript) -> ParleyResult<()> {
        if self.fail_writes {
            return Err(ParleyError::Storage("table unavailable".into()));
        }
        self.items.lock().unwrap().insert(
            transcript.session_id().to_string(),
            transcript.turns().to_vec(),
        );
        Ok(())
    }

    async fn list(&self, _scope: &StoreScope) -> ParleyResult<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self
            .items
            .lock()
            .unwrap()
            .keys()
            .map(|k| SessionId::parse(k).unwrap())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

// --- FileSessionStore ---

#[tokio::test]
async fn test_save_then_load_round_trip() {
    let (store, _tmp) = temp_store().await;
    let scope = StoreScope::user("alice");
    let transcript = two_turns("2024-05-01T09-30-00");

    store.save(&scope, &transcript).await.unwrap();

    let loaded = store.load(&scope, transcript.session_id()).await;
    assert_eq!(loaded, transcript);
}

#[tokio::test]
async fn test_load_never_saved_is_empty() {
    let (store, _tmp) = temp_store().await;
    let loaded = store
        .load(&StoreScope::user("alice"), &sid("never-saved"))
        .await;
    assert!(loaded.is_empty());
    assert_eq!(loaded.session_id(), &sid("never-saved"));
}

#[tokio::test]
async fn test_save_overwrites() {
    let (store, _tmp) = temp_store().await;
    let scope = StoreScope::user("alice");
    let mut transcript = two_turns("s1");
    store.save(&scope, &transcript).await.unwrap();

    transcript.push_user("second");
    transcript.push_assistant("reply");
    store.save(&scope, &transcript).await.unwrap();

    let loaded = store.load(&scope, &sid("s1")).await;
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.turns()[3], ChatTurn::assistant("reply"));
}

#[tokio::test]
async fn test_users_do_not_see_each_other() {
    let (store, _tmp) = temp_store().await;
    store
        .save(&StoreScope::user("alice"), &two_turns("alice-chat"))
        .await
        .unwrap();
    store
        .save(&StoreScope::user("bob"), &two_turns("bob-chat"))
        .await
        .unwrap();

    let alice = store.list(&StoreScope::user("alice")).await.unwrap();
    assert_eq!(alice, vec![sid("alice-chat")]);

    let bob_reads_alice = store
        .fetch(&StoreScope::user("bob"), &sid("alice-chat"))
        .await
        .unwrap();
    assert!(bob_reads_alice.is_none());
}

#[tokio::test]
async fn test_persisted_file_shape() {
    let (store, tmp) = temp_store().await;
    store
        .save(&StoreScope::user("alice"), &two_turns("s1"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(tmp.path().join("chat_logs/alice/s1.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        json!([
            {"role": "user", "content": "hello"},
            {"role": "assistant", "content": "hi"}
        ])
    );
}

// --- SessionPicker ---

#[tokio::test]
async fn test_picker_labels_and_skips_corrupt_files() {
    let (store, tmp) = temp_store().await;
    let scope = StoreScope::user("alice");

    let mut first = Transcript::new(sid("2024-01-01T10-00-00"));
    first.push_user("Why is the nightly ingestion job failing on Sundays?");
    first.push_assistant("Let me check.");
    store.save(&scope, &first).await.unwrap();

    store
        .save(&scope, &Transcript::new(sid("2024-01-02T10-00-00")))
        .await
        .unwrap();

    let alice_dir = tmp.path().join("chat_logs/alice");
    std::fs::write(alice_dir.join("2024-01-03T10-00-00.json"), "{\"oops\":").unwrap();
    std::fs::write(
        alice_dir.join("2024-01-04T10-00-00.json"),
        r#"[{"role": "wizard", "content": "x"}]"#,
    )
    .unwrap();

    let picker = SessionPicker::new(Arc::new(store));
    let entries = picker.entries(&scope).await;

    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0].label,
        "2024-01-01T10-00-00 - Why is the nightly ingestion j"
    );
    assert_eq!(entries[0].session_id, sid("2024-01-01T10-00-00"));
    assert_eq!(entries[1].label, "2024-01-02T10-00-00 - New Chat");
}

#[tokio::test]
async fn test_picker_empty_for_new_user() {
    let (store, _tmp) = temp_store().await;
    let picker = SessionPicker::new(Arc::new(store)).with_label_width(10);
    assert!(picker.entries(&StoreScope::user("bob")).await.is_empty());
}

// --- TieredSessionStore ---

#[tokio::test]
async fn test_tiered_local_hit_skips_remote() {
    let (local, _tmp) = temp_store().await;
    let remote = Arc::new(MemoryTier::default());
    let store = TieredSessionStore::new(Arc::new(local)).with_remote(remote.clone());
    let scope = StoreScope::user("alice");

    store.save(&scope, &two_turns("s1")).await.unwrap();
    let loaded = store.load(&scope, &sid("s1")).await;

    assert_eq!(loaded, two_turns("s1"));
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    // Both tiers received the write.
    assert!(remote.items.lock().unwrap().contains_key("s1"));
}

#[tokio::test]
async fn test_tiered_local_miss_falls_back_to_remote() {
    let (local, _tmp) = temp_store().await;
    let remote = Arc::new(MemoryTier::default());
    remote
        .save(&StoreScope::user("alice"), &two_turns("from-remote"))
        .await
        .unwrap();
    let store = TieredSessionStore::new(Arc::new(local)).with_remote(remote.clone());

    let loaded = store
        .load(&StoreScope::user("alice"), &sid("from-remote"))
        .await;
    assert_eq!(loaded.len(), 2);
    assert_eq!(remote.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tiered_local_only_miss_is_empty() {
    let (local, _tmp) = temp_store().await;
    let store = TieredSessionStore::new(Arc::new(local));
    assert!(!store.has_remote());
    assert!(store
        .load(&StoreScope::user("alice"), &sid("nothing"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_tiered_remote_failure_after_local_write() {
    let (local, _tmp) = temp_store().await;
    let local = Arc::new(local);
    let remote = Arc::new(MemoryTier {
        fail_writes: true,
        ..Default::default()
    });
    let store = TieredSessionStore::new(local.clone()).with_remote(remote);
    let scope = StoreScope::user("alice");

    let err = store.save(&scope, &two_turns("s1")).await.unwrap_err();
    assert!(matches!(err, ParleyError::Storage(_)));

    // The local copy is not rolled back.
    assert_eq!(local.load(&scope, &sid("s1")).await, two_turns("s1"));
}

#[tokio::test]
async fn test_tiered_lists_local_tier_only() {
    let (local, _tmp) = temp_store().await;
    let remote = Arc::new(MemoryTier::default());
    remote
        .save(&StoreScope::user("alice"), &two_turns("remote-only"))
        .await
        .unwrap();
    let store = TieredSessionStore::new(Arc::new(local)).with_remote(remote);
    store
        .save(&StoreScope::user("alice"), &two_turns("local"))
        .await
        .unwrap();

    let ids = store.list(&StoreScope::user("alice")).await.unwrap();
    assert_eq!(ids, vec![sid("local")]);
}

// --- DynamoTable ---

fn test_credentials() -> AwsCredentials {
    AwsCredentials {
        access_key_id: "AKIDTEST".into(),
        secret_access_key: "secret".into(),
        session_token: Some("session-token".into()),
    }
}

fn table_for(server: &MockServer) -> DynamoTable {
    let config = RemoteTableConfig {
        enabled: true,
        endpoint: Some(server.uri()),
        ..Default::default()
    };
    DynamoTable::new(&config)
        .unwrap()
        .with_credentials(test_credentials())
}

#[tokio::test]
async fn test_dynamo_get_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-amz-target", "DynamoDB_20120810.GetItem"))
        .and(header("content-type", "application/x-amz-json-1.0"))
        .and(header("x-amz-security-token", "session-token"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "TableName": "ChatHistory",
            "Key": {"SessionId": {"S": "s1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Item": {
                "SessionId": {"S": "s1"},
                "Username": {"S": "alice"},
                "ChatHistory": {"L": [
                    {"M": {"role": {"S": "user"}, "content": {"S": "hello"}}},
                    {"M": {"role": {"S": "assistant"}, "content": {"S": "hi"}}}
                ]}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let table = table_for(&server);
    let loaded = table
        .fetch(&StoreScope::user("alice"), &sid("s1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, two_turns("s1"));
}

#[tokio::test]
async fn test_dynamo_missing_item_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.GetItem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let table = table_for(&server);
    let result = table.fetch(&StoreScope::global(), &sid("s1")).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_dynamo_other_users_item_is_a_miss() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.GetItem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Item": {
                "SessionId": {"S": "s1"},
                "Username": {"S": "bob"},
                "ChatHistory": {"L": []}
            }
        })))
        .mount(&server)
        .await;

    let table = table_for(&server);
    let result = table
        .fetch(&StoreScope::user("alice"), &sid("s1"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_dynamo_unowned_item_only_visible_unscoped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.GetItem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Item": {
                "SessionId": {"S": "s1"},
                "ChatHistory": {"L": [
                    {"M": {"role": {"S": "user"}, "content": {"S": "hello"}}},
                    {"M": {"role": {"S": "assistant"}, "content": {"S": "hi"}}}
                ]}
            }
        })))
        .mount(&server)
        .await;

    let table = table_for(&server);
    let scoped = table
        .fetch(&StoreScope::user("alice"), &sid("s1"))
        .await
        .unwrap();
    assert!(scoped.is_none());

    let unscoped = table
        .fetch(&StoreScope::global(), &sid("s1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unscoped, two_turns("s1"));
}

#[tokio::test]
async fn test_dynamo_put_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.PutItem"))
        .and(header_exists("x-amz-date"))
        .and(body_partial_json(json!({
            "TableName": "ChatHistory",
            "Item": {
                "SessionId": {"S": "s1"},
                "Username": {"S": "alice"},
                "ChatHistory": {"L": [
                    {"M": {"role": {"S": "user"}, "content": {"S": "hello"}}},
                    {"M": {"role": {"S": "assistant"}, "content": {"S": "hi"}}}
                ]}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let table = table_for(&server);
    table
        .save(&StoreScope::user("alice"), &two_turns("s1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dynamo_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
            "message": "Requested resource not found"
        })))
        .mount(&server)
        .await;

    let table = table_for(&server);
    let err = table
        .save(&StoreScope::global(), &two_turns("s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::Storage(_)));
    assert!(err.to_string().contains("ResourceNotFoundException"));

    // Reads degrade to an empty transcript.
    assert!(table.load(&StoreScope::global(), &sid("s1")).await.is_empty());
}

#[tokio::test]
async fn test_dynamo_scan_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.Scan"))
        .and(body_partial_json(json!({
            "ExclusiveStartKey": {"SessionId": {"S": "b"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"SessionId": {"S": "a"}}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.Scan"))
        .and(body_partial_json(json!({
            "FilterExpression": "Username = :u",
            "ExpressionAttributeValues": {":u": {"S": "alice"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"SessionId": {"S": "c"}}, {"SessionId": {"S": "b"}}],
            "LastEvaluatedKey": {"SessionId": {"S": "b"}}
        })))
        .mount(&server)
        .await;

    let table = table_for(&server);
    let ids = table.list(&StoreScope::user("alice")).await.unwrap();
    assert_eq!(ids, vec![sid("a"), sid("b"), sid("c")]);
}

#[tokio::test]
async fn test_tiered_with_dynamo_round_trip_role_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "DynamoDB_20120810.GetItem"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Item": {
                "SessionId": {"S": "old"},
                "Username": {"S": "alice"},
                "ChatHistory": {"L": [
                    {"M": {"role": {"S": "user"}, "content": {"S": "q"}}},
                    {"M": {"role": {"S": "assistant"}, "content": {"S": "a"}}}
                ]}
            }
        })))
        .mount(&server)
        .await;

    let (local, _tmp) = temp_store().await;
    let store = TieredSessionStore::new(Arc::new(local)).with_remote(Arc::new(table_for(&server)));
    let loaded = store.load(&StoreScope::user("alice"), &sid("old")).await;
    let roles: Vec<Role> = loaded.turns().iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}
