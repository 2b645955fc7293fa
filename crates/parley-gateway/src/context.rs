use parley_session::{SessionId, StoreScope, Transcript};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// Where a logged-in context is in its interaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Ready for the next prompt.
    Idle,
    /// A prompt is out at the inference endpoint.
    AwaitingReply,
}

/// Everything one logged-in browser is working with.
///
/// Created at login, dropped at logout. There is no "logged out" value: a
/// missing context is the logged-out state.
#[derive(Debug)]
pub struct ChatContext {
    /// Authenticated user; fixed for the context's lifetime.
    pub username: String,
    /// The active session.
    pub transcript: Transcript,
    /// Where the context is in the prompt/reply cycle.
    pub phase: Phase,
}

impl ChatContext {
    /// A new context starts `Idle`.
    pub fn new(username: impl Into<String>, transcript: Transcript) -> Self {
        Self {
            username: username.into(),
            transcript,
            phase: Phase::Idle,
        }
    }

    /// Id of the active session.
    pub fn session_id(&self) -> &SessionId {
        self.transcript.session_id()
    }

    /// Storage scope of this user.
    pub fn scope(&self) -> StoreScope {
        StoreScope::user(self.username.clone())
    }
}

/// A context bound to its login token. Holding the lock serializes every
/// action for that login.
#[derive(Clone)]
pub struct ContextHandle {
    /// Login token from the cookie.
    pub token: String,
    /// Locked for the whole of each action.
    pub context: Arc<Mutex<ChatContext>>,
}

/// Contexts untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

struct Entry {
    context: Arc<Mutex<ChatContext>>,
    last_seen: Instant,
}

/// Live chat contexts keyed by login token.
///
/// A context lives until logout, until the same browser logs in again, or
/// until it has been idle longer than the registry's timeout.
pub struct ContextRegistry {
    contexts: RwLock<HashMap<String, Entry>>,
    idle_timeout: Duration,
}

impl ContextRegistry {
    /// Registry with [`DEFAULT_IDLE_TIMEOUT`].
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registry that drops contexts idle longer than `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            contexts: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    /// Store a fresh context and return its login token. Idle contexts are
    /// swept first.
    pub async fn insert(&self, context: ChatContext) -> String {
        let token = Uuid::new_v4().to_string();
        let username = context.username.clone();
        let mut contexts = self.contexts.write().await;

        let before = contexts.len();
        contexts.retain(|_, entry| entry.last_seen.elapsed() < self.idle_timeout);
        let expired = before - contexts.len();
        if expired > 0 {
            info!(expired, "Idle chat contexts dropped");
        }

        contexts.insert(
            token.clone(),
            Entry {
                context: Arc::new(Mutex::new(context)),
                last_seen: Instant::now(),
            },
        );
        info!(username = %username, live = contexts.len(), "Chat context created");
        token
    }

    /// Look up a live context and mark it as seen.
    pub async fn get(&self, token: &str) -> Option<ContextHandle> {
        let mut contexts = self.contexts.write().await;
        let stale = match contexts.get_mut(token) {
            Some(entry) if entry.last_seen.elapsed() < self.idle_timeout => {
                entry.last_seen = Instant::now();
                return Some(ContextHandle {
                    token: token.to_string(),
                    context: entry.context.clone(),
                });
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            contexts.remove(token);
            info!("Chat context expired");
        }
        None
    }

    /// Drop a context. Returns false if the token was unknown.
    pub async fn remove(&self, token: &str) -> bool {
        let removed = self.contexts.write().await.remove(token).is_some();
        if removed {
            info!("Chat context removed");
        }
        removed
    }

    /// Number of stored contexts, including not-yet-swept idle ones.
    pub async fn context_count(&self) -> usize {
        self.contexts.read().await.len()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}
