use crate::config::StorageConfig;
use crate::dynamo::DynamoTable;
use crate::session_id::SessionId;
use crate::store::{FileSessionStore, SessionStore, StoreScope};
use crate::transcript::Transcript;
use async_trait::async_trait;
use parley_core::ParleyResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Two-tier cache-aside store.
///
/// The local tier is authoritative whenever it holds a copy; the remote tier
/// is consulted only on a local miss. Writes go local first, then remote.
/// The two tiers are never reconciled, and a remote write failure after a
/// successful local write leaves them diverged.
pub struct TieredSessionStore {
    local: Arc<dyn SessionStore>,
    remote: Option<Arc<dyn SessionStore>>,
}

impl TieredSessionStore {
    /// Local tier only.
    pub fn new(local: Arc<dyn SessionStore>) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    /// Add the remote tier consulted on local misses.
    pub fn with_remote(mut self, remote: Arc<dyn SessionStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Build the tiers selected by `[storage]`.
    pub async fn from_config(config: &StorageConfig) -> ParleyResult<Self> {
        let local = FileSessionStore::new(config.local_dir.clone(), config.namespace_by_user).await?;
        let store = Self::new(Arc::new(local));

        if config.remote.enabled {
            let remote = DynamoTable::new(&config.remote)?;
            info!(
                table = %config.remote.table,
                region = %config.remote.region,
                "Remote session tier enabled"
            );
            Ok(store.with_remote(Arc::new(remote)))
        } else {
            info!(dir = %config.local_dir.display(), "Local-only session storage");
            Ok(store)
        }
    }

    /// Whether a remote tier is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[async_trait]
impl SessionStore for TieredSessionStore {
    async fn fetch(&self, scope: &StoreScope, id: &SessionId) -> ParleyResult<Option<Transcript>> {
        if let Some(transcript) = self.local.fetch(scope, id).await? {
            return Ok(Some(transcript));
        }
        match &self.remote {
            Some(remote) => {
                debug!(session_id = %id, "Local miss, consulting remote tier");
                remote.fetch(scope, id).await
            }
            None => Ok(None),
        }
    }

    async fn save(&self, scope: &StoreScope, transcript: &Transcript) -> ParleyResult<()> {
        self.local.save(scope, transcript).await?;
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.save(scope, transcript).await {
                warn!(
                    session_id = %transcript.session_id(),
                    error = %e,
                    "Remote write failed after local write; tiers have diverged"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Only the local tier is enumerated.
    async fn list(&self, scope: &StoreScope) -> ParleyResult<Vec<SessionId>> {
        self.local.list(scope).await
    }
}
