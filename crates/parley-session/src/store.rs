use crate::session_id::{is_safe_component, SessionId};
use crate::transcript::Transcript;
use async_trait::async_trait;
use parley_core::{ParleyError, ParleyResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which user's sessions an operation addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreScope {
    /// `None` reads and writes outside any user namespace.
    pub user: Option<String>,
}

impl StoreScope {
    /// Sessions shared by everybody (no namespace).
    pub fn global() -> Self {
        Self { user: None }
    }

    /// Scope restricted to one user's sessions.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            user: Some(name.into()),
        }
    }
}

/// Persistence for transcripts, keyed by scope and session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a stored transcript. `Ok(None)` means nothing is stored under the id.
    async fn fetch(&self, scope: &StoreScope, id: &SessionId) -> ParleyResult<Option<Transcript>>;

    /// Overwrite the stored copy with the full transcript.
    async fn save(&self, scope: &StoreScope, transcript: &Transcript) -> ParleyResult<()>;

    /// Session ids stored for `scope`, ascending.
    async fn list(&self, scope: &StoreScope) -> ParleyResult<Vec<SessionId>>;

    /// Like [`SessionStore::fetch`] but never fails: absence and read errors
    /// both yield an empty transcript.
    async fn load(&self, scope: &StoreScope, id: &SessionId) -> Transcript {
        match self.fetch(scope, id).await {
            Ok(Some(transcript)) => transcript,
            Ok(None) => Transcript::new(id.clone()),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Failed to read session, starting empty");
                Transcript::new(id.clone())
            }
        }
    }
}

/// File-based session store: one JSON array per session at
/// `<root>/[<user>/]<session_id>.json`.
pub struct FileSessionStore {
    root: PathBuf,
    namespace_by_user: bool,
}

impl FileSessionStore {
    /// Creates `root` if needed.
    pub async fn new(root: PathBuf, namespace_by_user: bool) -> ParleyResult<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            namespace_by_user,
        })
    }

    /// Directory all session files live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: &StoreScope) -> ParleyResult<PathBuf> {
        match (&scope.user, self.namespace_by_user) {
            (Some(user), true) => {
                if !is_safe_component(user) {
                    return Err(ParleyError::Session(format!(
                        "Username cannot be used as a directory: {user:?}"
                    )));
                }
                Ok(self.root.join(user))
            }
            _ => Ok(self.root.clone()),
        }
    }

    fn session_path(&self, scope: &StoreScope, id: &SessionId) -> ParleyResult<PathBuf> {
        Ok(self.scope_dir(scope)?.join(format!("{id}.json")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn fetch(&self, scope: &StoreScope, id: &SessionId) -> ParleyResult<Option<Transcript>> {
        let path = self.session_path(scope, id)?;
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let transcript = Transcript::from_json(id.clone(), &data)
            .map_err(|e| ParleyError::Session(format!("Failed to parse session {id}: {e}")))?;
        Ok(Some(transcript))
    }

    async fn save(&self, scope: &StoreScope, transcript: &Transcript) -> ParleyResult<()> {
        let dir = self.scope_dir(scope)?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.json", transcript.session_id()));
        tokio::fs::write(&path, transcript.to_json()?).await?;
        debug!(path = %path.display(), turns = transcript.len(), "Session written");
        Ok(())
    }

    async fn list(&self, scope: &StoreScope) -> ParleyResult<Vec<SessionId>> {
        let dir = self.scope_dir(scope)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".json") {
                    if let Ok(id) = SessionId::parse(stem) {
                        ids.push(id);
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
