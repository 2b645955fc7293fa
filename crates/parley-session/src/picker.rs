use crate::session_id::SessionId;
use crate::store::{SessionStore, StoreScope};
use crate::transcript::DEFAULT_LABEL_WIDTH;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One selectable row of the "previous chats" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerEntry {
    /// `<id> - <first prompt>`
    pub label: String,
    /// Id to pass to select.
    pub session_id: SessionId,
}

/// Enumerates a user's stored sessions with human-readable labels.
pub struct SessionPicker {
    store: Arc<dyn SessionStore>,
    label_width: usize,
}

impl SessionPicker {
    /// Picker over `store` with the default label width.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            label_width: DEFAULT_LABEL_WIDTH,
        }
    }

    /// Characters of the first prompt shown in labels.
    pub fn with_label_width(mut self, width: usize) -> Self {
        self.label_width = width;
        self
    }

    /// Entries sorted by session id. Unreadable sessions are skipped and an
    /// enumeration failure yields an empty list.
    pub async fn entries(&self, scope: &StoreScope) -> Vec<PickerEntry> {
        let ids = match self.store.list(scope).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate sessions");
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.fetch(scope, &id).await {
                Ok(Some(transcript)) => entries.push(PickerEntry {
                    label: transcript.label(self.label_width),
                    session_id: id,
                }),
                Ok(None) => debug!(session_id = %id, "Session vanished while listing"),
                Err(e) => debug!(session_id = %id, error = %e, "Skipping unreadable session"),
            }
        }
        entries
    }
}
