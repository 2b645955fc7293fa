use crate::session_id::SessionId;
use parley_core::{ChatTurn, Role};
use serde::Serialize;

/// Label shown for sessions that have no user turn yet.
pub const UNTITLED_LABEL: &str = "New Chat";

/// Default number of characters of the first prompt shown in a label.
pub const DEFAULT_LABEL_WIDTH: usize = 30;

/// The ordered turns of one chat session.
///
/// Turns are append-only: once pushed they are never edited or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    session_id: SessionId,
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// An empty transcript for `session_id`.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            turns: Vec::new(),
        }
    }

    /// A transcript restored from storage.
    pub fn with_turns(session_id: SessionId, turns: Vec<ChatTurn>) -> Self {
        Self { session_id, turns }
    }

    /// Id this transcript is stored under.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Turns in the order they happened.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True before the first prompt.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn. Turns are never edited or removed.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Append a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::user(content));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::assistant(content));
    }

    /// Content of the first user-authored turn, if any.
    pub fn first_user_content(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }

    /// Picker label: `"<session id> - <first prompt, at most max_chars chars>"`.
    pub fn label(&self, max_chars: usize) -> String {
        let title: String = self
            .first_user_content()
            .unwrap_or(UNTITLED_LABEL)
            .chars()
            .take(max_chars)
            .collect();
        format!("{} - {}", self.session_id, title)
    }

    /// Persisted form: the bare JSON array of `{role, content}` objects.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.turns)
    }

    /// Inverse of [`Transcript::to_json`].
    pub fn from_json(session_id: SessionId, json: &str) -> serde_json::Result<Self> {
        let turns: Vec<ChatTurn> = serde_json::from_str(json)?;
        Ok(Self::with_turns(session_id, turns))
    }
}
