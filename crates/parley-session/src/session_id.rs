use chrono::{DateTime, Local, TimeZone};
use parley_core::{ParleyError, ParleyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_ID_LEN: usize = 128;

/// Timestamp layout used for freshly created sessions, e.g. `2024-05-01T09-30-00`.
pub const SESSION_ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Opaque identifier of one chat transcript.
///
/// Doubles as a file stem, so only path-safe characters are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate an externally supplied id.
    pub fn parse(raw: &str) -> ParleyResult<Self> {
        if is_safe_component(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ParleyError::Session(format!("Invalid session id: {raw:?}")))
        }
    }

    /// A new id derived from the current local time.
    pub fn generate() -> Self {
        Self::from_timestamp(&Local::now())
    }

    /// Id for a given creation time.
    pub fn from_timestamp<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(at.format(SESSION_ID_FORMAT).to_string())
    }

    /// The id as stored on disk and in the table.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ParleyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// True when `s` can be used as a single path component: non-empty, at most
/// 128 bytes, no `..`, and only ASCII alphanumerics or `-`, `_`, `.`, `:`.
pub fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_ID_LEN
        && !s.contains("..")
        && !s.starts_with('.')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}
