use async_trait::async_trait;
use tracing::{info, warn};

/// Message shown for every failed login. Unknown users and wrong passwords
/// are indistinguishable.
pub const LOGIN_FAILED_MESSAGE: &str = "Incorrect username/password";

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The pair matched; carries the canonical username.
    Accepted {
        /// Username to bind to the chat context.
        username: String,
    },
    /// The pair did not match.
    Rejected {
        /// Generic, user-visible reason.
        message: String,
    },
}

impl AuthOutcome {
    /// Returns true for [`AuthOutcome::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthOutcome::Accepted { .. })
    }

    fn rejected() -> Self {
        AuthOutcome::Rejected {
            message: LOGIN_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Verifies a username/password pair.
///
/// Implementations can be the fixed allow-list below, a database, LDAP, etc.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Check the pair. Never errors; failures are reported as [`AuthOutcome::Rejected`].
    async fn verify(&self, username: &str, password: &str) -> AuthOutcome;
}

/// Fixed allow-list where each user's password is the username followed by `123`.
///
/// Not configurable at runtime. No hashing, lockout, or rate limiting.
pub struct StaticCredentials {
    users: Vec<&'static str>,
}

impl StaticCredentials {
    /// The built-in users: `alice` and `bob`.
    pub fn builtin() -> Self {
        Self {
            users: vec!["alice", "bob"],
        }
    }

    /// Names of the users this verifier accepts.
    pub fn users(&self) -> &[&'static str] {
        &self.users
    }

    fn expected_password(username: &str) -> String {
        format!("{username}123")
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> AuthOutcome {
        let known = self.users.iter().any(|u| *u == username);
        let expected = Self::expected_password(username);
        // Always compare so both failure modes cost the same.
        let matches = constant_time_eq(expected.as_bytes(), password.as_bytes());

        if known && matches {
            info!(username = %username, "Login accepted");
            AuthOutcome::Accepted {
                username: username.to_string(),
            }
        } else {
            warn!("Login rejected");
            AuthOutcome::rejected()
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
