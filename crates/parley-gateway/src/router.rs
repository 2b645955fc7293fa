use crate::context::{ChatContext, Phase};
use parley_core::{ParleyError, ParleyResult};
use parley_inference::InferenceBackend;
use parley_security::Sanitizer;
use parley_session::{PickerEntry, SessionId, SessionPicker, SessionStore, StoreScope, Transcript};
use std::sync::Arc;
use tracing::{info, warn};

/// Applies user actions to a [`ChatContext`]: prompts, new chats, session picks.
pub struct ChatRouter {
    backend: Arc<dyn InferenceBackend>,
    store: Arc<dyn SessionStore>,
    picker: SessionPicker,
    sanitizer: Sanitizer,
}

impl ChatRouter {
    /// Prompts go to `backend`, transcripts to `store`.
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        store: Arc<dyn SessionStore>,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            backend,
            picker: SessionPicker::new(store.clone()),
            store,
            sanitizer,
        }
    }

    /// Context for a user who just logged in: a fresh timestamp session.
    pub async fn open_context(&self, username: &str) -> ChatContext {
        let scope = StoreScope::user(username);
        let transcript = self.store.load(&scope, &SessionId::generate()).await;
        ChatContext::new(username, transcript)
    }

    /// Append the prompt, ask the backend, append the reply, persist.
    ///
    /// Backend failures become the reply text. A storage write failure is
    /// returned after the turns were appended in memory.
    pub async fn send_prompt(&self, ctx: &mut ChatContext, prompt: &str) -> ParleyResult<String> {
        let prompt = self
            .sanitizer
            .check(prompt)
            .map_err(|rejection| {
                warn!(username = %ctx.username, reason = %rejection, "Prompt rejected");
                ParleyError::InvalidInput(rejection.to_string())
            })?;

        info!(
            username = %ctx.username,
            session_id = %ctx.session_id(),
            prompt_chars = prompt.chars().count(),
            "Routing prompt to inference endpoint"
        );

        ctx.transcript.push_user(prompt.as_str());
        ctx.phase = Phase::AwaitingReply;
        let reply = self.backend.ask(&prompt).await;
        ctx.transcript.push_assistant(reply.as_str());
        ctx.phase = Phase::Idle;

        self.store.save(&ctx.scope(), &ctx.transcript).await?;
        Ok(reply)
    }

    /// Switch to a new, timestamp-named session.
    pub async fn new_chat(&self, ctx: &mut ChatContext) {
        let id = SessionId::generate();
        ctx.transcript = self.store.load(&ctx.scope(), &id).await;
        info!(username = %ctx.username, session_id = %id, "New chat started");
    }

    /// Make a previously stored session the active one.
    pub async fn select_session<'a>(
        &self,
        ctx: &'a mut ChatContext,
        raw_id: &str,
    ) -> ParleyResult<&'a Transcript> {
        let id = SessionId::parse(raw_id)?;
        ctx.transcript = self.store.load(&ctx.scope(), &id).await;
        info!(
            username = %ctx.username,
            session_id = %id,
            turns = ctx.transcript.len(),
            "Session selected"
        );
        Ok(&ctx.transcript)
    }

    /// Picker entries for the user's stored sessions.
    pub async fn list_sessions(&self, username: &str) -> Vec<PickerEntry> {
        self.picker.entries(&StoreScope::user(username)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::Role;
    use parley_session::FileSessionStore;

    struct Echo;

    #[async_trait]
    impl InferenceBackend for Echo {
        async fn ask(&self, prompt: &str) -> String {
            format!("echo: {prompt}")
        }
    }

    async fn router(tmp: &tempfile::TempDir) -> (ChatRouter, Arc<FileSessionStore>) {
        let store = Arc::new(
            FileSessionStore::new(tmp.path().to_path_buf(), true)
                .await
                .unwrap(),
        );
        (
            ChatRouter::new(Arc::new(Echo), store.clone(), Sanitizer::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_prompt_appends_two_turns_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let (router, store) = router(&tmp).await;
        let mut ctx = router.open_context("alice").await;

        let reply = router.send_prompt(&mut ctx, "hello").await.unwrap();
        assert_eq!(reply, "echo: hello");
        assert_eq!(ctx.phase, Phase::Idle);

        let roles: Vec<Role> = ctx.transcript.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);

        let stored = store.load(&ctx.scope(), ctx.session_id()).await;
        assert_eq!(stored, ctx.transcript);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_invalid_input() {
        let tmp = tempfile::tempdir().unwrap();
        let (router, _store) = router(&tmp).await;
        let mut ctx = router.open_context("alice").await;

        let err = router.send_prompt(&mut ctx, "  ").await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidInput(_)));
        assert!(ctx.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_select_session_loads_stored_turns() {
        let tmp = tempfile::tempdir().unwrap();
        let (router, store) = router(&tmp).await;

        let mut old = Transcript::new(SessionId::parse("2023-12-31T23-59-59").unwrap());
        old.push_user("last year");
        store.save(&StoreScope::user("alice"), &old).await.unwrap();

        let mut ctx = router.open_context("alice").await;
        let selected = router
            .select_session(&mut ctx, "2023-12-31T23-59-59")
            .await
            .unwrap();
        assert_eq!(selected, &old);

        assert!(router.select_session(&mut ctx, "../etc").await.is_err());
        assert_eq!(ctx.transcript, old);
    }
}
