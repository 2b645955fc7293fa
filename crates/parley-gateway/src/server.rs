use crate::context::ContextRegistry;
use crate::handlers::{
    chat_handler, health_handler, index_handler, list_sessions_handler, login_handler,
    logout_handler, me_handler, new_chat_handler, select_session_handler, transcript_handler,
};
use crate::middleware::require_context;
use crate::router::ChatRouter;
use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use parley_inference::InferenceBackend;
use parley_security::{CredentialVerifier, Sanitizer};
use parley_session::SessionStore;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    /// Chat actions.
    pub router: Arc<ChatRouter>,
    /// Live logins.
    pub contexts: Arc<ContextRegistry>,
    /// Login check.
    pub verifier: Arc<dyn CredentialVerifier>,
}

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the gateway with the default prompt limits.
    pub fn build(
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn InferenceBackend>,
    ) -> Router {
        Self::build_with_sanitizer(verifier, store, backend, Sanitizer::default())
    }

    /// Build the gateway with a custom prompt limit.
    pub fn build_with_sanitizer(
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn InferenceBackend>,
        sanitizer: Sanitizer,
    ) -> Router {
        Self::build_with_registry(verifier, store, backend, sanitizer, ContextRegistry::new())
    }

    /// Build the gateway around a caller-supplied context registry, e.g. one
    /// with a custom idle timeout.
    pub fn build_with_registry(
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn InferenceBackend>,
        sanitizer: Sanitizer,
        contexts: Arc<ContextRegistry>,
    ) -> Router {
        let state = Arc::new(AppState {
            router: Arc::new(ChatRouter::new(backend, store, sanitizer)),
            contexts,
            verifier,
        });

        // Everything under here needs a live login.
        let protected = Router::new()
            .route("/api/me", get(me_handler))
            .route("/api/transcript", get(transcript_handler))
            .route("/api/chat", post(chat_handler))
            .route(
                "/api/sessions",
                get(list_sessions_handler).post(new_chat_handler),
            )
            .route("/api/sessions/{id}/select", post(select_session_handler))
            .route_layer(axum_mw::from_fn_with_state(
                state.clone(),
                require_context,
            ));

        Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler))
            .route("/api/login", post(login_handler))
            .route("/api/logout", post(logout_handler))
            .merge(protected)
            .with_state(state)
    }
}
