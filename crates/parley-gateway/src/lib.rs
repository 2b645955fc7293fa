//! Web gateway for Parley.
//!
//! Serves the chat page and a small JSON API. Each login gets its own
//! [`context::ChatContext`], found again through the `parley_session` cookie.

/// Per-login chat state and its registry.
pub mod context;
/// Route handlers and the JSON error type.
pub mod handlers;
/// Login cookie handling.
pub mod middleware;
/// The embedded browser UI.
pub mod page;
/// Chat actions applied to a context.
pub mod router;
/// Router assembly.
pub mod server;

pub use context::{ChatContext, ContextHandle, ContextRegistry, Phase, DEFAULT_IDLE_TIMEOUT};
pub use router::ChatRouter;
pub use server::{AppState, GatewayServer};
