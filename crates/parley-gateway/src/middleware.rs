use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

/// Name of the cookie carrying the login token.
pub const SESSION_COOKIE: &str = "parley_session";

/// `Set-Cookie` value issued at login.
pub fn login_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/")
}

/// `Set-Cookie` value that makes the browser forget the token.
pub fn logout_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Extract the login token from the `Cookie` header(s).
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

/// Auth middleware: resolves the login cookie to a chat context.
///
/// The resolved [`crate::context::ContextHandle`] is placed in the request
/// extensions. Requests without a live context get `401`.
pub async fn require_context(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let handle = match token_from_headers(request.headers()) {
        Some(token) => state.contexts.get(&token).await,
        None => None,
    };

    match handle {
        Some(handle) => {
            request.extensions_mut().insert(handle);
            next.run(request).await
        }
        None => {
            debug!(path = %request.uri().path(), "Rejected request: not logged in");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Not logged in"})),
            )
                .into_response()
        }
    }
}
