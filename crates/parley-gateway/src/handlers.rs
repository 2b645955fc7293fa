use crate::context::ContextHandle;
use crate::middleware::{login_cookie, logout_cookie, token_from_headers};
use crate::page::CHAT_PAGE;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use parley_core::ParleyError;
use parley_security::AuthOutcome;
use parley_session::{PickerEntry, Transcript};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Error response with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ParleyError> for ApiError {
    fn from(e: ParleyError) -> Self {
        let status = match &e {
            ParleyError::InvalidInput(_) | ParleyError::Session(_) => StatusCode::BAD_REQUEST,
            ParleyError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => {
                error!(error = %e, "Interaction aborted");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

/// Body of `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plain-text password; never logged.
    pub password: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Raw prompt text; checked before use.
    pub prompt: String,
}

/// `GET /`
pub async fn index_handler() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// `GET /health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok", "service": "parley"}))
}

/// A successful login replaces whatever context the browser's cookie pointed at.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Response {
    match state.verifier.verify(&req.username, &req.password).await {
        AuthOutcome::Accepted { username } => {
            if let Some(previous) = token_from_headers(&headers) {
                state.contexts.remove(&previous).await;
            }
            let ctx = state.router.open_context(&username).await;
            let session_id = ctx.session_id().clone();
            let token = state.contexts.insert(ctx).await;
            (
                [(header::SET_COOKIE, login_cookie(&token))],
                Json(json!({"username": username, "session_id": session_id})),
            )
                .into_response()
        }
        AuthOutcome::Rejected { message } => {
            info!(username = %log_safe(&req.username), "Login refused");
            ApiError::new(StatusCode::UNAUTHORIZED, message).into_response()
        }
    }
}

/// Printable ASCII only, capped, for echoing client input into logs.
fn log_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(64)
        .collect()
}

/// Always succeeds; an unknown or missing cookie is already logged out.
pub async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        state.contexts.remove(&token).await;
    }
    (
        [(header::SET_COOKIE, logout_cookie())],
        Json(json!({"ok": true})),
    )
        .into_response()
}

/// `GET /api/me`
pub async fn me_handler(Extension(handle): Extension<ContextHandle>) -> Json<Value> {
    let ctx = handle.context.lock().await;
    Json(json!({
        "username": ctx.username,
        "session_id": ctx.session_id(),
        "phase": ctx.phase,
    }))
}

/// `GET /api/transcript`
pub async fn transcript_handler(Extension(handle): Extension<ContextHandle>) -> Json<Transcript> {
    let ctx = handle.context.lock().await;
    Json(ctx.transcript.clone())
}

/// `POST /api/chat`: one full prompt/reply round, persisted before returning.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(handle): Extension<ContextHandle>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut ctx = handle.context.lock().await;
    let reply = state.router.send_prompt(&mut ctx, &req.prompt).await?;
    Ok(Json(json!({"reply": reply, "transcript": ctx.transcript})))
}

/// `GET /api/sessions`
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(handle): Extension<ContextHandle>,
) -> Json<Vec<PickerEntry>> {
    let ctx = handle.context.lock().await;
    Json(state.router.list_sessions(&ctx.username).await)
}

/// `POST /api/sessions`
pub async fn new_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(handle): Extension<ContextHandle>,
) -> Json<Transcript> {
    let mut ctx = handle.context.lock().await;
    state.router.new_chat(&mut ctx).await;
    Json(ctx.transcript.clone())
}

/// `POST /api/sessions/{id}/select`
pub async fn select_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(handle): Extension<ContextHandle>,
    Path(session_id): Path<String>,
) -> Result<Json<Transcript>, ApiError> {
    let mut ctx = handle.context.lock().await;
    let transcript = state.router.select_session(&mut ctx, &session_id).await?;
    Ok(Json(transcript.clone()))
}
