//! HTTP route handlers for the mock API.

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::Value;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::api::{
    Analytics, ChatReply, HealthStatus, Session, SessionMessageReply, SessionMessageRequest,
    Streak, UploadReceipt,
};
use crate::chat::ChatMessage;

use super::reply::{MAX_MESSAGE_CHARS, message_text, socratic_reply, truncate_chars};
use super::state::AppState;

/// Create the API router, optionally serving `static_dir` for unmatched paths.
pub fn create_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/upload", post(upload))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/{id}/messages",
            get(session_messages).post(send_session_message),
        )
        .route("/api/analytics", get(analytics))
        .route("/api/streak", get(streak))
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Lenient JSON body: anything unparsable reads as `null`.
fn lenient_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Health check endpoint.
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        ok: true,
        time: Utc::now(),
    })
}

/// Templated reply to a single question.
async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Json<ChatReply> {
    let data = lenient_json(&body);
    let message = message_text(data.get("message"));
    if !message.is_empty() {
        state.record_question();
    }
    debug!(chars = message.chars().count(), "chat request");

    Json(ChatReply {
        reply: socratic_reply(&message),
    })
}

/// Count announced files; nothing is stored.
async fn upload(body: Bytes) -> Json<UploadReceipt> {
    let data = lenient_json(&body);
    let received = data
        .get("files")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    debug!(received, "upload announced");

    Json(UploadReceipt { ok: true, received })
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Session>) {
    let session = state.create_session();
    debug!(id = %session.id, "session created");
    (StatusCode::CREATED, Json(session))
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<Session>> {
    Json(state.list_sessions())
}

async fn session_messages(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Vec<ChatMessage>>, (StatusCode, String)> {
    state
        .session_messages(&id)
        .map(Json)
        .ok_or_else(|| unknown_session(&id))
}

async fn send_session_message(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
    Json(request): Json<SessionMessageRequest>,
) -> Result<Json<SessionMessageReply>, (StatusCode, String)> {
    let content = truncate_chars(request.content.trim(), MAX_MESSAGE_CHARS);
    if content.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message content is empty".to_string()));
    }

    let stored = state
        .record_exchange(&id, &content, &request.files, socratic_reply(&content))
        .ok_or_else(|| unknown_session(&id))?;

    Ok(Json(SessionMessageReply {
        id: stored.reply.id.to_string(),
        user_message_id: stored.user_id.to_string(),
        content: stored.reply.content,
        created_at: stored.reply.created_at,
    }))
}

async fn analytics(State(state): State<Arc<AppState>>) -> Json<Analytics> {
    Json(state.analytics())
}

async fn streak(State(state): State<Arc<AppState>>) -> Json<Streak> {
    Json(state.streak())
}

fn unknown_session(id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Unknown session: {id}"))
}
