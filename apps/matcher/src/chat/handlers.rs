//! Axum route handlers for the chat API.

use anyhow::anyhow;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::session::{ChatSession, TranscriptEntry};
use crate::errors::AppError;
use crate::state::AppState;

const CHAT_PAGE: &str = include_str!("page.html");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuestionResponse {
    pub reply: TranscriptEntry,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session_id = state.sessions.create();
    tracing::info!("Chat session {session_id} started");
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

/// GET /api/v1/sessions/:id
///
/// Returns the visible transcript and the bound thread id, if any.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatSession>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/messages
///
/// Runs one turn on the session's thread. A second question on the same
/// session waits for the first. The turn runs in its own task and finishes
/// even if the client goes away.
pub async fn handle_submit_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<SubmitQuestionRequest>, JsonRejection>,
) -> Result<Json<SubmitQuestionResponse>, AppError> {
    let Json(request) = payload?;
    if request.question.trim().is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }

    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    let platform = state.platform.clone();
    let agent_id = state.agent_id.clone();
    let reply = tokio::spawn(async move {
        session
            .submit(platform.as_ref(), &agent_id, &request.question)
            .await
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("turn on session {session_id} did not finish: {e}")))?;

    Ok(Json(SubmitQuestionResponse { reply }))
}
