//! REST endpoints for chat and reply drafts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::agent::service::EmailContext;
use crate::server::{AppState, database_error, error_response, parse_id};

/// Maximum number of drafts returned by the list endpoint.
const LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    email: Option<EmailContext>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DraftRequest {
    /// Parsed by the handler so a malformed id gets the usual 400 body.
    #[serde(default)]
    email_id: Option<String>,
    #[serde(default)]
    email: Option<EmailContext>,
    #[serde(default)]
    instructions: Option<String>,
}

/// POST /api/agent/chat
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let Some(message) = req.message.filter(|m| !m.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    };

    match state
        .agent
        .chat(
            &message,
            req.email.as_ref(),
            req.context.as_deref().unwrap_or_default(),
        )
        .await
    {
        Ok(response) => Json(json!({"response": response})).into_response(),
        Err(e) => database_error(e),
    }
}

/// POST /api/agent/draft
///
/// Accepts a stored email by `email_id` or an inline `email` object.
async fn draft(State(state): State<AppState>, Json(req): Json<DraftRequest>) -> Response {
    let email = match (req.email_id, req.email) {
        (Some(raw), _) => {
            let id = match parse_id(&raw) {
                Ok(id) => id,
                Err(resp) => return resp,
            };
            match state.db.get_email(id).await {
                Ok(Some(record)) => EmailContext::from(&record),
                Ok(None) => return error_response(StatusCode::NOT_FOUND, "Email not found"),
                Err(e) => return database_error(e),
            }
        }
        (None, Some(inline)) => inline,
        (None, None) => {
            return error_response(StatusCode::BAD_REQUEST, "Email object is required");
        }
    };

    let instructions = req.instructions.unwrap_or_default();
    match state.agent.draft_reply(&email, &instructions).await {
        Ok(draft) => Json(json!({
            "draft_id": draft.id,
            "content": draft.body,
        }))
        .into_response(),
        Err(e) => database_error(e),
    }
}

/// GET /api/agent/drafts
async fn list_drafts(State(state): State<AppState>) -> Response {
    match state.db.list_drafts(LIST_LIMIT).await {
        Ok(drafts) => Json(drafts).into_response(),
        Err(e) => database_error(e),
    }
}

/// DELETE /api/agent/drafts/{id}
async fn delete_draft(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_draft(id).await {
        Ok(()) => Json(json!({"message": "Draft deleted"})).into_response(),
        Err(e) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, "Draft not found"),
        Err(e) => database_error(e),
    }
}

/// Build the agent REST routes.
pub fn agent_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/agent/chat", post(chat))
        .route("/api/agent/draft", post(draft))
        .route("/api/agent/drafts", get(list_drafts))
        .route("/api/agent/drafts/{id}", delete(delete_draft))
        .with_state(state)
}
