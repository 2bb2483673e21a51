//! REST endpoints for prompt template management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::prompts::model::PromptInput;
use crate::server::{AppState, database_error, error_response, parse_id};

/// GET /api/prompts
async fn list_prompts(State(state): State<AppState>) -> Response {
    match state.db.list_prompts().await {
        Ok(prompts) => Json(prompts).into_response(),
        Err(e) => database_error(e),
    }
}

/// POST /api/prompts
async fn create_prompt(State(state): State<AppState>, Json(input): Json<PromptInput>) -> Response {
    match state.db.create_prompt(&input).await {
        Ok(prompt) => (StatusCode::CREATED, Json(prompt)).into_response(),
        Err(e) => database_error(e),
    }
}

/// PUT /api/prompts/{id}
async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<PromptInput>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.update_prompt(id, &input).await {
        Ok(prompt) => Json(prompt).into_response(),
        Err(e) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, "Prompt not found"),
        Err(e) => database_error(e),
    }
}

/// DELETE /api/prompts/{id}
async fn delete_prompt(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_prompt(id).await {
        Ok(()) => Json(serde_json::json!({"message": "Prompt deleted"})).into_response(),
        Err(e) if e.is_not_found() => error_response(StatusCode::NOT_FOUND, "Prompt not found"),
        Err(e) => database_error(e),
    }
}

/// Build the prompt REST routes.
pub fn prompt_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/prompts", get(list_prompts).post(create_prompt))
        .route("/api/prompts/{id}", put(update_prompt).delete(delete_prompt))
        .with_state(state)
}
