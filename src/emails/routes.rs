//! REST endpoints for the email corpus.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::emails::ingest::ingest_mock_inbox;
use crate::server::{AppState, database_error, error_response, parse_id};

/// Maximum number of emails returned by the list endpoint.
const LIST_LIMIT: usize = 100;

/// POST /api/emails/ingest
async fn ingest(State(state): State<AppState>) -> Response {
    match ingest_mock_inbox(
        state.db.as_ref(),
        &state.pipeline,
        &state.mock_inbox_path,
    )
    .await
    {
        Ok(report) => Json(json!({
            "message": report.message(),
            "ingested": report.ingested,
            "processed": report.processed,
        }))
        .into_response(),
        Err(e) => {
            error!("Ingestion failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /api/emails/process
async fn process(State(state): State<AppState>) -> Response {
    match state.pipeline.run_pending().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Processing run failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/emails
async fn list_emails(State(state): State<AppState>) -> Response {
    match state.db.list_emails(LIST_LIMIT).await {
        Ok(emails) => Json(emails).into_response(),
        Err(e) => database_error(e),
    }
}

/// GET /api/emails/{id}
async fn get_email(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.get_email(id).await {
        Ok(Some(email)) => Json(email).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Email not found"),
        Err(e) => database_error(e),
    }
}

/// Build the email REST routes.
pub fn email_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/emails", get(list_emails))
        .route("/api/emails/ingest", post(ingest))
        .route("/api/emails/process", post(process))
        .route("/api/emails/{id}", get(get_email))
        .with_state(state)
}
