//! HTTP server: shared state, router assembly and lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::routes::agent_routes;
use crate::agent::service::EmailAgent;
use crate::config::{AppConfig, EnrichmentConfig};
use crate::emails::routes::email_routes;
use crate::error::{DatabaseError, Error};
use crate::llm::{Generator, create_generator};
use crate::pipeline::{Enricher, Pipeline, spawn_pipeline_ticker};
use crate::prompts::resolver::PromptResolver;
use crate::prompts::routes::prompt_routes;
use crate::store::{Database, LibSqlBackend};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub pipeline: Arc<Pipeline>,
    pub agent: EmailAgent,
    /// Source file for `POST /api/emails/ingest`.
    pub mock_inbox_path: PathBuf,
}

impl AppState {
    /// Wire the pipeline and agent over one store and one generator.
    pub fn new(
        db: Arc<dyn Database>,
        generator: Generator,
        enrichment: EnrichmentConfig,
        mock_inbox_path: PathBuf,
    ) -> Self {
        let resolver = PromptResolver::new(Arc::clone(&db));
        let enricher = Enricher::new(resolver.clone(), generator.clone(), enrichment);
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&db), enricher));
        let agent = EmailAgent::new(Arc::clone(&db), resolver, generator);
        Self {
            db,
            pipeline,
            agent,
            mock_inbox_path,
        }
    }

    /// Open the configured database and build the generator from config.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        let generator = create_generator(&config.llm)?;
        Ok(Self::new(
            db,
            generator,
            config.enrichment.clone(),
            config.mock_inbox_path.clone(),
        ))
    }
}

// ── Response helpers ────────────────────────────────────────────────

/// JSON error body with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// Map a store error: `NotFound` is 404, anything else 500.
pub(crate) fn database_error(e: DatabaseError) -> Response {
    if e.is_not_found() {
        return error_response(StatusCode::NOT_FOUND, e.to_string());
    }
    error!("Database error: {e}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Parse a path identifier, rejecting malformed ones with 400.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid identifier"))
}

// ── Router ──────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({"message": "Email Agent API is running"}))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "inbox-agent"
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full router with CORS and request tracing.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(email_routes(state.clone()))
        .merge(prompt_routes(state.clone()))
        .merge(agent_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), Error> {
    let state = AppState::from_config(&config).await?;

    let ticker = config.process_interval.map(|interval| {
        spawn_pipeline_ticker(Arc::clone(&state.pipeline), interval)
    });

    let app = router(state, &config.cors_origins);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        model = ?config.llm.model,
        backend = config.llm.backend.as_str(),
        "Inbox agent listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
        })
        .await?;

    if let Some((handle, shutdown)) = ticker {
        shutdown.store(true, Ordering::Relaxed);
        handle.abort();
    }
    Ok(())
}
