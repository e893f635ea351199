//! # sessionlens
//!
//! Read-only viewer backend for Claude Code and Codex CLI session logs.
//!
//! This server provides:
//! - A merged session list from ~/.claude/projects/ and ~/.codex/sessions/
//! - Per-session message history, normalized to one shape for both tools
//! - Access to Claude file-history snapshot blobs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  poll  ┌──────────────┐     ┌─────────────────┐
//! │  Display    │───────▶│  Axum HTTP   │────▶│  ~/.claude/     │
//! │  shell      │        │  Server      │     │  ~/.codex/      │
//! └─────────────┘        └──────────────┘     │  (JSONL files)  │
//!                               │             └─────────────────┘
//!                               ▼
//!                        ┌──────────────┐
//!                        │ SessionQuery │
//!                        │ (query.rs)   │
//!                        └──────────────┘
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Server health check
//! - `GET /api/sessions` - List sessions from both sources
//! - `GET /api/sessions/{source}/{id}?locator=...` - Get session messages
//! - `GET /api/snapshots/{session_id}/{backup_file_name}` - Read a snapshot blob

mod claude;
mod codex;
mod config;
mod content;
mod directory;
mod error;
mod query;
mod record;
mod sessions;
mod text;
mod tools;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::{io, net::SocketAddr, sync::Arc, time::Instant};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::error::QueryError;
use crate::query::SessionQuery;
use crate::sessions::{Message, SessionSummary, SnapshotFile, Source};

// ============================================================================
// App State
// ============================================================================

struct AppState {
    start_time: Instant,
    query: Arc<SessionQuery>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::Validation(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::SourcesUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

impl From<QueryRejection> for QueryError {
    fn from(rejection: QueryRejection) -> Self {
        QueryError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for QueryError {
    fn from(rejection: PathRejection) -> Self {
        QueryError::Validation(rejection.body_text())
    }
}

/// Session reads are plain blocking file I/O
async fn run_blocking<T, F>(f: F) -> Result<T, QueryError>
where
    F: FnOnce() -> Result<T, QueryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| QueryError::Io(io::Error::other(e)))?
}

// ============================================================================
// Health Endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    version: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

#[derive(Serialize)]
struct SessionsResponse {
    sessions: Vec<SessionSummary>,
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Result<Json<SessionsResponse>, QueryError> {
    let query = state.query.clone();
    let sessions = run_blocking(move || query.list_sessions()).await?;
    Ok(Json(SessionsResponse { sessions }))
}

#[derive(Deserialize)]
struct DetailQuery {
    locator: String,
}

#[derive(Serialize)]
struct DetailResponse {
    messages: Vec<Message>,
}

async fn get_session_detail(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
    params: Result<Query<DetailQuery>, QueryRejection>,
) -> Result<Json<DetailResponse>, QueryError> {
    let Path((source, session_id)) = path?;
    let Query(params) = params?;
    let source: Source = source.parse().map_err(QueryError::Validation)?;
    let query = state.query.clone();
    let messages =
        run_blocking(move || query.session_detail(&session_id, &params.locator, source)).await?;
    Ok(Json(DetailResponse { messages }))
}

async fn get_snapshot_file(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<SnapshotFile>, QueryError> {
    let Path((session_id, backup_file_name)) = path?;
    let query = state.query.clone();
    let file = run_blocking(move || query.snapshot_file(&session_id, &backup_file_name)).await?;
    Ok(Json(file))
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{source}/{session_id}", get(get_session_detail))
        .route("/api/snapshots/{session_id}/{backup_file_name}", get(get_snapshot_file))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sessionlens=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Reading Claude sessions from {}, Codex sessions from {}",
        config.projects_dir().display(),
        config.codex_sessions_dir().display()
    );

    let state = Arc::new(AppState {
        start_time: Instant::now(),
        query: Arc::new(SessionQuery::new(&config)),
    });

    let mut app = router(state);

    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving display assets from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    let addr = SocketAddr::new(config.bind_addr, config.port);
    tracing::info!("sessionlens v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
