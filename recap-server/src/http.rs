//! Recap HTTP REST API
//!
//! Axum-based read-only dashboard API, running alongside the bridge socket.
//! Each endpoint has a thin axum handler that delegates to a directly
//! testable inner function.
//!
//! Endpoints:
//! - GET  /health    — health check with DB status
//! - GET  /version   — server version info
//! - GET  /rooms     — rooms by most recent activity
//! - GET  /messages  — recent messages, optional ?room_id= filter
//! - GET  /summaries — recent summaries, optional ?room_id= filter
//! - POST /analyze   — trigger one analysis batch

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use recap_core::ipc::BridgeRequest;
use recap_core::{MessageRepository, RecapConfig};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: PgPool,
    pub config: RecapConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/rooms", get(rooms_handler))
        .route("/messages", get(messages_handler))
        .route("/summaries", get(summaries_handler))
        .route("/analyze", post(analyze_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    pool: PgPool,
    config: RecapConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { pool, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Recap HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub room_id: Option<String>,
    pub limit: Option<i64>,
}

const DEFAULT_MESSAGE_LIMIT: i64 = 100;
const DEFAULT_SUMMARY_LIMIT: i64 = 10;
const DEFAULT_ROOM_LIMIT: i64 = 50;

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool, socket_path: &str) -> (StatusCode, serde_json::Value) {
    let pg_ver = match recap_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "postgresql": pg_ver,
            "socket": socket_path,
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "recap/1",
    })
}

pub async fn rooms_inner(pool: &PgPool, query: ListQuery) -> (StatusCode, serde_json::Value) {
    let repo = MessageRepository::new(pool.clone());
    match repo.list_rooms(query.limit.unwrap_or(DEFAULT_ROOM_LIMIT)).await {
        Ok(rooms) => (
            StatusCode::OK,
            serde_json::json!({ "count": rooms.len(), "rooms": rooms }),
        ),
        Err(e) => db_error(e),
    }
}

pub async fn messages_inner(pool: &PgPool, query: ListQuery) -> (StatusCode, serde_json::Value) {
    let repo = MessageRepository::new(pool.clone());
    match repo
        .recent_messages(
            query.room_id.as_deref(),
            query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
        )
        .await
    {
        Ok(messages) => (
            StatusCode::OK,
            serde_json::json!({ "count": messages.len(), "messages": messages }),
        ),
        Err(e) => db_error(e),
    }
}

pub async fn summaries_inner(pool: &PgPool, query: ListQuery) -> (StatusCode, serde_json::Value) {
    let repo = MessageRepository::new(pool.clone());
    match repo
        .recent_summaries(
            query.room_id.as_deref(),
            query.limit.unwrap_or(DEFAULT_SUMMARY_LIMIT),
        )
        .await
    {
        Ok(summaries) => (
            StatusCode::OK,
            serde_json::json!({ "count": summaries.len(), "summaries": summaries }),
        ),
        Err(e) => db_error(e),
    }
}

/// Inner analyze — delegates to the bridge router's manual trigger.
pub async fn analyze_inner(
    pool: &PgPool,
    config: &RecapConfig,
) -> (StatusCode, serde_json::Value) {
    let response = crate::router::handle_request_with_config(
        BridgeRequest::Analyze,
        pool,
        Some(config.clone()),
    )
    .await;

    if response.status == "ok" {
        (
            StatusCode::OK,
            response.data.unwrap_or(serde_json::json!({})),
        )
    } else {
        (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({
                "status": "error",
                "error": response.error.unwrap_or_else(|| "analysis failed".to_string()),
            }),
        )
    }
}

fn db_error(e: sqlx::Error) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::json!({
            "status": "error",
            "error": e.to_string(),
        }),
    )
}

// ============================================================================
// Thin axum handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool, &state.config.service.socket_path).await;
    (status, Json(body))
}

async fn version_handler() -> impl IntoResponse {
    Json(version_inner())
}

async fn rooms_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (status, body) = rooms_inner(&state.pool, query).await;
    (status, Json(body))
}

async fn messages_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (status, body) = messages_inner(&state.pool, query).await;
    (status, Json(body))
}

async fn summaries_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (status, body) = summaries_inner(&state.pool, query).await;
    (status, Json(body))
}

async fn analyze_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = analyze_inner(&state.pool, &state.config).await;
    (status, Json(body))
}
