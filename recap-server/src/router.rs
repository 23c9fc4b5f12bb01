use std::sync::Arc;

use recap_core::ipc::{BridgeRequest, BridgeResponse};
use recap_core::{MessageRepository, RecapConfig};
use sqlx::PgPool;

use crate::subsystems::{analyze, ingest, summarize};

pub async fn handle_request(request: BridgeRequest, pool: &PgPool) -> BridgeResponse {
    handle_request_with_config(request, pool, None).await
}

/// Handle a bridge request with optional config (needed for analysis).
pub async fn handle_request_with_config(
    request: BridgeRequest,
    pool: &PgPool,
    config: Option<RecapConfig>,
) -> BridgeResponse {
    let repo = MessageRepository::new(pool.clone());

    match request {
        BridgeRequest::Ping => BridgeResponse::pong(),
        BridgeRequest::Health => match recap_core::db::health_check(pool).await {
            Ok(v) => BridgeResponse::ok(serde_json::json!({
                "postgresql": v,
                "status": "healthy"
            })),
            Err(e) => BridgeResponse::err(format!("DB health check failed: {}", e)),
        },
        BridgeRequest::Publish {
            room_id,
            room_topic,
            sender_id,
            sender_name,
            message_type,
            content,
            timestamp,
        } => {
            let event = ingest::MessageEvent {
                room_id,
                room_topic,
                sender_id,
                sender_name,
                message_type,
                content,
                timestamp,
            };
            match ingest::ingest_event(&repo, event).await {
                Ok(message) => BridgeResponse::ok(serde_json::json!({
                    "stored": true,
                    "id": message.id
                })),
                Err(e) => BridgeResponse::err(e.to_string()),
            }
        }
        BridgeRequest::Analyze => {
            let config = match config {
                Some(c) => c,
                None => return BridgeResponse::err("No config available for analysis"),
            };
            match handle_analyze_request(&repo, &config).await {
                Ok(data) => BridgeResponse::ok(data),
                Err(e) => BridgeResponse::err(e.to_string()),
            }
        }
        BridgeRequest::Summaries { room_id, limit } => {
            let limit = i64::from(limit.unwrap_or(10));
            match repo.recent_summaries(room_id.as_deref(), limit).await {
                Ok(summaries) => BridgeResponse::ok(serde_json::json!({
                    "count": summaries.len(),
                    "summaries": summaries
                })),
                Err(e) => BridgeResponse::err(e.to_string()),
            }
        }
    }
}

/// Manual analysis trigger: build the model backend from config and run one
/// batch immediately.
async fn handle_analyze_request(
    repo: &MessageRepository,
    config: &RecapConfig,
) -> anyhow::Result<serde_json::Value> {
    let backend = summarize::create_backend(&config.llm)?;
    let summarizer = summarize::Summarizer::new(Arc::new(backend), &config.llm);

    let results = analyze::run_analysis_batch(repo, &summarizer, &config.analysis).await?;

    Ok(serde_json::json!({
        "triggered": true,
        "rooms_analyzed": results.len(),
        "results": results
    }))
}
