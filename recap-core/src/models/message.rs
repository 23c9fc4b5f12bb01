use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub room_id: String,
    pub user_id: String,
    pub message_type: String,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A message joined with its room topic and sender name, as consumed by the
/// analysis pipeline. The joined fields stay optional: a missing dimension
/// row must not fail retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EnrichedMessage {
    pub id: Uuid,
    pub room_id: String,
    pub room_topic: Option<String>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub message_type: String,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
