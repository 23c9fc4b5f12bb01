use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyword row, unique on (room_id, keyword). The schema ships with the
/// service but the pipeline does not currently write it; extracted keywords
/// are returned in-memory only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Keyword {
    pub id: Uuid,
    pub room_id: String,
    pub keyword: String,
    pub frequency: i32,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
