//! Message repository — the persistence contract consumed by ingestion,
//! the analysis pipeline, and the read API.
//!
//! Every method checks a connection out of the pool for just that call; no
//! transaction is ever held across a language-model call. Room and user
//! upserts are idempotent under concurrent same-key writes (`ON CONFLICT`
//! resolves the race to "already exists, proceed").

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{EnrichedMessage, Message, Room, Summary, User};

#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the room if absent; refresh its topic on later sightings.
    pub async fn upsert_room(&self, room_id: &str, topic: &str) -> Result<Room, sqlx::Error> {
        sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (room_id, topic)
            VALUES ($1, $2)
            ON CONFLICT (room_id)
            DO UPDATE SET topic = EXCLUDED.topic, updated_at = now()
            RETURNING room_id, topic, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(topic)
        .fetch_one(&self.pool)
        .await
    }

    /// Create the user if absent; refresh the display name on later sightings.
    pub async fn upsert_user(&self, user_id: &str, name: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, name)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET name = EXCLUDED.name, updated_at = now()
            RETURNING user_id, name, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    /// Append one message. The caller is told success or failure; a store
    /// error is never swallowed here. `created_at` falls back to the storage
    /// clock when the transport supplied no timestamp.
    pub async fn append_message(
        &self,
        room_id: &str,
        user_id: &str,
        message_type: &str,
        content: &str,
        metadata: Option<serde_json::Value>,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (room_id, user_id, message_type, content, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6::timestamptz, now()))
            RETURNING id, room_id, user_id, message_type, content, metadata, created_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(message_type)
        .bind(content)
        .bind(metadata)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Newest-first messages, each joined with its room topic and sender
    /// name. Missing dimension rows yield `None` rather than an error.
    pub async fn recent_messages(
        &self,
        room_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<EnrichedMessage>, sqlx::Error> {
        sqlx::query_as::<_, EnrichedMessage>(
            r#"
            SELECT m.id, m.room_id, r.topic AS room_topic,
                   m.user_id, u.name AS user_name,
                   m.message_type, m.content, m.metadata, m.created_at
            FROM messages m
            LEFT JOIN rooms r ON r.room_id = m.room_id
            LEFT JOIN users u ON u.user_id = m.user_id
            WHERE ($1::text IS NULL OR m.room_id = $1)
            ORDER BY m.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Always inserts a new summary row; summaries are never merged.
    pub async fn save_summary(
        &self,
        room_id: &str,
        summary: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Summary, sqlx::Error> {
        sqlx::query_as::<_, Summary>(
            r#"
            INSERT INTO summaries (room_id, summary, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id, room_id, summary, start_time, end_time, created_at
            "#,
        )
        .bind(room_id)
        .bind(summary)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn recent_summaries(
        &self,
        room_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Summary>, sqlx::Error> {
        sqlx::query_as::<_, Summary>(
            r#"
            SELECT id, room_id, summary, start_time, end_time, created_at
            FROM summaries
            WHERE ($1::text IS NULL OR room_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Rooms by most recent activity, for the dashboard.
    pub async fn list_rooms(&self, limit: i64) -> Result<Vec<Room>, sqlx::Error> {
        sqlx::query_as::<_, Room>(
            r#"
            SELECT room_id, topic, created_at, updated_at
            FROM rooms
            ORDER BY updated_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
