//! Ingestion path — bridge message events into durable storage.
//!
//! Room and user dimension rows are created-if-absent before the message
//! insert, so a stored message never dangles. Each repository call is its
//! own short transaction; ingestion never waits on an analysis run.

use chrono::{DateTime, Utc};
use recap_core::models::Message;
use recap_core::MessageRepository;

/// An inbound message event as delivered by the messaging bridge.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub room_id: String,
    pub room_topic: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message_type: String,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Store one inbound message. Failures surface to the caller so the bridge
/// is always told whether the message made it to disk.
pub async fn ingest_event(
    repo: &MessageRepository,
    event: MessageEvent,
) -> anyhow::Result<Message> {
    repo.upsert_room(&event.room_id, &event.room_topic).await?;
    repo.upsert_user(&event.sender_id, &event.sender_name)
        .await?;

    // Provider-side receipt details ride along as an opaque blob; readers
    // must tolerate rows where this is absent or malformed.
    let metadata = serde_json::json!({
        "transport_timestamp": event.timestamp,
        "received_at": Utc::now(),
    });

    let message = repo
        .append_message(
            &event.room_id,
            &event.sender_id,
            &event.message_type,
            &event.content,
            Some(metadata),
            event.timestamp,
        )
        .await?;

    tracing::debug!(
        room = %event.room_topic,
        sender = %event.sender_name,
        "Stored message"
    );

    Ok(message)
}
