//! Conversation aggregator — turns an unordered message batch into bounded
//! per-room conversations ready for the model.
//!
//! Rooms with five or fewer messages are discarded before any model call.
//! Conversations longer than 100 rendered lines are compacted to a fixed
//! head/middle/tail sample of 92 lines. The reported time window always
//! comes from the uncompacted chronological order.

use chrono::{DateTime, Utc};
use recap_core::models::EnrichedMessage;
use std::collections::HashMap;

/// Rooms at or below this message count are not summarized.
pub const MIN_ROOM_MESSAGES: usize = 5;

/// Rendered conversations longer than this get compacted.
pub const COMPACTION_THRESHOLD: usize = 100;

/// Lines kept from the head and from the tail.
const EDGE_LINES: usize = 30;

/// Lines kept on each side of the midpoint.
const MIDPOINT_SPAN: usize = 15;

/// One room's bounded conversation plus its batch statistics.
#[derive(Debug, Clone)]
pub struct RoomConversation {
    pub room_id: String,
    pub room_topic: String,
    pub lines: Vec<String>,
    pub message_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Partition a batch by room, gate, order, render, and compact.
pub fn aggregate(messages: Vec<EnrichedMessage>) -> Vec<RoomConversation> {
    let mut by_room: HashMap<String, Vec<EnrichedMessage>> = HashMap::new();
    for msg in messages {
        by_room.entry(msg.room_id.clone()).or_default().push(msg);
    }

    let mut conversations = Vec::new();

    for (room_id, mut msgs) in by_room {
        if msgs.len() <= MIN_ROOM_MESSAGES {
            continue;
        }

        // Stable sort: equal timestamps keep their batch order.
        msgs.sort_by_key(|m| m.created_at);

        let room_topic = msgs[0]
            .room_topic
            .clone()
            .unwrap_or_else(|| "Unknown Group".to_string());

        let lines: Vec<String> = msgs
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| {
                format!(
                    "{}: {}",
                    m.user_name.as_deref().unwrap_or("Unknown"),
                    m.content
                )
            })
            .collect();

        if lines.is_empty() {
            continue;
        }

        let start_time = msgs[0].created_at;
        let end_time = msgs[msgs.len() - 1].created_at;

        conversations.push(RoomConversation {
            room_id,
            room_topic,
            message_count: msgs.len(),
            lines: compact_lines(lines),
            start_time,
            end_time,
        });
    }

    conversations
}

/// Head/middle/tail sampling: first 30 lines, a "..." separator, the 30
/// lines centered on the midpoint, another "...", and the last 30 lines —
/// exactly 92 lines for any input above the threshold.
pub fn compact_lines(lines: Vec<String>) -> Vec<String> {
    if lines.len() <= COMPACTION_THRESHOLD {
        return lines;
    }

    let n = lines.len();
    let mid = n / 2;

    let mut out = Vec::with_capacity(3 * EDGE_LINES + 2);
    out.extend_from_slice(&lines[..EDGE_LINES]);
    out.push("...".to_string());
    out.extend_from_slice(&lines[mid - MIDPOINT_SPAN..mid + MIDPOINT_SPAN]);
    out.push("...".to_string());
    out.extend_from_slice(&lines[n - EDGE_LINES..]);
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn msg(room: &str, user: &str, content: &str, minute: u32) -> EnrichedMessage {
        EnrichedMessage {
            id: Uuid::new_v4(),
            room_id: room.to_string(),
            room_topic: Some(format!("{} topic", room)),
            user_id: format!("{}-id", user),
            user_name: Some(user.to_string()),
            message_type: "text".to_string(),
            content: content.to_string(),
            metadata: None,
            created_at: Utc.with_ymd_and_hms(2026, 8, 6, 12, minute, 0).unwrap(),
        }
    }

    fn room_batch(room: &str, count: usize) -> Vec<EnrichedMessage> {
        (0..count)
            .map(|i| msg(room, "alice", &format!("message {}", i), i as u32))
            .collect()
    }

    #[test]
    fn test_small_rooms_are_discarded() {
        let conversations = aggregate(room_batch("r1", 5));
        assert!(conversations.is_empty(), "5 messages must not be analyzed");

        let conversations = aggregate(room_batch("r2", 6));
        assert_eq!(conversations.len(), 1, "6 messages pass the gate");
    }

    #[test]
    fn test_batch_partitions_by_room() {
        let mut batch = room_batch("r1", 7);
        batch.extend(room_batch("r2", 3));
        batch.extend(room_batch("r3", 10));

        let mut conversations = aggregate(batch);
        conversations.sort_by(|a, b| a.room_id.cmp(&b.room_id));

        assert_eq!(conversations.len(), 2, "r2 is below the gate");
        assert_eq!(conversations[0].room_id, "r1");
        assert_eq!(conversations[0].message_count, 7);
        assert_eq!(conversations[1].room_id, "r3");
        assert_eq!(conversations[1].message_count, 10);
    }

    #[test]
    fn test_lines_are_chronological_and_rendered() {
        // Deliver out of order; aggregation must re-sort ascending.
        let mut batch = room_batch("r1", 6);
        batch.reverse();

        let conversations = aggregate(batch);
        assert_eq!(conversations[0].lines[0], "alice: message 0");
        assert_eq!(conversations[0].lines[5], "alice: message 5");
    }

    #[test]
    fn test_blank_messages_are_dropped() {
        let mut batch = room_batch("r1", 6);
        batch.push(msg("r1", "bob", "   ", 50));
        batch.push(msg("r1", "bob", "", 51));

        let conversations = aggregate(batch);
        assert_eq!(conversations[0].lines.len(), 6);
        assert_eq!(conversations[0].message_count, 8, "count includes blanks");
    }

    #[test]
    fn test_all_blank_room_is_skipped() {
        let batch: Vec<_> = (0..7).map(|i| msg("r1", "alice", "  ", i)).collect();
        assert!(aggregate(batch).is_empty());
    }

    #[test]
    fn test_missing_enrichment_gets_placeholders() {
        let mut batch = room_batch("r1", 6);
        for m in &mut batch {
            m.room_topic = None;
            m.user_name = None;
        }

        let conversations = aggregate(batch);
        assert_eq!(conversations[0].room_topic, "Unknown Group");
        assert_eq!(conversations[0].lines[0], "Unknown: message 0");
    }

    #[test]
    fn test_compaction_is_noop_at_threshold() {
        let lines: Vec<String> = (0..100).map(|i| format!("line {}", i)).collect();
        assert_eq!(compact_lines(lines.clone()), lines);
    }

    #[test]
    fn test_compaction_yields_92_lines() {
        let lines: Vec<String> = (0..250).map(|i| format!("line {}", i)).collect();
        let compacted = compact_lines(lines.clone());

        assert_eq!(compacted.len(), 92);
        assert_eq!(&compacted[..30], &lines[..30], "head preserved");
        assert_eq!(compacted[30], "...");
        assert_eq!(&compacted[31..61], &lines[110..140], "midpoint window");
        assert_eq!(compacted[61], "...");
        assert_eq!(&compacted[62..], &lines[220..], "tail preserved");
    }

    #[test]
    fn test_compaction_at_101_lines() {
        let lines: Vec<String> = (0..101).map(|i| format!("line {}", i)).collect();
        let compacted = compact_lines(lines);
        assert_eq!(compacted.len(), 92);
    }

    #[test]
    fn test_time_window_unaffected_by_compaction() {
        let batch: Vec<_> = (0..150)
            .map(|i| msg("r1", "alice", &format!("message {}", i), (i % 60) as u32))
            .collect();
        let earliest = batch.iter().map(|m| m.created_at).min().unwrap();
        let latest = batch.iter().map(|m| m.created_at).max().unwrap();

        let conversations = aggregate(batch);
        let convo = &conversations[0];

        assert_eq!(convo.lines.len(), 92);
        assert_eq!(convo.start_time, earliest);
        assert_eq!(convo.end_time, latest);
        assert!(convo.start_time <= convo.end_time);
    }
}
