use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-room output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub room_id: String,
    pub room_topic: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub message_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
