use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requests sent by the messaging bridge over the framed Unix socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BridgeRequest {
    Ping,
    Health,
    /// An inbound group-chat message observed by the bridge.
    Publish {
        room_id: String,
        room_topic: String,
        sender_id: String,
        sender_name: String,
        message_type: String,
        content: String,
        /// Delivery timestamp at the transport; storage time is used when absent.
        timestamp: Option<DateTime<Utc>>,
    },
    /// Manually trigger one analysis batch.
    Analyze,
    Summaries {
        room_id: Option<String>,
        limit: Option<u32>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BridgeResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl BridgeResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }
}
