//! Wire types for the server's push channel and the send endpoint.
//!
//! The server pushes one JSON object per socket frame:
//! `{ "type": "message" | "error" | "title_update", ... }`.

use serde::{Deserialize, Serialize};

/// Inbound socket payload, tagged on `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A completed chat message. The server may attach an auto-generated
    /// session title after the first reply.
    Message {
        role: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// The turn failed server-side; `message` is display text for the user.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The session title changed, independent of any message.
    TitleUpdate { title: String },
}

/// Parse one socket text frame. Unknown `type` values come back as Err so the
/// caller can log and skip them.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Body for `POST /send-message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub session_id: String,
    pub content: String,
    pub model: String,
}

/// Response to `POST /send-message`: `{ "status": "ok" | other, "message"? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SendMessageResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
