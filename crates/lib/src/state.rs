//! Client-side chat state: the active session, its model, and the
//! one-reply-at-a-time send gate.
//!
//! Messages are not kept here; history is re-fetched from the server when a
//! session is opened, and the frontends own their own render copies.

use serde::{Deserialize, Serialize};

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// A single message in a conversation (role is "user" or "assistant").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// One entry in the session directory sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    #[serde(default)]
    pub title: Option<String>,
}

impl SessionSummary {
    /// Sidebar label; untitled sessions render as "Untitled".
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled")
    }
}

/// Detail for an opened session: `GET /session/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Generate a fresh client-side session id. Sessions come into existence
/// server-side implicitly on first use; no create round-trip.
pub fn new_session_id() -> SessionId {
    format!("sess-{}", uuid::Uuid::new_v4())
}

/// The single explicit client-state object: exactly one active session, one
/// model, and one pending reply at most.
#[derive(Debug, Clone)]
pub struct ClientState {
    session_id: SessionId,
    model: String,
    awaiting_reply: bool,
}

impl ClientState {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            session_id: new_session_id(),
            model: model.into(),
            awaiting_reply: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Replace the active session with a fresh client-generated one. Any
    /// pending reply belongs to the old session and is forgotten.
    pub fn start_new_session(&mut self) -> &SessionId {
        self.session_id = new_session_id();
        self.awaiting_reply = false;
        &self.session_id
    }

    /// Adopt an existing session id (switch). Clears the pending-reply gate.
    pub fn adopt_session(&mut self, id: impl Into<SessionId>) {
        self.session_id = id.into();
        self.awaiting_reply = false;
    }

    /// Arm the send gate. Returns false (and changes nothing) when a reply is
    /// already pending.
    pub fn begin_send(&mut self) -> bool {
        if self.awaiting_reply {
            return false;
        }
        self.awaiting_reply = true;
        true
    }

    /// Disarm the send gate after a reply, an error, or a failed send.
    pub fn finish_send(&mut self) {
        self.awaiting_reply = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_gate_rejects_second_send() {
        let mut state = ClientState::new("m");
        assert!(state.begin_send());
        assert!(!state.begin_send());
        state.finish_send();
        assert!(state.begin_send());
    }

    #[test]
    fn new_session_resets_gate_and_id() {
        let mut state = ClientState::new("m");
        let first = state.session_id().clone();
        assert!(state.begin_send());
        let second = state.start_new_session().clone();
        assert_ne!(first, second);
        assert!(!state.awaiting_reply());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }

    #[test]
    fn summary_display_title() {
        let s = SessionSummary {
            session_id: "sess-1".to_string(),
            title: Some("Rust questions".to_string()),
        };
        assert_eq!(s.display_title(), "Rust questions");
        let s = SessionSummary {
            session_id: "sess-2".to_string(),
            title: None,
        };
        assert_eq!(s.display_title(), "Untitled");
    }
}
