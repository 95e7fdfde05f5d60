//! Active session controller.
//!
//! Owns the client state (current session, model, pending-reply gate), the
//! REST transport, and the socket lifecycle, and drives the frontends through
//! a channel of `UiEvent`s. The frontends only render what arrives here and
//! feed user actions back in; every invariant lives in this one place.

use std::sync::mpsc::Sender;

use crate::api::ChatTransport;
use crate::models::ModelCatalog;
use crate::protocol::{SendMessageRequest, ServerEvent};
use crate::socket::{ConnectionState, SocketControl, SocketEvent, SocketEventKind};
use crate::state::{ChatMessage, ClientState, SessionId, SessionSummary};

/// Title shown for a session that has not been named by the server yet.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Everything a frontend needs to render. Full-replace semantics for
/// `SessionsListed` and `HistoryLoaded`; the rest are increments.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ModelsLoaded(Vec<String>),
    /// A fresh, empty session became active.
    SessionStarted { session_id: SessionId },
    /// An existing session became active; history follows.
    SessionOpened { session_id: SessionId },
    HistoryLoaded(Vec<ChatMessage>),
    MessageAppended(ChatMessage),
    TypingStarted,
    TypingCleared,
    TitleChanged(String),
    ModelChanged(String),
    SessionsListed(Vec<SessionSummary>),
    Connection(ConnectionState),
    SendEnabled(bool),
    Toast(String),
}

pub struct ChatController<T: ChatTransport, S: SocketControl> {
    state: ClientState,
    catalog: ModelCatalog,
    transport: T,
    socket: S,
    ui: Sender<UiEvent>,
    default_model: String,
}

impl<T: ChatTransport, S: SocketControl> ChatController<T, S> {
    pub fn new(
        transport: T,
        socket: S,
        default_model: impl Into<String>,
        ui: Sender<UiEvent>,
    ) -> Self {
        let default_model = default_model.into();
        Self {
            state: ClientState::new(default_model.clone()),
            catalog: ModelCatalog::new(Vec::new(), &default_model),
            transport,
            socket,
            ui,
            default_model,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    fn emit(&self, event: UiEvent) {
        // A closed receiver just means the frontend is gone.
        let _ = self.ui.send(event);
    }

    fn toast(&self, message: impl Into<String>) {
        self.emit(UiEvent::Toast(message.into()));
    }

    /// Startup: fetch the model list (fallback to the default on failure),
    /// begin a fresh session, and load the directory.
    pub async fn init(&mut self) {
        let models = match self.transport.list_models().await {
            Ok(models) => models,
            Err(e) => {
                log::warn!("could not load models from server: {}", e);
                Vec::new()
            }
        };
        self.catalog = ModelCatalog::new(models, &self.default_model);
        self.emit(UiEvent::ModelsLoaded(self.catalog.models().to_vec()));
        self.start_new_session();
        self.refresh_sessions().await;
    }

    /// Discard any existing connection, generate a fresh client-side session
    /// id, reset the view, and connect for the new id. No server round-trip:
    /// the session exists server-side implicitly on first use.
    pub fn start_new_session(&mut self) {
        self.socket.disconnect();
        let id = self.state.start_new_session().clone();
        self.emit(UiEvent::SessionStarted {
            session_id: id.clone(),
        });
        self.emit(UiEvent::TitleChanged(NEW_CHAT_TITLE.to_string()));
        self.emit(UiEvent::SendEnabled(true));
        self.socket.connect(&id);
    }

    /// Switch to an existing session: tear down the old connection, load
    /// history and detail, adopt the stored model, reconnect. A failed load
    /// is non-fatal and the connection is still opened.
    pub async fn open_session(&mut self, id: &SessionId) {
        self.socket.disconnect();
        self.state.adopt_session(id.clone());
        self.emit(UiEvent::SessionOpened {
            session_id: id.clone(),
        });

        if let Err(e) = self.load_session_view(id).await {
            log::warn!("failed to load session {}: {}", id, e);
            self.toast("Failed to load session");
        }

        self.emit(UiEvent::SendEnabled(true));
        self.socket.connect(id);
    }

    async fn load_session_view(&mut self, id: &SessionId) -> Result<(), crate::api::ApiError> {
        let history = self.transport.history(id).await?;
        self.emit(UiEvent::HistoryLoaded(history));

        let detail = self.transport.session_detail(id).await?;
        if let Some(model) = detail.model.filter(|m| !m.trim().is_empty()) {
            self.state.set_model(model.clone());
            self.emit(UiEvent::ModelChanged(model));
        }
        self.emit(UiEvent::TitleChanged(
            detail.title.unwrap_or_else(|| "Chat".to_string()),
        ));
        Ok(())
    }

    /// Delete a session. Deleting the active one starts a fresh session; the
    /// directory is refreshed either way.
    pub async fn delete_session(&mut self, id: &SessionId) {
        match self.transport.delete_session(id).await {
            Ok(()) => {
                if id == self.state.session_id() {
                    self.start_new_session();
                }
            }
            Err(e) => {
                log::warn!("failed to delete session {}: {}", id, e);
                self.toast("Failed to delete session");
            }
        }
        self.refresh_sessions().await;
    }

    /// Persist a model change for the active session. Fire-and-forget:
    /// failure is logged, never surfaced.
    pub async fn change_model(&mut self, model: &str) {
        self.state.set_model(model);
        self.emit(UiEvent::ModelChanged(model.to_string()));
        if let Err(e) = self
            .transport
            .change_model(self.state.session_id(), model)
            .await
        {
            log::warn!("failed to update model: {}", e);
        }
    }

    /// Send a user message. Returns false without side effects when the text
    /// is blank or a reply is still pending; the caller keeps its input in
    /// that case. On acceptance the user row is rendered optimistically and
    /// never rolled back, even if the request then fails.
    pub async fn send(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || !self.state.begin_send() {
            return false;
        }

        self.emit(UiEvent::MessageAppended(ChatMessage::user(text)));
        self.emit(UiEvent::TypingStarted);
        self.emit(UiEvent::SendEnabled(false));

        let request = SendMessageRequest {
            session_id: self.state.session_id().clone(),
            content: text.to_string(),
            model: self.state.model().to_string(),
        };
        match self.transport.send_message(&request).await {
            Ok(res) if res.is_ok() => {}
            Ok(res) => {
                self.send_failed(
                    res.message
                        .unwrap_or_else(|| "Failed to send message".to_string()),
                );
            }
            Err(e) => {
                log::warn!("send-message request failed: {}", e);
                self.send_failed("Failed to reach server");
            }
        }
        true
    }

    fn send_failed(&mut self, message: impl Into<String>) {
        self.emit(UiEvent::TypingCleared);
        self.toast(message);
        self.state.finish_send();
        self.emit(UiEvent::SendEnabled(true));
    }

    /// Re-fetch the session directory; the frontends re-render it wholesale.
    pub async fn refresh_sessions(&mut self) {
        match self.transport.list_sessions().await {
            Ok(sessions) => self.emit(UiEvent::SessionsListed(sessions)),
            Err(e) => log::warn!("could not load sessions: {}", e),
        }
    }

    /// Apply one socket event. Events from a torn-down connection (stale
    /// generation or session id) are dropped before touching any state.
    pub async fn handle_socket_event(&mut self, event: SocketEvent) {
        if !self.socket.is_current(&event) {
            log::debug!(
                "dropping stale socket event for session {} (generation {})",
                event.session_id,
                event.generation
            );
            return;
        }
        match event.kind {
            SocketEventKind::State(state) => {
                self.emit(UiEvent::Connection(state));
                match state {
                    ConnectionState::Connected => {
                        self.emit(UiEvent::SendEnabled(!self.state.awaiting_reply()));
                    }
                    ConnectionState::Disconnected => {
                        self.emit(UiEvent::SendEnabled(false));
                    }
                    ConnectionState::Connecting => {}
                }
            }
            SocketEventKind::Server(ServerEvent::Message {
                role,
                content,
                title,
            }) => {
                self.emit(UiEvent::TypingCleared);
                self.emit(UiEvent::MessageAppended(ChatMessage { role, content }));
                self.state.finish_send();
                self.emit(UiEvent::SendEnabled(true));
                if let Some(title) = title {
                    self.emit(UiEvent::TitleChanged(title));
                    self.refresh_sessions().await;
                }
            }
            SocketEventKind::Server(ServerEvent::Error { message }) => {
                self.emit(UiEvent::TypingCleared);
                self.toast(message.unwrap_or_else(|| "Something went wrong".to_string()));
                self.state.finish_send();
                self.emit(UiEvent::SendEnabled(true));
            }
            SocketEventKind::Server(ServerEvent::TitleUpdate { title }) => {
                self.emit(UiEvent::TitleChanged(title));
                self.refresh_sessions().await;
            }
        }
    }
}
