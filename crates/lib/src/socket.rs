//! Connection lifecycle for the per-session push channel.
//!
//! One socket per active session at `{ws_base}/ws/{session_id}`. The listener
//! runs on a background thread with its own tokio runtime and forwards parsed
//! events over an mpsc channel. On transport error or close it retries after a
//! fixed delay for as long as that session is still the active one; switching
//! sessions (or closing intentionally) bumps a shared generation counter,
//! which both stops the old loop and lets consumers drop its late events.

use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{parse_server_event, ServerEvent};
use crate::state::SessionId;

/// Delay between reconnect attempts while a session is active.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// How often a blocked read checks whether its generation went stale.
const STALE_POLL: Duration = Duration::from_millis(250);

/// Connect/retry state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

/// One event from a socket listener, tagged with the session and generation
/// it was opened for so stale listeners can be ignored.
#[derive(Debug, Clone)]
pub struct SocketEvent {
    pub session_id: SessionId,
    pub generation: u64,
    pub kind: SocketEventKind,
}

#[derive(Debug, Clone)]
pub enum SocketEventKind {
    State(ConnectionState),
    Server(ServerEvent),
}

/// The controller's view of the socket: open for a session, close, and decide
/// whether an event belongs to the current connection. `SocketManager` is the
/// real implementation; tests substitute a recording fake.
pub trait SocketControl {
    fn connect(&mut self, session_id: &SessionId);
    fn disconnect(&mut self);
    fn generation(&self) -> u64;
    fn session_id(&self) -> Option<&SessionId>;

    /// True when the event came from the connection currently designated
    /// active. Late payloads from a torn-down connection fail this check.
    fn is_current(&self, event: &SocketEvent) -> bool {
        self.generation() == event.generation
            && self.session_id() == Some(&event.session_id)
    }
}

/// Owns the background listener for the active session's socket.
pub struct SocketManager {
    ws_base: String,
    tx: mpsc::Sender<SocketEvent>,
    generation: Arc<AtomicU64>,
    current: Option<SessionId>,
    retry_delay: Duration,
}

impl SocketManager {
    pub fn new(ws_base: impl Into<String>, tx: mpsc::Sender<SocketEvent>) -> Self {
        Self {
            ws_base: ws_base.into().trim_end_matches('/').to_string(),
            tx,
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Same as `new` but with a custom retry delay (tests).
    pub fn with_retry_delay(
        ws_base: impl Into<String>,
        tx: mpsc::Sender<SocketEvent>,
        retry_delay: Duration,
    ) -> Self {
        let mut m = Self::new(ws_base, tx);
        m.retry_delay = retry_delay;
        m
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl SocketControl for SocketManager {
    /// Open the push channel for `session_id`. Any previous listener sees the
    /// generation change and exits instead of retrying.
    fn connect(&mut self, session_id: &SessionId) {
        let generation = self.bump();
        self.current = Some(session_id.clone());

        let url = format!("{}/ws/{}", self.ws_base, session_id);
        let session_id = session_id.clone();
        let shared = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let retry_delay = self.retry_delay;
        std::thread::spawn(move || {
            run_socket_loop(url, session_id, generation, shared, tx, retry_delay);
        });
    }

    /// Intentional close: no session is active, so no retry follows.
    fn disconnect(&mut self) {
        self.bump();
        self.current = None;
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }
}

/// Connect/read/retry loop for one generation. Exits when the generation goes
/// stale or the event receiver is gone.
fn run_socket_loop(
    url: String,
    session_id: SessionId,
    generation: u64,
    shared: Arc<AtomicU64>,
    tx: mpsc::Sender<SocketEvent>,
    retry_delay: Duration,
) {
    let stale = || shared.load(Ordering::SeqCst) != generation;
    let emit = |kind: SocketEventKind| {
        tx.send(SocketEvent {
            session_id: session_id.clone(),
            generation,
            kind,
        })
        .is_ok()
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::warn!("socket listener could not start runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        loop {
            if stale() {
                return;
            }
            if !emit(SocketEventKind::State(ConnectionState::Connecting)) {
                return;
            }

            match tokio_tungstenite::connect_async(&url).await {
                Ok((mut ws, _)) => {
                    if !emit(SocketEventKind::State(ConnectionState::Connected)) {
                        return;
                    }
                    let mut poll = tokio::time::interval(STALE_POLL);
                    loop {
                        tokio::select! {
                            _ = poll.tick() => {
                                if stale() {
                                    return;
                                }
                            }
                            frame = ws.next() => {
                                match frame {
                                    Some(Ok(Message::Text(text))) => {
                                        match parse_server_event(&text) {
                                            Ok(ev) => {
                                                if !emit(SocketEventKind::Server(ev)) {
                                                    return;
                                                }
                                            }
                                            Err(e) => {
                                                log::debug!("ignoring unknown socket payload: {}", e);
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) | None => break,
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        log::debug!("socket read error: {}", e);
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    log::debug!("socket connect failed for {}: {}", url, e);
                }
            }

            if !emit(SocketEventKind::State(ConnectionState::Disconnected)) {
                return;
            }
            if stale() {
                return;
            }
            tokio::time::sleep(retry_delay).await;
        }
    });
}
