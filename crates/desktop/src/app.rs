//! Parley Desktop — egui app state and UI.
//!
//! The controller runs on a worker thread with its own tokio runtime; the UI
//! thread sends `Command`s and polls `UiEvent`s each frame (plus the repaint
//! tick that keeps socket pushes visible without user input).

use eframe::egui;
use std::sync::mpsc;
use std::time::Duration;

use lib::api::ApiClient;
use lib::controller::{ChatController, UiEvent, NEW_CHAT_TITLE};
use lib::models::short_model_name;
use lib::socket::{ConnectionState, SocketManager};
use lib::state::{ChatMessage, SessionId, SessionSummary};

const SIDEBAR_WIDTH: f32 = 240.0;
const CHAT_INPUT_HEIGHT: f32 = 32.0;
/// Toast lifetime in frames (~3 s at 60 fps, matching the transient style).
const TOAST_FRAMES: u32 = 180;

/// User actions forwarded to the controller worker.
enum Command {
    NewSession,
    OpenSession(SessionId),
    DeleteSession(SessionId),
    ChangeModel(String),
    Send(String),
}

/// Run the controller on a background thread. Socket events and commands are
/// both applied there; view updates come back over the returned receiver.
fn spawn_controller() -> (mpsc::Sender<Command>, mpsc::Receiver<UiEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();

    std::thread::spawn(move || {
        let (config, _) = match lib::config::load_config(None) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("failed to load config: {}", e);
                (lib::config::Config::default(), std::path::PathBuf::new())
            }
        };
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("controller worker could not start runtime: {}", e);
                return;
            }
        };

        let (sock_tx, sock_rx) = mpsc::channel();
        let transport = ApiClient::new(lib::config::resolve_api_base(&config));
        let socket = SocketManager::new(lib::config::resolve_ws_base(&config), sock_tx);
        let mut ctrl = ChatController::new(
            transport,
            socket,
            lib::config::resolve_default_model(&config),
            ui_tx,
        );

        rt.block_on(ctrl.init());
        loop {
            while let Ok(ev) = sock_rx.try_recv() {
                rt.block_on(ctrl.handle_socket_event(ev));
            }
            match cmd_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(cmd) => rt.block_on(apply_command(&mut ctrl, cmd)),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    (cmd_tx, ui_rx)
}

async fn apply_command(ctrl: &mut ChatController<ApiClient, SocketManager>, cmd: Command) {
    match cmd {
        Command::NewSession => ctrl.start_new_session(),
        Command::OpenSession(id) => ctrl.open_session(&id).await,
        Command::DeleteSession(id) => ctrl.delete_session(&id).await,
        Command::ChangeModel(model) => ctrl.change_model(&model).await,
        Command::Send(text) => {
            ctrl.send(&text).await;
        }
    }
}

pub struct ParleyApp {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<UiEvent>,

    /// Active session id (selected in the sidebar).
    session_id: Option<SessionId>,
    title: String,
    /// Current model identifier for the active session.
    model: String,
    models: Vec<String>,
    sessions: Vec<SessionSummary>,
    /// Render copy of the transcript; authoritative history lives server-side.
    messages: Vec<ChatMessage>,
    typing: bool,
    send_enabled: bool,
    connection: ConnectionState,

    input: String,
    model_menu_open: bool,
    model_filter: String,
    /// Transient notification: text and remaining frames.
    toast: Option<(String, u32)>,
}

impl ParleyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (commands, events) = spawn_controller();
        Self {
            commands,
            events,
            session_id: None,
            title: NEW_CHAT_TITLE.to_string(),
            model: lib::config::FALLBACK_MODEL.to_string(),
            models: Vec::new(),
            sessions: Vec::new(),
            messages: Vec::new(),
            typing: false,
            send_enabled: false,
            connection: ConnectionState::Connecting,
            input: String::new(),
            model_menu_open: false,
            model_filter: String::new(),
            toast: None,
        }
    }

    fn command(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            log::error!("controller worker is gone");
        }
    }

    /// Apply queued view updates. Call once per frame.
    fn poll_events(&mut self) {
        while let Ok(ev) = self.events.try_recv() {
            match ev {
                UiEvent::ModelsLoaded(models) => self.models = models,
                UiEvent::SessionStarted { session_id }
                | UiEvent::SessionOpened { session_id } => {
                    self.session_id = Some(session_id);
                    self.messages.clear();
                    self.typing = false;
                }
                UiEvent::HistoryLoaded(messages) => self.messages = messages,
                UiEvent::MessageAppended(m) => self.messages.push(m),
                UiEvent::TypingStarted => self.typing = true,
                UiEvent::TypingCleared => self.typing = false,
                UiEvent::TitleChanged(title) => self.title = title,
                UiEvent::ModelChanged(model) => self.model = model,
                UiEvent::SessionsListed(sessions) => self.sessions = sessions,
                UiEvent::Connection(state) => self.connection = state,
                UiEvent::SendEnabled(enabled) => self.send_enabled = enabled,
                UiEvent::Toast(text) => self.toast = Some((text, TOAST_FRAMES)),
            }
        }
    }

    fn try_send(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || !self.send_enabled {
            return;
        }
        self.input.clear();
        self.command(Command::Send(text));
    }

    fn select_model(&mut self, model: String) {
        self.model_menu_open = false;
        self.model_filter.clear();
        if model != self.model {
            self.command(Command::ChangeModel(model));
        }
    }

    fn connection_dot(&self, ui: &mut egui::Ui) {
        let (color, label) = match self.connection {
            ConnectionState::Connected => (egui::Color32::from_rgb(0x2e, 0xcc, 0x71), "Connected"),
            ConnectionState::Connecting => (egui::Color32::from_rgb(0xf3, 0x9c, 0x12), "Connecting"),
            ConnectionState::Disconnected => (egui::Color32::from_rgb(0xe7, 0x4c, 0x3c), "Disconnected"),
        };
        ui.label(egui::RichText::new("●").color(color)).on_hover_text(label);
    }

    fn ui_header(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.horizontal(|ui| {
            ui.heading("Parley");
            ui.separator();
            ui.label(egui::RichText::new(self.title.clone()).strong());
            self.connection_dot(ui);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::widgets::global_dark_light_mode_switch(ui);
                // Model badge: short name of the active model.
                ui.label(
                    egui::RichText::new(short_model_name(&self.model))
                        .small()
                        .weak(),
                );
            });
        });
        ui.add_space(10.0);
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(16.0);
        if ui.button("＋ New chat").clicked() {
            self.command(Command::NewSession);
        }
        ui.add_space(12.0);
        ui.separator();

        let mut open: Option<SessionId> = None;
        let mut delete: Option<SessionId> = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for s in &self.sessions {
                let selected = self.session_id.as_deref() == Some(s.session_id.as_str());
                ui.horizontal(|ui| {
                    // The delete button is separate so it does not also open.
                    if ui.small_button("✕").on_hover_text("Delete").clicked() {
                        delete = Some(s.session_id.clone());
                    }
                    if ui
                        .selectable_label(selected, s.display_title())
                        .clicked()
                        && !selected
                    {
                        open = Some(s.session_id.clone());
                    }
                });
            }
            if self.sessions.is_empty() {
                ui.weak("No sessions yet.");
            }
        });
        if let Some(id) = delete {
            self.command(Command::DeleteSession(id));
        } else if let Some(id) = open {
            self.command(Command::OpenSession(id));
        }
    }

    fn render_message(ui: &mut egui::Ui, m: &ChatMessage) {
        let fill = if m.is_user() {
            ui.style().visuals.extreme_bg_color
        } else {
            ui.style().visuals.panel_fill
        };
        egui::Frame::none()
            .fill(fill)
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0))
            .show(ui, |ui| {
                if m.is_user() {
                    ui.label(egui::RichText::new(&m.content).strong());
                } else {
                    ui.label(&m.content);
                }
            });
    }

    fn ui_messages(&mut self, ui: &mut egui::Ui, height: f32) {
        egui::ScrollArea::vertical()
            .max_height(height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let content_width = ui.available_width();
                ui.allocate_exact_size(egui::vec2(content_width, 0.0), egui::Sense::hover());
                if self.messages.is_empty() && !self.typing {
                    ui.add_space(24.0);
                    ui.vertical_centered(|ui| ui.weak("Send a message to start the conversation."));
                }
                for m in &self.messages {
                    Self::render_message(ui, m);
                    ui.add_space(8.0);
                }
                if self.typing {
                    ui.label(egui::RichText::new("…").weak().size(20.0));
                }
            });
    }

    fn ui_model_selector(&mut self, ui: &mut egui::Ui) {
        let button = ui.button(short_model_name(&self.model));
        if button.clicked() {
            self.model_menu_open = !self.model_menu_open;
            self.model_filter.clear();
        }

        if !self.model_menu_open {
            return;
        }
        let mut open = self.model_menu_open;
        let mut picked: Option<String> = None;
        egui::Window::new("Models")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(280.0)
            .show(ui.ctx(), |ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.model_filter)
                        .hint_text("Search models"),
                );
                ui.add_space(6.0);
                egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                    let filter = self.model_filter.to_lowercase();
                    for m in &self.models {
                        if !m.to_lowercase().contains(&filter) {
                            continue;
                        }
                        if ui.selectable_label(*m == self.model, m).clicked() {
                            picked = Some(m.clone());
                        }
                    }
                });
            });
        self.model_menu_open = open;
        if let Some(model) = picked {
            self.select_model(model);
        }
    }

    fn ui_input_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            self.ui_model_selector(ui);
            let send_clicked = ui
                .with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let clicked = ui
                        .add_enabled(self.send_enabled, egui::Button::new("Send"))
                        .clicked();
                    let input = ui.add_sized(
                        [ui.available_width(), CHAT_INPUT_HEIGHT],
                        egui::TextEdit::singleline(&mut self.input)
                            .hint_text("Type a message"),
                    );
                    let entered = input.lost_focus()
                        && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if entered {
                        input.request_focus();
                    }
                    clicked || entered
                })
                .inner;
            if send_clicked {
                self.try_send();
            }
        });
    }

    fn ui_toast(&mut self, ctx: &egui::Context) {
        let Some((text, frames)) = self.toast.take() else {
            return;
        };
        egui::TopBottomPanel::bottom("toast").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.colored_label(egui::Color32::from_rgb(0xe6, 0x7e, 0x22), &text);
            ui.add_space(4.0);
        });
        if frames > 1 {
            self.toast = Some((text, frames - 1));
        }
    }
}

impl eframe::App for ParleyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        // Socket pushes arrive without user input; keep polling.
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                .show(ui, |ui| self.ui_header(ui));
        });

        self.ui_toast(ctx);

        egui::SidePanel::left("sessions")
            .resizable(false)
            .exact_width(SIDEBAR_WIDTH)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(12.0, 0.0))
                    .show(ui, |ui| self.ui_sidebar(ui));
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(12.0);
                    let input_height = CHAT_INPUT_HEIGHT + 24.0;
                    let messages_height = (ui.available_height() - input_height).max(80.0);
                    self.ui_messages(ui, messages_height);
                    ui.add_space(8.0);
                    self.ui_input_row(ui);
                    ui.add_space(12.0);
                });
        });
    }
}
