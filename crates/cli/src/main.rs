use clap::{Parser, Subcommand};
use std::sync::mpsc;
use std::time::Duration;

use lib::api::{ApiClient, ChatTransport};
use lib::controller::{ChatController, UiEvent};
use lib::models::short_model_name;
use lib::socket::{ConnectionState, SocketEvent, SocketManager};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Chat with the server (interactive). Replies stream in over the
    /// session's socket; type /help for commands.
    Chat {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Optional existing session id to continue.
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// List the session directory.
    Sessions {
        /// Config file path (default: PARLEY_CONFIG_PATH or ~/.parley/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("parley {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Chat { config, session }) => {
            if let Err(e) = run_chat(config, session).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sessions { config }) => {
            if let Err(e) = run_sessions(config).await {
                log::error!("sessions failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_sessions(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let client = ApiClient::new(lib::config::resolve_api_base(&config));
    let sessions = client.list_sessions().await?;
    if sessions.is_empty() {
        println!("no sessions");
        return Ok(());
    }
    for s in sessions {
        println!("{}  {}", s.session_id, s.display_title());
    }
    Ok(())
}

type Controller = ChatController<ApiClient, SocketManager>;

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    session: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = lib::config::load_config(config_path)?;
    let api_base = lib::config::resolve_api_base(&config);
    let ws_base = lib::config::resolve_ws_base(&config);
    let default_model = lib::config::resolve_default_model(&config);

    let (ui_tx, ui_rx) = mpsc::channel();
    let (sock_tx, sock_rx) = mpsc::channel();
    let transport = ApiClient::new(api_base);
    let socket = SocketManager::new(ws_base, sock_tx);
    let mut ctrl = ChatController::new(transport, socket, default_model, ui_tx);

    ctrl.init().await;
    if let Some(id) = session {
        ctrl.open_session(&id).await;
    }
    pump_socket(&mut ctrl, &sock_rx).await;
    render(&ui_rx);
    println!("model: {} (/help for commands)", ctrl.state().model());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        pump_socket(&mut ctrl, &sock_rx).await;
        render(&ui_rx);

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if let Some(command) = input.strip_prefix('/') {
            run_command(&mut ctrl, command).await;
        } else if ctrl.send(input).await {
            wait_for_reply(&mut ctrl, &sock_rx, &ui_rx).await;
        }
        render(&ui_rx);
    }

    Ok(())
}

async fn run_command(ctrl: &mut Controller, command: &str) {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "help" => {
            println!("/new              start a new session");
            println!("/sessions         list sessions");
            println!("/open ID          open a session");
            println!("/delete ID        delete a session");
            println!("/model NAME       switch model for this session");
            println!("/models [FILTER]  list available models");
            println!("/quit             exit");
        }
        "new" => ctrl.start_new_session(),
        "sessions" => ctrl.refresh_sessions().await,
        "open" if !arg.is_empty() => ctrl.open_session(&arg.to_string()).await,
        "delete" if !arg.is_empty() => ctrl.delete_session(&arg.to_string()).await,
        "model" if !arg.is_empty() => {
            if ctrl.catalog().contains(arg) {
                ctrl.change_model(arg).await;
            } else {
                println!("unknown model: {} (see /models)", arg);
            }
        }
        "models" => {
            for m in ctrl.catalog().filter(arg) {
                let marker = if m == ctrl.state().model() { "*" } else { " " };
                println!("{} {}", marker, m);
            }
        }
        name => match command_usage(name) {
            Some(usage) => println!("{}", usage),
            None => println!("unknown command: /{} (see /help)", command),
        },
    }
}

/// Usage line for a known command invoked without its required argument.
fn command_usage(name: &str) -> Option<&'static str> {
    match name {
        "open" => Some("usage: /open ID"),
        "delete" => Some("usage: /delete ID"),
        "model" => Some("usage: /model NAME"),
        _ => None,
    }
}

/// Apply any socket events that have already arrived.
async fn pump_socket(ctrl: &mut Controller, sock_rx: &mpsc::Receiver<SocketEvent>) {
    while let Ok(ev) = sock_rx.try_recv() {
        ctrl.handle_socket_event(ev).await;
    }
}

/// Block until the pending reply (or its error) has been applied.
async fn wait_for_reply(
    ctrl: &mut Controller,
    sock_rx: &mpsc::Receiver<SocketEvent>,
    ui_rx: &mpsc::Receiver<UiEvent>,
) {
    while ctrl.state().awaiting_reply() {
        match sock_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(ev) => ctrl.handle_socket_event(ev).await,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        render(ui_rx);
    }
    render(ui_rx);
}

/// Print pending view updates. The user's own rows are already on screen, so
/// only assistant rows, history, and status lines are shown.
fn render(ui_rx: &mpsc::Receiver<UiEvent>) {
    while let Ok(ev) = ui_rx.try_recv() {
        match ev {
            UiEvent::MessageAppended(m) if !m.is_user() => {
                println!("< {}", m.content.trim());
            }
            UiEvent::HistoryLoaded(messages) => {
                for m in &messages {
                    let prefix = if m.is_user() { ">" } else { "<" };
                    println!("{} {}", prefix, m.content.trim());
                }
            }
            UiEvent::SessionsListed(sessions) => {
                for s in &sessions {
                    println!("{}  {}", s.session_id, s.display_title());
                }
            }
            UiEvent::TitleChanged(title) => {
                println!("[{}]", title);
            }
            UiEvent::ModelChanged(model) => {
                println!("model: {}", short_model_name(&model));
            }
            UiEvent::Connection(ConnectionState::Disconnected) => {
                println!("(disconnected, retrying)");
            }
            UiEvent::Toast(msg) => {
                eprintln!("! {}", msg);
            }
            _ => {}
        }
    }
}
