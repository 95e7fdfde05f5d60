//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.parley/config.json`) and environment.
//! Only two things really matter to the client: where the server's REST API lives
//! and where its WebSocket endpoint lives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model used when the server's model list cannot be fetched.
pub const FALLBACK_MODEL: &str = "openai/gpt-4.1-mini";

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Server endpoints (REST and WebSocket origins).
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat defaults (e.g. default model).
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Server origins for REST and WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// HTTP origin for the REST API (default "http://127.0.0.1:8000").
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// WebSocket origin. When absent, derived from api_base (http -> ws, https -> wss).
    pub ws_base: Option<String>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            ws_base: None,
        }
    }
}

/// Chat defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Model used for new sessions until the user picks one (default FALLBACK_MODEL).
    pub default_model: Option<String>,
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PARLEY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".parley").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or PARLEY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the REST base URL: env PARLEY_API_BASE overrides config. Trailing slashes are trimmed.
pub fn resolve_api_base(config: &Config) -> String {
    std::env::var("PARLEY_API_BASE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.server.api_base.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the WebSocket base URL: env PARLEY_WS_BASE, then config, then api_base
/// with the scheme swapped (http -> ws, https -> wss).
pub fn resolve_ws_base(config: &Config) -> String {
    std::env::var("PARLEY_WS_BASE")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            config
                .server
                .ws_base
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| ws_base_from_api(&resolve_api_base(config)))
        .trim_end_matches('/')
        .to_string()
}

/// Derive a WebSocket origin from an HTTP origin.
pub fn ws_base_from_api(api_base: &str) -> String {
    let api_base = api_base.trim_end_matches('/');
    if let Some(rest) = api_base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = api_base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", api_base)
    }
}

/// Resolve the default model: config value or the hardcoded fallback.
pub fn resolve_default_model(config: &Config) -> String {
    config
        .chat
        .default_model
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_MODEL.to_string())
}
