//! Environment-driven configuration for the engine and its binaries.
//!
//! Binaries load `.env` with `dotenv` before calling [`NovaConfig::from_env`];
//! the library itself only reads process environment variables. Unset or
//! invalid values fall back to defaults, so a bare environment still yields a
//! runnable local configuration (apart from the API key).

use async_openai::config::OpenAIConfig;

use crate::llm::{ChatGroq, DEFAULT_API_BASE};
use crate::tool_source::ToolSpec;

/// Default fast model for routing, chat, and titles.
pub const DEFAULT_SMALL_MODEL: &str = "llama-3.1-8b-instant";
/// Default tool-capable model.
pub const DEFAULT_TOOL_MODEL: &str = "llama-3.3-70b-versatile";
/// Default bind address of the ask server.
pub const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:8090";
/// Default history window loaded per turn.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Engine configuration, one instance per process.
#[derive(Debug, Clone)]
pub struct NovaConfig {
    /// Groq API key (`GROQ_API_KEY`). Empty means unauthenticated; calls
    /// will fail at the provider, not here.
    pub api_key: String,
    /// OpenAI-compatible API base (`GROQ_API_BASE`).
    pub api_base: String,
    /// Classifier model (`NOVA_ROUTER_MODEL`).
    pub router_model: String,
    /// Conversational model (`NOVA_CHAT_MODEL`).
    pub chat_model: String,
    /// Tool-capable model (`NOVA_TOOL_MODEL`).
    pub tool_model: String,
    /// Title model (`NOVA_TITLE_MODEL`).
    pub title_model: String,
    /// Math tool server endpoint (`MATH_SERVER_URL`).
    pub math_server_url: String,
    /// Joke tool server endpoint (`JOKE_SERVER_URL`).
    pub joke_server_url: String,
    /// Bind address of the HTTP server (`SERVE_ADDR`).
    pub serve_addr: String,
    /// SQLite database path (`NOVA_DB`); unset means in-memory sessions.
    pub db_path: Option<String>,
    /// History rows loaded per turn (`NOVA_HISTORY_LIMIT`).
    pub history_limit: usize,
}

impl Default for NovaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            router_model: DEFAULT_SMALL_MODEL.to_string(),
            chat_model: DEFAULT_SMALL_MODEL.to_string(),
            tool_model: DEFAULT_TOOL_MODEL.to_string(),
            title_model: DEFAULT_SMALL_MODEL.to_string(),
            math_server_url: "http://127.0.0.1:8001".to_string(),
            joke_server_url: "http://127.0.0.1:8002".to_string(),
            serve_addr: DEFAULT_SERVE_ADDR.to_string(),
            db_path: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl NovaConfig {
    /// Reads configuration from environment variables, falling back to
    /// [`Default`] for unset, empty, or unparsable values.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_key: std::env::var("GROQ_API_KEY").unwrap_or_default(),
            api_base: env_or("GROQ_API_BASE", &default.api_base),
            router_model: env_or("NOVA_ROUTER_MODEL", &default.router_model),
            chat_model: env_or("NOVA_CHAT_MODEL", &default.chat_model),
            tool_model: env_or("NOVA_TOOL_MODEL", &default.tool_model),
            title_model: env_or("NOVA_TITLE_MODEL", &default.title_model),
            math_server_url: env_or("MATH_SERVER_URL", &default.math_server_url),
            joke_server_url: env_or("JOKE_SERVER_URL", &default.joke_server_url),
            serve_addr: env_or("SERVE_ADDR", &default.serve_addr),
            db_path: std::env::var("NOVA_DB").ok().filter(|v| !v.trim().is_empty()),
            history_limit: std::env::var("NOVA_HISTORY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.history_limit),
        }
    }

    fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfig::new()
            .with_api_key(self.api_key.clone())
            .with_api_base(self.api_base.clone())
    }

    /// Classifier client: small model, a handful of tokens.
    pub fn router_client(&self) -> ChatGroq {
        ChatGroq::with_config(self.openai_config(), self.router_model.clone())
            .with_max_tokens(10)
    }

    /// Conversational client.
    pub fn chat_client(&self) -> ChatGroq {
        ChatGroq::with_config(self.openai_config(), self.chat_model.clone())
            .with_temperature(0.7)
    }

    /// Tool-capable client with `tools` bound for function calling.
    pub fn tool_client(&self, tools: Vec<ToolSpec>) -> ChatGroq {
        ChatGroq::with_config(self.openai_config(), self.tool_model.clone()).with_tools(tools)
    }

    /// Title client: short, low-temperature completions.
    pub fn title_client(&self) -> ChatGroq {
        ChatGroq::with_config(self.openai_config(), self.title_model.clone())
            .with_max_tokens(12)
            .with_temperature(0.3)
    }
}
