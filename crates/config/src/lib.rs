//! Configuration loading and validation for Bumblebot.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! for secrets (`TELEGRAM_BOT_TOKEN`, `GEMINI_API_KEY`, `TAVILY_API_KEY`).
//! Validates the settings that would otherwise fail at first use.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Telegram connection settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Fact memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Group context settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Tavily web search settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram", &self.telegram)
            .field("llm", &self.llm)
            .field("memory", &self.memory)
            .field("context", &self.context)
            .field("search", &self.search)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather (override: TELEGRAM_BOT_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Bot username without the leading '@', used for mention detection
    #[serde(default = "default_bot_username")]
    pub bot_username: String,

    /// Allowed chat IDs. Empty = allow all.
    #[serde(default)]
    pub allowed_chats: Vec<i64>,
}

fn default_bot_username() -> String {
    "shmel_bot".into()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_username: default_bot_username(),
            allowed_chats: Vec::new(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("bot_username", &self.bot_username)
            .field("allowed_chats", &self.allowed_chats)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (override: GEMINI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Persona prepended to every system message
    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_model() -> String {
    "gemma-3-27b-it".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_persona() -> String {
    "Ты — Шмель, дружелюбный помощник в Telegram. Отвечай кратко и по делу, на русском языке.".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            persona: default_persona(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite path for the fact store. `sqlite::memory:` for ephemeral.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Per-user short-term dialogue capacity
    #[serde(default = "default_short_term")]
    pub short_term_capacity: usize,
}

fn default_db_path() -> String {
    "sqlite://bot_memory.db".into()
}
fn default_short_term() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            short_term_capacity: default_short_term(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Chat-wide history capacity per chat
    #[serde(default = "default_chat_history")]
    pub chat_history: usize,

    /// Per-user history capacity within a chat
    #[serde(default = "default_user_history")]
    pub user_history: usize,

    /// Maximum number of chats tracked in memory before least-recently-active
    /// eviction kicks in
    #[serde(default = "default_max_chats")]
    pub max_chats: usize,

    /// SQLite path for the chat stats side table
    #[serde(default = "default_stats_db_path")]
    pub stats_db_path: String,
}

fn default_chat_history() -> usize {
    30
}
fn default_user_history() -> usize {
    10
}
fn default_max_chats() -> usize {
    1000
}
fn default_stats_db_path() -> String {
    "sqlite://group_memory.db".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            chat_history: default_chat_history(),
            user_history: default_user_history(),
            max_chats: default_max_chats(),
            stats_db_path: default_stats_db_path(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tavily API key (override: TAVILY_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Monthly request budget
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: u32,
}

fn default_monthly_limit() -> u32 {
    1000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            monthly_limit: default_monthly_limit(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("monthly_limit", &self.monthly_limit)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Build a config from defaults plus env overrides (no file).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Secrets from the environment win over the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
    }

    /// Validate settings that would otherwise fail at first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.short_term_capacity == 0 {
            return Err(ConfigError::Invalid(
                "memory.short_term_capacity must be at least 1".into(),
            ));
        }
        if self.context.chat_history == 0 || self.context.user_history == 0 {
            return Err(ConfigError::Invalid(
                "context history capacities must be at least 1".into(),
            ));
        }
        if self.context.max_chats == 0 {
            return Err(ConfigError::Invalid(
                "context.max_chats must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature {} out of range 0.0..=2.0",
                self.llm.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.memory.short_term_capacity, 10);
        assert_eq!(config.context.chat_history, 30);
        assert_eq!(config.context.user_history, 10);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[telegram]
bot_username = "test_bot"
allowed_chats = [123, -456]

[llm]
model = "gemma-3-4b-it"
temperature = 0.3

[memory]
short_term_capacity = 5
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.telegram.bot_username, "test_bot");
        assert_eq!(config.telegram.allowed_chats, vec![123, -456]);
        assert_eq!(config.llm.model, "gemma-3-4b-it");
        assert_eq!(config.memory.short_term_capacity, 5);
        // Unspecified sections fall back to defaults
        assert_eq!(config.context.chat_history, 30);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Path::new("/nonexistent/bumblebot.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.memory.short_term_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = Some("8039807556:AAG-secret".into());
        config.llm.api_key = Some("AIza-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
