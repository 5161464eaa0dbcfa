//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/coachkit/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/coachkit/` (~/.config/coachkit/)
//! - Data: `$XDG_DATA_HOME/coachkit/` (~/.local/share/coachkit/)
//! - State/Logs: `$XDG_STATE_HOME/coachkit/` (~/.local/state/coachkit/)

use crate::error::{Error, Result};
use crate::types::Locale;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Reply backend configuration
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Proactive nudge configuration
    #[serde(default)]
    pub nudges: NudgeConfig,

    /// Chat session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reply provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReplyConfig {
    /// Provider type
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// System prompt prepended to every conversation
    pub system_prompt: Option<String>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_reply_timeout")]
    pub timeout_secs: u64,
    /// Max retry attempts for transient failures (0 = never retry)
    #[serde(default)]
    pub max_retries: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            system_prompt: None,
            timeout_secs: default_reply_timeout(),
            max_retries: 0,
        }
    }
}

impl ReplyConfig {
    /// Endpoint to use, falling back to the provider default
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }

    /// API key from config, or from the provider's environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
        })
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("reply.model must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "reply.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_retries > 5 {
            return Err(Error::Config(
                "reply.max_retries must be between 0 and 5".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_provider() -> LlmProvider {
    LlmProvider::Ollama
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_reply_timeout() -> u64 {
    60
}

/// Supported LLM providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Claude,
    OpenAI,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Claude => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    /// Environment variable consulted when no api_key is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Ollama => None,
            LlmProvider::Claude => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
        }
    }
}

/// Proactive nudge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NudgeConfig {
    /// Enable/disable proactive nudges
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds a nudge stays visible before it is cleared automatically
    #[serde(default = "default_auto_dismiss_secs")]
    pub auto_dismiss_secs: u64,

    /// Seconds between background trigger evaluations
    #[serde(default = "default_idle_check_secs")]
    pub idle_check_secs: u64,

    /// Trigger names that never fire (e.g. "idle_5min")
    #[serde(default)]
    pub disabled_triggers: Vec<String>,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_dismiss_secs: default_auto_dismiss_secs(),
            idle_check_secs: default_idle_check_secs(),
            disabled_triggers: vec![],
        }
    }
}

impl NudgeConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.auto_dismiss_secs == 0 {
            return Err(Error::Config(
                "nudges.auto_dismiss_secs must be greater than 0".to_string(),
            ));
        }
        if self.idle_check_secs == 0 {
            return Err(Error::Config(
                "nudges.idle_check_secs must be greater than 0".to_string(),
            ));
        }
        for name in &self.disabled_triggers {
            if name.parse::<crate::types::TriggerKind>().is_err() {
                return Err(Error::Config(format!(
                    "nudges.disabled_triggers: unknown trigger {:?}",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_auto_dismiss_secs() -> u64 {
    30
}

fn default_idle_check_secs() -> u64 {
    30
}

/// Chat session behavior
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Language for nudges, error messages and frustration keywords
    #[serde(default)]
    pub locale: Locale,

    /// Messages longer than this are truncated until expanded
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            truncate_chars: default_truncate_chars(),
        }
    }
}

fn default_truncate_chars() -> usize {
    600
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.reply.validate()?;
        self.nudges.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/coachkit/config.toml` (~/.config/coachkit/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("coachkit").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/coachkit/` (~/.local/share/coachkit/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("coachkit")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/coachkit/` (~/.local/state/coachkit/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("coachkit")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/coachkit/data.db` (~/.local/share/coachkit/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/coachkit/coachkit.log` (~/.local/state/coachkit/coachkit.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("coachkit.log")
    }
}
