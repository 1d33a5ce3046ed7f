//! Configuration Loader
//!
//! Loads and validates configuration from a TOML file. Every section is
//! optional; missing values fall back to the production defaults.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::rates::{DEFAULT_CBR_URL, DEFAULT_NBK_URL};
use crate::adapters::telegram::DEFAULT_API_URL;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub broadcast: BroadcastSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Telegram Bot API section
#[derive(Clone, Deserialize)]
pub struct TelegramSection {
    /// Bot token (prefer TELEGRAM_BOT_TOKEN in .env over committing it)
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Long-poll timeout for getUpdates in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

// Hand-written so the token never ends up in a log line
impl std::fmt::Debug for TelegramSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSection")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl TelegramSection {
    /// Get bot token with environment variable override
    /// Checks TELEGRAM_BOT_TOKEN env var first, falls back to config value
    pub fn get_bot_token(&self) -> Option<String> {
        std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.bot_token.clone().filter(|token| !token.is_empty()))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Upstream rate providers section
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesSection {
    /// CBR daily JSON endpoint
    #[serde(default = "default_cbr_url")]
    pub cbr_url: String,
    /// NBK rates endpoint (the date is appended as `fdate`)
    #[serde(default = "default_nbk_url")]
    pub nbk_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            cbr_url: default_cbr_url(),
            nbk_url: default_nbk_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl SourcesSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Subscriber storage section
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl StorageSection {
    /// Get database path with environment variable override, `~` expanded
    /// Checks KURS_DATABASE_PATH env var first, falls back to config value
    pub fn get_database_path(&self) -> PathBuf {
        let raw = std::env::var("KURS_DATABASE_PATH").unwrap_or_else(|_| self.database_path.clone());
        PathBuf::from(shellexpand::tilde(&raw).to_string())
    }
}

/// Daily broadcast section
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastSection {
    /// Local firing time, "HH:MM"
    #[serde(default = "default_broadcast_time")]
    pub time: String,
    /// IANA timezone the firing time is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Pause between consecutive sends in milliseconds
    #[serde(default = "default_send_delay")]
    pub send_delay_ms: u64,
}

impl Default for BroadcastSection {
    fn default() -> Self {
        Self {
            time: default_broadcast_time(),
            timezone: default_timezone(),
            send_delay_ms: default_send_delay(),
        }
    }
}

impl BroadcastSection {
    pub fn parsed_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.time, "%H:%M").map_err(|e| {
            ConfigError::ValidationError(format!("broadcast.time must be HH:MM, got '{}': {}", self.time, e))
        })
    }

    pub fn parsed_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ConfigError::ValidationError(format!("unknown broadcast.timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

/// Interactive rate limiting section
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    /// Minimum seconds between two identical queries from one chat
    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
        }
    }
}

impl LimitsSection {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_cbr_url() -> String {
    DEFAULT_CBR_URL.to_string()
}

fn default_nbk_url() -> String {
    DEFAULT_NBK_URL.to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_database_path() -> String {
    "subscribers.db".to_string()
}

fn default_broadcast_time() -> String {
    "09:30".to_string()
}

fn default_timezone() -> String {
    "Asia/Almaty".to_string()
}

fn default_send_delay() -> u64 {
    50
}

fn default_window() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration if the file exists, defaults otherwise
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!("No config file at {}, using defaults", path.display());
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "telegram.api_url cannot be empty".to_string(),
            ));
        }

        if self.sources.cbr_url.is_empty() || self.sources.nbk_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "source URLs cannot be empty".to_string(),
            ));
        }

        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sources.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.storage.database_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.database_path cannot be empty".to_string(),
            ));
        }

        self.broadcast.parsed_time()?;
        self.broadcast.parsed_timezone()?;

        if self.broadcast.send_delay_ms < 50 {
            return Err(ConfigError::ValidationError(format!(
                "broadcast.send_delay_ms must be >= 50, got {}",
                self.broadcast.send_delay_ms
            )));
        }

        if self.limits.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "limits.window_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
