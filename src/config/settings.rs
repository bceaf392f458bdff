//! Application settings and Telegram configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (obtain from <https://t.me/BotFather>).
    pub bot_token: String,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub const fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        if bot_token.trim().is_empty() {
            return Err(ConfigError::EmptyBotToken);
        }

        Ok(Self { bot_token })
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the saved answers JSON file.
    #[serde(default = "default_answers_path")]
    pub answers_path: PathBuf,

    /// Path to the saved schedules JSON file.
    #[serde(default = "default_schedules_path")]
    pub schedules_path: PathBuf,

    /// Scheduler tick interval in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Minimum interval between form submissions in seconds (rate limit protection).
    #[serde(default = "default_min_submit_interval")]
    pub min_submit_interval_secs: u64,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_answers_path() -> PathBuf {
    PathBuf::from("answers.json")
}

fn default_schedules_path() -> PathBuf {
    PathBuf::from("schedules.json")
}

fn default_tick_interval() -> u64 {
    30
}

fn default_min_submit_interval() -> u64 {
    60 // 1 minute minimum between submissions
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            answers_path: default_answers_path(),
            schedules_path: default_schedules_path(),
            tick_interval_secs: default_tick_interval(),
            min_submit_interval_secs: default_min_submit_interval(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            answers_path: std::env::var("ANSWERS_PATH")
                .map_or_else(|_| default_answers_path(), PathBuf::from),
            schedules_path: std::env::var("SCHEDULES_PATH")
                .map_or_else(|_| default_schedules_path(), PathBuf::from),
            tick_interval_secs: std::env::var("TICK_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_tick_interval),
            min_submit_interval_secs: std::env::var("MIN_SUBMIT_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_submit_interval),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("BOT_TOKEN must not be empty")]
    EmptyBotToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.answers_path, PathBuf::from("answers.json"));
        assert_eq!(settings.schedules_path, PathBuf::from("schedules.json"));
        assert_eq!(settings.tick_interval_secs, 30);
        assert_eq!(settings.min_submit_interval_secs, 60);
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new("123456:abc".to_owned());
        assert_eq!(config.bot_token, "123456:abc");
    }
}
