//! Configuration and settings management
//!
//! Loads settings from environment variables (and optional config files)
//! and defines the fixed limits of the bot.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest track (in seconds) the bot will offer or download.
pub const MAX_TRACK_DURATION_SECS: u32 = 600;
/// Number of search results requested from the media source and offered to users.
pub const RESULT_PAGE_SIZE: usize = 5;
/// Maximum length of a sanitized title used in transient file names.
pub const SANITIZED_NAME_MAX_CHARS: usize = 50;
/// Title used when a selected identifier has no known title.
pub const UNKNOWN_TRACK_TITLE: &str = "Track";

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,

    /// Chat ID of the single administrator
    #[serde(rename = "admin_id")]
    pub admin_id_str: Option<String>,

    /// Chat ID of the channel used as durable audio storage
    #[serde(rename = "cache_channel_id")]
    pub cache_channel_id_str: Option<String>,

    /// Path or name of the yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    /// Directory for transient audio artifacts
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Timeout applied to every yt-dlp invocation, `0` disables it
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

const fn default_fetch_timeout_secs() -> u64 {
    300
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use melody_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `BOT_TOKEN` is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps BOT_TOKEN to bot_token; empty vars count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        if settings.bot_token.trim().is_empty() {
            return Err(ConfigError::Message("BOT_TOKEN is empty".to_string()));
        }
        Ok(settings)
    }

    /// Administrator chat ID, `None` when unset or not a number.
    #[must_use]
    pub fn admin_id(&self) -> Option<i64> {
        parse_chat_id(self.admin_id_str.as_deref())
    }

    /// Durable storage channel ID, `None` when unset or not a number.
    #[must_use]
    pub fn cache_channel_id(&self) -> Option<i64> {
        parse_chat_id(self.cache_channel_id_str.as_deref())
    }

    /// Timeout for external fetcher calls, `None` when disabled.
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }
}

fn parse_chat_id(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
}
