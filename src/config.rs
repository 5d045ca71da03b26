use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{NudgeError, Result};

/// Global nudge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where reminders are delivered
    #[serde(default)]
    pub default_notify: Option<NotifyTarget>,

    /// Master switch; when off, notification permission is denied
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Quiet hours - don't send notifications during this time
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,

    /// Longest the daemon sleeps before looking for store changes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Log filter used when NUDGE_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Quiet hours configuration - suppress notifications during specified time range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuietHours {
    /// Start time in HH:MM format (e.g., "22:00")
    pub start: String,
    /// End time in HH:MM format (e.g., "08:00")
    pub end: String,
}

impl QuietHours {
    /// Check if the current local time is within quiet hours
    pub fn is_quiet_now(&self) -> bool {
        use chrono::{Local, Timelike};

        let now = Local::now();
        self.is_quiet_at(now.hour(), now.minute())
    }

    pub fn is_quiet_at(&self, hour: u32, minute: u32) -> bool {
        use chrono::NaiveTime;

        let Some(current_time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
            return false;
        };
        let start = NaiveTime::parse_from_str(&self.start, "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default());
        let end = NaiveTime::parse_from_str(&self.end, "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default());

        // Handle overnight ranges (e.g., 22:00 to 08:00)
        if start > end {
            current_time >= start || current_time < end
        } else {
            current_time >= start && current_time < end
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_notify: None,
            notifications_enabled: true,
            quiet_hours: None,
            poll_interval_secs: default_poll_interval(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyTarget {
    /// Native desktop popup (notify-send on Linux, osascript on macOS)
    Desktop,
    Command { command: String },
    Ntfy { topic: String, server: Option<String> },
    Slack { webhook_url: String },
    Discord { webhook_url: String },
    Gotify { server: String, token: String },
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| NudgeError::ConfigError(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Supports NUDGE_CONFIG environment variable for test isolation
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("NUDGE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "nudge")
            .ok_or_else(|| NudgeError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "nudge")
            .ok_or_else(|| NudgeError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports NUDGE_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("NUDGE_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("nudge.db"))
    }

    /// Poll interval with a floor of one second
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
