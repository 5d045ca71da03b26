use thiserror::Error;

#[derive(Error, Debug)]
pub enum NudgeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid reminder: {0}")]
    Validation(String),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Stored reminder '{key}' is malformed: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl NudgeError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            NudgeError::HttpError(_) => Some(
                "Check your internet connection, or try:\n  nudge notify test"
            ),
            NudgeError::ReminderNotFound(_) => Some(
                "Run `nudge list` to see reminder keys"
            ),
            NudgeError::Validation(_) => Some(
                "A reminder needs a comment and a time, e.g.:\n  nudge new \"Stand up\" --in 30m --every 60"
            ),
            NudgeError::NotificationError(_) => Some(
                "Check your notification settings with `nudge notify show`\nOr reconfigure with `nudge notify set`"
            ),
            NudgeError::DatabaseError(_) | NudgeError::InvalidRecord { .. } => Some(
                "Inspect the stored reminders with `nudge export`, or point NUDGE_DB at a fresh file"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NudgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NudgeError::Validation("comment is required".into());
        assert_eq!(err.to_string(), "Invalid reminder: comment is required");

        let err = NudgeError::InvalidRecord {
            key: "abc".into(),
            reason: "bad datetime".into(),
        };
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_hints() {
        assert!(NudgeError::ReminderNotFound("x".into()).hint().is_some());
        assert!(NudgeError::StoreError("x".into()).hint().is_none());
    }
}
