use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NudgeError, Result};

/// Frequency used when the submitted value is missing or not a positive whole number of minutes
pub const DEFAULT_FREQUENCY_MINUTES: u32 = 60;

/// Opaque storage key addressing one reminder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderKey(String);

impl ReminderKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Allocate a fresh random key
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, enough to address a reminder from the CLI
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReminderKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// The persisted shape of a reminder.
///
/// The key is not part of the record: it is the address the record lives
/// under in the store. Serializes to the wire format
/// `{ comment, datetime, frequency, disableTime }` with ISO-8601 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderData {
    pub comment: String,
    /// Next scheduled fire time
    pub datetime: DateTime<Utc>,
    /// Minutes between recurrences, always positive
    pub frequency: u32,
    /// Stop recurring (and delete) once this time is reached
    #[serde(default)]
    pub disable_time: Option<DateTime<Utc>>,
}

impl ReminderData {
    pub fn frequency_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.frequency))
    }

    /// Check the record-level invariants
    pub fn validate(&self) -> Result<()> {
        if self.comment.trim().is_empty() {
            return Err(NudgeError::Validation("comment is required".into()));
        }
        if self.frequency == 0 {
            return Err(NudgeError::Validation("frequency must be at least one minute".into()));
        }
        Ok(())
    }
}

/// Full set of reminders as delivered by the store, keyed by storage key
pub type Snapshot = BTreeMap<ReminderKey, ReminderData>;

/// User-submitted values for creating or editing a reminder, before validation
#[derive(Debug, Clone, Default)]
pub struct ReminderFields {
    pub comment: String,
    pub datetime: Option<DateTime<Utc>>,
    /// Raw frequency input; anything unparsable becomes the default
    pub frequency: Option<String>,
    pub disable_time: Option<DateTime<Utc>>,
}

impl ReminderFields {
    pub fn new(comment: impl Into<String>, datetime: DateTime<Utc>) -> Self {
        Self {
            comment: comment.into(),
            datetime: Some(datetime),
            ..Self::default()
        }
    }

    pub fn every(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn until(mut self, disable_time: DateTime<Utc>) -> Self {
        self.disable_time = Some(disable_time);
        self
    }

    /// Validate and turn form input into a record
    pub fn into_data(self) -> Result<ReminderData> {
        let comment = self.comment.trim().to_string();
        if comment.is_empty() {
            return Err(NudgeError::Validation("comment is required".into()));
        }
        let datetime = self
            .datetime
            .ok_or_else(|| NudgeError::Validation("date and time are required".into()))?;

        let frequency = self
            .frequency
            .as_deref()
            .and_then(parse_frequency)
            .unwrap_or(DEFAULT_FREQUENCY_MINUTES);

        Ok(ReminderData {
            comment,
            datetime,
            frequency,
            disable_time: self.disable_time,
        })
    }
}

/// Parse a frequency in whole minutes.
///
/// Accepts a bare integer ("45") or a duration with a unit suffix
/// ("45m", "2h", "1d", "1w"). Zero, negative, fractional or sub-minute
/// values yield `None`.
pub fn parse_frequency(raw: &str) -> Option<u32> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if let Ok(minutes) = s.parse::<u32>() {
        return (minutes > 0).then_some(minutes);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix('m') {
        (n, 1u32)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 1440)
    } else if let Some(n) = s.strip_suffix('w') {
        (n, 10080)
    } else {
        return None;
    };

    num_str
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| n.checked_mul(unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!(parse_frequency("15"), Some(15));
        assert_eq!(parse_frequency("15m"), Some(15));
        assert_eq!(parse_frequency("2h"), Some(120));
        assert_eq!(parse_frequency("1d"), Some(1440));
        assert_eq!(parse_frequency("1w"), Some(10080));
        assert_eq!(parse_frequency(" 30 "), Some(30));
        assert_eq!(parse_frequency("0"), None);
        assert_eq!(parse_frequency("-5"), None);
        assert_eq!(parse_frequency("1.5"), None);
        assert_eq!(parse_frequency("soon"), None);
        assert_eq!(parse_frequency(""), None);
    }

    #[test]
    fn test_fields_default_frequency() {
        let data = ReminderFields::new("Drink water", at(9, 0))
            .every("every now and then")
            .into_data()
            .unwrap();
        assert_eq!(data.frequency, DEFAULT_FREQUENCY_MINUTES);

        let data = ReminderFields::new("Drink water", at(9, 0)).into_data().unwrap();
        assert_eq!(data.frequency, 60);
    }

    #[test]
    fn test_fields_validation() {
        let missing_comment = ReminderFields::new("   ", at(9, 0)).into_data();
        assert!(matches!(missing_comment, Err(NudgeError::Validation(_))));

        let missing_time = ReminderFields {
            comment: "Stretch".into(),
            ..ReminderFields::default()
        }
        .into_data();
        assert!(matches!(missing_time, Err(NudgeError::Validation(_))));
    }

    #[test]
    fn test_wire_format() {
        let data = ReminderFields::new("Stand up", at(10, 30))
            .every("30")
            .until(at(18, 0))
            .into_data()
            .unwrap();

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["comment"], "Stand up");
        assert_eq!(json["datetime"], "2026-03-01T10:30:00Z");
        assert_eq!(json["frequency"], 30);
        assert_eq!(json["disableTime"], "2026-03-01T18:00:00Z");

        let parsed: ReminderData = serde_json::from_str(
            r#"{"comment":"Stand up","datetime":"2026-03-01T10:30:00Z","frequency":30,"disableTime":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.disable_time, None);
        assert_eq!(parsed.datetime, at(10, 30));
    }

    #[test]
    fn test_key_short() {
        let key = ReminderKey::new("0123456789abcdef");
        assert_eq!(key.short(), "01234567");
        assert_eq!(ReminderKey::new("abc").short(), "abc");
        assert_eq!(ReminderKey::generate().as_str().len(), 32);
    }
}
