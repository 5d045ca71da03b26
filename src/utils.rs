//! Shared utility functions

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, Utc};

/// Unified duration parser - supports "30s", "5m", "2h", "1d", "1w" or plain seconds
pub fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    // Try to parse as pure number (seconds)
    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix('s') {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600u64)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 86400u64)
    } else if let Some(n) = s.strip_suffix('w') {
        (n, 604800u64)
    } else {
        return None;
    };

    num_str.parse::<u64>().ok().and_then(|n| n.checked_mul(unit))
}

/// Now plus a duration string, for `--in`
pub fn parse_in(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(parse_duration(s)?).ok()?;
    now.checked_add_signed(Duration::try_seconds(secs)?)
}

/// Parse a WHEN argument: RFC3339, local "YYYY-MM-DD HH:MM", or "HH:MM" (next occurrence)
pub fn parse_when(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return naive
                .and_local_timezone(Local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    parse_time_to_next(s)
}

/// Parse time string (HH:MM) to next occurrence as DateTime<Utc>
pub fn parse_time_to_next(time_str: &str) -> Option<DateTime<Utc>> {
    let target_time = NaiveTime::parse_from_str(time_str.trim(), "%H:%M").ok()?;
    let now = Local::now();
    let today = now.date_naive();

    // Try today first, then tomorrow
    let today_at = today.and_time(target_time).and_local_timezone(Local).single()?;
    let target = if today_at > now {
        today_at
    } else {
        today
            .succ_opt()?
            .and_time(target_time)
            .and_local_timezone(Local)
            .single()?
    };

    Some(target.with_timezone(&Utc))
}

/// Format minutes as a human-readable interval (e.g., "45m", "2h", "1d")
pub fn format_frequency(minutes: u32) -> String {
    if minutes >= 10080 && minutes % 10080 == 0 {
        format!("{}w", minutes / 10080)
    } else if minutes >= 1440 && minutes % 1440 == 0 {
        format!("{}d", minutes / 1440)
    } else if minutes >= 60 && minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Format time left until a fire, e.g. "in 1h 5m", "in 40s" or "overdue 3m"
pub fn format_time_left(left: Duration) -> String {
    let overdue = left < Duration::zero();
    let secs = left.num_seconds().unsigned_abs();

    let text = if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let (h, m) = (secs / 3600, (secs % 3600) / 60);
        if m == 0 { format!("{}h", h) } else { format!("{}h {}m", h, m) }
    } else {
        let (d, h) = (secs / 86400, (secs % 86400) / 3600);
        if h == 0 { format!("{}d", d) } else { format!("{}d {}h", d, h) }
    };

    if overdue {
        format!("overdue {}", text)
    } else {
        format!("in {}", text)
    }
}

/// Local wall-clock rendering used in listings
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to max_len characters (not bytes), adding "..." if truncated.
/// Safe for non-ASCII content (emoji, CJK, etc).
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(30));
        assert_eq!(parse_duration("5m"), Some(300));
        assert_eq!(parse_duration("2h"), Some(7200));
        assert_eq!(parse_duration("1d"), Some(86400));
        assert_eq!(parse_duration("1w"), Some(604800));
        assert_eq!(parse_duration("300"), Some(300));
        assert_eq!(parse_duration("invalid"), None);
    }

    #[test]
    fn test_parse_in() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_in("90m", now), Some(now + Duration::minutes(90)));
        assert_eq!(parse_in("soon", now), None);
    }

    #[test]
    fn test_parse_when() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 1, 7, 30, 0).unwrap();
        assert_eq!(parse_when("2026-10-01T09:30:00+02:00"), Some(expected));
        assert!(parse_when("2026-10-01 09:30").is_some());
        assert!(parse_when("not a time").is_none());

        let next = parse_when("06:15").unwrap();
        assert!(next > Utc::now());
        assert!(next - Utc::now() <= Duration::hours(25));
    }

    #[test]
    fn test_format_frequency() {
        assert_eq!(format_frequency(45), "45m");
        assert_eq!(format_frequency(60), "1h");
        assert_eq!(format_frequency(90), "90m");
        assert_eq!(format_frequency(1440), "1d");
        assert_eq!(format_frequency(10080), "1w");
    }

    #[test]
    fn test_format_time_left() {
        assert_eq!(format_time_left(Duration::seconds(40)), "in 40s");
        assert_eq!(format_time_left(Duration::minutes(65)), "in 1h 5m");
        assert_eq!(format_time_left(Duration::hours(2)), "in 2h");
        assert_eq!(format_time_left(Duration::hours(26)), "in 1d 2h");
        assert_eq!(format_time_left(Duration::minutes(-3)), "overdue 3m");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("ab", 3), "ab");
    }
}
