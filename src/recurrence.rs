//! Pure recurrence rules: when a reminder is done, when it is stale, and
//! where its next occurrence lands. Nothing here touches a clock or a store;
//! callers pass `now` in.

use chrono::{DateTime, Utc};

use crate::reminder::ReminderData;

/// True once the disable boundary has been reached
pub fn should_disable(reminder: &ReminderData, now: DateTime<Utc>) -> bool {
    reminder.disable_time.is_some_and(|disable_at| now >= disable_at)
}

/// Push an elapsed schedule to one period from now.
///
/// A reminder loaded long after its time would otherwise fire immediately
/// (once, or once per missed period). Returns whether `datetime` changed;
/// afterwards `datetime > now` always holds.
pub fn normalize_if_past(reminder: &mut ReminderData, now: DateTime<Utc>) -> bool {
    if reminder.datetime - now > chrono::Duration::zero() {
        return false;
    }
    reminder.datetime = now + reminder.frequency_duration();
    true
}

/// Move to the next occurrence after a fire.
///
/// Anchored to the previously scheduled time, not to when the callback
/// actually ran, so late timers do not shift the cadence.
pub fn advance(reminder: &mut ReminderData) {
    reminder.datetime += reminder.frequency_duration();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    fn reminder(datetime: DateTime<Utc>, frequency: u32) -> ReminderData {
        ReminderData {
            comment: "Water the plants".into(),
            datetime,
            frequency,
            disable_time: None,
        }
    }

    #[test]
    fn test_should_disable_boundary() {
        let mut r = reminder(now(), 60);
        assert!(!should_disable(&r, now()));

        r.disable_time = Some(now() + Duration::seconds(1));
        assert!(!should_disable(&r, now()));

        // Reaching the boundary exactly counts as passed
        r.disable_time = Some(now());
        assert!(should_disable(&r, now()));

        r.disable_time = Some(now() - Duration::minutes(1));
        assert!(should_disable(&r, now()));
    }

    #[test]
    fn test_normalize_future_untouched() {
        let mut r = reminder(now() + Duration::minutes(5), 60);
        assert!(!normalize_if_past(&mut r, now()));
        assert_eq!(r.datetime, now() + Duration::minutes(5));
    }

    #[test]
    fn test_normalize_stale_reminder() {
        let mut r = reminder(now() - Duration::hours(2), 30);
        assert!(normalize_if_past(&mut r, now()));
        assert_eq!(r.datetime, now() + Duration::minutes(30));
    }

    #[test]
    fn test_normalize_exactly_now() {
        let mut r = reminder(now(), 15);
        assert!(normalize_if_past(&mut r, now()));
        assert!(r.datetime > now());
        assert!(r.datetime - now() <= Duration::minutes(15));
    }

    #[test]
    fn test_normalize_bounds_hold_for_many_offsets() {
        for minutes_ago in [0i64, 1, 59, 60, 61, 1440, 100_000] {
            for frequency in [1u32, 7, 60, 1440] {
                let mut r = reminder(now() - Duration::minutes(minutes_ago), frequency);
                normalize_if_past(&mut r, now());
                assert!(r.datetime > now());
                assert!(r.datetime - now() <= Duration::minutes(i64::from(frequency)));
            }
        }
    }

    #[test]
    fn test_advance_is_anchored_to_schedule() {
        let scheduled = now() - Duration::seconds(7);
        let mut r = reminder(scheduled, 60);
        advance(&mut r);
        assert_eq!(r.datetime, scheduled + Duration::minutes(60));

        advance(&mut r);
        assert_eq!(r.datetime, scheduled + Duration::minutes(120));
    }
}
