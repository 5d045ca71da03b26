//! Deadline queue backing the single-threaded timer driver.
//!
//! Each armed timer gets a fresh [`TimerId`]; cancelling an id that already
//! fired or was cancelled is a no-op. Timers with equal deadlines fire in
//! arming order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

/// Handle to one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    by_deadline: BTreeMap<(DateTime<Utc>, TimerId), T>,
    deadlines: HashMap<TimerId, DateTime<Utc>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_deadline: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, deadline: DateTime<Utc>, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.by_deadline.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Remove a pending timer, returning its payload if it was still armed
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id)?;
        self.by_deadline.remove(&(deadline, id))
    }

    pub fn deadline(&self, id: TimerId) -> Option<DateTime<Utc>> {
        self.deadlines.get(&id).copied()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.by_deadline.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerId, T)> {
        let (deadline, id) = *self.by_deadline.keys().next()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.by_deadline.remove(&(deadline, id)).map(|payload| (id, payload))
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_deadline.clear();
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.arm(t0() + Duration::minutes(10), "late");
        queue.arm(t0() + Duration::minutes(1), "early");
        queue.arm(t0() + Duration::minutes(1), "early-second");

        assert_eq!(queue.next_deadline(), Some(t0() + Duration::minutes(1)));
        assert!(queue.pop_due(t0()).is_none());

        let now = t0() + Duration::minutes(5);
        assert_eq!(queue.pop_due(now).map(|(_, p)| p), Some("early"));
        assert_eq!(queue.pop_due(now).map(|(_, p)| p), Some("early-second"));
        assert!(queue.pop_due(now).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        let id = queue.arm(t0(), 1);
        assert_eq!(queue.deadline(id), Some(t0()));
        assert_eq!(queue.cancel(id), Some(1));
        assert_eq!(queue.cancel(id), None);
        assert!(queue.deadline(id).is_none());
        assert!(queue.is_empty());
        assert!(queue.pop_due(t0() + Duration::hours(1)).is_none());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut queue = TimerQueue::new();
        let first = queue.arm(t0(), ());
        queue.cancel(first);
        let second = queue.arm(t0(), ());
        assert_ne!(first, second);
        assert!(queue.deadline(first).is_none());
        assert_eq!(queue.deadline(second), Some(t0()));
    }
}
