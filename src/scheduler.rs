//! Reminder service: owns the in-memory reminder set and drives one timer
//! per reminder on a single-threaded event loop.
//!
//! The loop is external. A driver (the daemon, or a test) calls
//! [`ReminderService::sync`] to pull store changes and
//! [`ReminderService::run_due`] to fire whatever is due, sleeping until
//! [`ReminderService::next_wakeup`] in between.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{NudgeError, Result};
use crate::notify::{Notifier, Permission};
use crate::recurrence;
use crate::reminder::{ReminderData, ReminderFields, ReminderKey, Snapshot};
use crate::store::{ReminderStore, Subscription};
use crate::timer::{TimerId, TimerQueue};

/// Title of every reminder notification; the comment is the body
pub const NOTIFICATION_TITLE: &str = "Reminder";

/// Presentation hooks. Both default to no-ops.
pub trait ReminderObserver {
    fn on_reminder_fired(&mut self, _key: &ReminderKey, _reminder: &ReminderData) {}

    fn on_reminder_list_changed(&mut self) {}
}

/// A reminder plus its runtime-only timer handle
#[derive(Debug, Clone)]
pub struct ScheduledReminder {
    data: ReminderData,
    timer: Option<TimerId>,
}

impl ScheduledReminder {
    fn new(data: ReminderData) -> Self {
        Self { data, timer: None }
    }

    pub fn data(&self) -> &ReminderData {
        &self.data
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Timer armed for this instant
    Armed(DateTime<Utc>),
    /// Disable boundary reached; deletion requested
    Removed,
    /// No reminder under that key
    Unknown,
}

/// Display row for one reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderView {
    pub key: ReminderKey,
    pub comment: String,
    pub datetime: DateTime<Utc>,
    pub frequency: u32,
    pub disable_time: Option<DateTime<Utc>>,
    /// Seconds until the next fire, negative when overdue
    pub time_left_secs: i64,
}

impl ReminderView {
    pub fn new(key: &ReminderKey, data: &ReminderData, now: DateTime<Utc>) -> Self {
        Self {
            key: key.clone(),
            comment: data.comment.clone(),
            datetime: data.datetime,
            frequency: data.frequency,
            disable_time: data.disable_time,
            time_left_secs: (data.datetime - now).num_seconds(),
        }
    }

    pub fn time_left(&self) -> Duration {
        Duration::seconds(self.time_left_secs)
    }
}

/// Rows for a raw snapshot, soonest first
pub fn views_of(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<ReminderView> {
    let mut views: Vec<ReminderView> = snapshot
        .iter()
        .map(|(key, data)| ReminderView::new(key, data, now))
        .collect();
    views.sort_by(|a, b| a.datetime.cmp(&b.datetime).then_with(|| a.key.cmp(&b.key)));
    views
}

pub struct ReminderService {
    store: Box<dyn ReminderStore>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    reminders: BTreeMap<ReminderKey, ScheduledReminder>,
    timers: TimerQueue<ReminderKey>,
    /// Keys whose deletion was already requested
    tombstones: BTreeSet<ReminderKey>,
    subscription: Option<Subscription>,
    observers: Vec<Box<dyn ReminderObserver>>,
}

impl ReminderService {
    pub fn new(store: Box<dyn ReminderStore>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            clock: Box::new(SystemClock),
            reminders: BTreeMap::new(),
            timers: TimerQueue::new(),
            tombstones: BTreeSet::new(),
            subscription: None,
            observers: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_observer(mut self, observer: impl ReminderObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Ask for notification permission, subscribe to the store and schedule
    /// everything it currently holds
    pub fn start(&mut self) -> Result<()> {
        let permission = self.notifier.request_permission();
        if permission != Permission::Granted {
            warn!(?permission, "notifications will not be shown");
        }

        if self.subscription.is_none() {
            self.subscription = Some(self.store.subscribe()?);
        }
        self.sync()?;
        info!(reminders = self.reminders.len(), "reminder service started");
        Ok(())
    }

    /// Unsubscribe and drop every timer
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }
        for entry in self.reminders.values_mut() {
            entry.timer = None;
        }
        self.timers.clear();
        self.reminders.clear();
        self.tombstones.clear();
        debug!("reminder service shut down");
    }

    /// Pull pending store changes and reconcile. Returns whether a snapshot
    /// was applied.
    pub fn sync(&mut self) -> Result<bool> {
        self.store.poll_changes()?;
        let Some(snapshot) = self.subscription.as_ref().and_then(Subscription::latest) else {
            return Ok(false);
        };
        self.apply_snapshot(snapshot);
        Ok(true)
    }

    /// Reconcile with an authoritative snapshot, diffing by key.
    ///
    /// Unchanged reminders keep their pending timer; changed ones are
    /// cancelled and rescheduled; missing ones are dropped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let mut changed = false;

        let gone: Vec<ReminderKey> = self
            .reminders
            .keys()
            .filter(|key| !snapshot.contains_key(*key))
            .cloned()
            .collect();
        for key in gone {
            debug!(key = %key, "reminder no longer in store");
            self.cancel(&key);
            self.reminders.remove(&key);
            changed = true;
        }
        self.tombstones.retain(|key| snapshot.contains_key(key));

        for (key, data) in snapshot {
            if self.tombstones.contains(&key) {
                debug!(key = %key, "ignoring reminder pending deletion");
                continue;
            }
            if self.reminders.get(&key).is_some_and(|existing| existing.data == data) {
                continue;
            }
            if let Err(e) = data.validate() {
                // A bad record replaces whatever we held for the key
                warn!(key = %key, error = %e, "ignoring invalid reminder from store");
                self.cancel(&key);
                changed |= self.reminders.remove(&key).is_some();
                continue;
            }

            debug!(key = %key, "reminder added or changed in store");
            self.cancel(&key);
            self.reminders.insert(key.clone(), ScheduledReminder::new(data));
            self.schedule(&key);
            changed = true;
        }

        if changed {
            self.notify_list_changed();
        }
    }

    /// Arm the timer for a reminder, removing it instead if its disable
    /// boundary has passed
    pub fn schedule(&mut self, key: &ReminderKey) -> ScheduleOutcome {
        let now = self.clock.now();
        let Some(entry) = self.reminders.get_mut(key) else {
            return ScheduleOutcome::Unknown;
        };

        if recurrence::should_disable(&entry.data, now) {
            info!(key = %key, "disable time reached, removing reminder");
            // Failure already logged; the timer is gone either way
            let _ = self.remove(key);
            return ScheduleOutcome::Removed;
        }

        let normalized = recurrence::normalize_if_past(&mut entry.data, now);

        if let Some(previous) = entry.timer.take() {
            self.timers.cancel(previous);
        }
        let at = entry.data.datetime;
        entry.timer = Some(self.timers.arm(at, key.clone()));
        debug!(key = %key, at = %at, "timer armed");

        if normalized {
            debug!(key = %key, "scheduled time had passed, moved forward one period");
            let _ = self.persist(key);
        }
        ScheduleOutcome::Armed(at)
    }

    /// Drop the pending timer, if any
    pub fn cancel(&mut self, key: &ReminderKey) {
        if let Some(timer) = self.reminders.get_mut(key).and_then(|entry| entry.timer.take()) {
            self.timers.cancel(timer);
            debug!(key = %key, "timer cancelled");
        }
    }

    /// Cancel the timer, forget the reminder locally and request deletion
    /// from the store. Deletion is requested at most once per key.
    pub fn remove(&mut self, key: &ReminderKey) -> Result<()> {
        self.cancel(key);
        let was_present = self.reminders.remove(key).is_some();
        if !self.tombstones.insert(key.clone()) {
            return Ok(());
        }

        let result = self.store.write(key, None);
        if let Err(e) = &result {
            error!(key = %key, error = %e, "failed to delete reminder from store");
        }
        if was_present {
            self.notify_list_changed();
        }
        result
    }

    /// Fire every timer that is due. Returns how many reminders fired.
    pub fn run_due(&mut self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let Some((timer, key)) = self.timers.pop_due(now) else {
                break;
            };
            let current = self.reminders.get(&key).and_then(|entry| entry.timer);
            if current != Some(timer) {
                debug!(key = %key, "dropping stale timer");
                continue;
            }
            if self.fire(&key) {
                fired += 1;
            }
        }
        fired
    }

    fn fire(&mut self, key: &ReminderKey) -> bool {
        let now = self.clock.now();
        let Some(entry) = self.reminders.get_mut(key) else {
            return false;
        };
        entry.timer = None;

        if recurrence::should_disable(&entry.data, now) {
            info!(key = %key, "disable time reached before firing, removing reminder");
            let _ = self.remove(key);
            return false;
        }

        let comment = entry.data.comment.clone();
        recurrence::advance(&mut entry.data);
        info!(key = %key, comment = %comment, "reminder fired");

        self.deliver(&comment);
        let _ = self.persist(key);
        self.schedule(key);

        if let Some(entry) = self.reminders.get(key) {
            for observer in self.observers.iter_mut() {
                observer.on_reminder_fired(key, &entry.data);
            }
        }
        true
    }

    /// Show a notification; failures are logged and never stop recurrence
    fn deliver(&self, comment: &str) {
        match self.notifier.permission() {
            Permission::Granted => {
                if let Err(e) = self.notifier.show(NOTIFICATION_TITLE, comment) {
                    warn!(error = %e, "notification failed");
                }
            }
            permission => warn!(?permission, comment, "notification not shown"),
        }
    }

    fn persist(&mut self, key: &ReminderKey) -> Result<()> {
        let Some(entry) = self.reminders.get(key) else {
            return Ok(());
        };
        self.store.write(key, Some(&entry.data)).map_err(|e| {
            error!(key = %key, error = %e, "failed to persist reminder");
            e
        })
    }

    fn notify_list_changed(&mut self) {
        for observer in self.observers.iter_mut() {
            observer.on_reminder_list_changed();
        }
    }

    /// Validate, persist under a fresh key and schedule a new reminder
    pub fn create(&mut self, fields: ReminderFields) -> Result<ReminderKey> {
        let data = fields.into_data()?;
        let key = self.store.generate_key();
        if let Err(e) = self.store.write(&key, Some(&data)) {
            error!(key = %key, error = %e, "failed to persist new reminder");
            return Err(e);
        }
        info!(key = %key, comment = %data.comment, "reminder created");

        self.reminders.insert(key.clone(), ScheduledReminder::new(data));
        self.schedule(&key);
        self.notify_list_changed();
        Ok(key)
    }

    /// Replace a reminder's fields in place and reschedule it
    pub fn edit(&mut self, key: &ReminderKey, fields: ReminderFields) -> Result<()> {
        let data = fields.into_data()?;
        if !self.reminders.contains_key(key) {
            return Err(NudgeError::ReminderNotFound(key.to_string()));
        }

        // Cancel before touching anything so the old timer can never fire
        // with the new fields
        self.cancel(key);
        if let Some(entry) = self.reminders.get_mut(key) {
            entry.data = data;
        }
        info!(key = %key, "reminder edited");

        let persisted = self.persist(key);
        self.schedule(key);
        self.notify_list_changed();
        persisted
    }

    /// User-initiated deletion
    pub fn delete(&mut self, key: &ReminderKey) -> Result<()> {
        if !self.reminders.contains_key(key) {
            return Err(NudgeError::ReminderNotFound(key.to_string()));
        }
        info!(key = %key, "reminder deleted");
        self.remove(key)
    }

    /// Resolve user input to a key: exact key, unique key prefix, or exact comment
    pub fn find(&self, needle: &str) -> Result<ReminderKey> {
        let needle = needle.trim();
        let exact = ReminderKey::from(needle);
        if self.reminders.contains_key(&exact) {
            return Ok(exact);
        }

        let by_prefix: Vec<&ReminderKey> = self
            .reminders
            .keys()
            .filter(|key| !needle.is_empty() && key.as_str().starts_with(needle))
            .collect();
        let by_comment: Vec<&ReminderKey> = self
            .reminders
            .iter()
            .filter(|(_, entry)| entry.data.comment == needle)
            .map(|(key, _)| key)
            .collect();

        match (by_prefix.as_slice(), by_comment.as_slice()) {
            ([key], _) | ([], [key]) => Ok((*key).clone()),
            ([], []) => Err(NudgeError::ReminderNotFound(needle.to_string())),
            _ => Err(NudgeError::Validation(format!(
                "'{}' matches more than one reminder, use the key",
                needle
            ))),
        }
    }

    pub fn get(&self, key: &ReminderKey) -> Option<&ScheduledReminder> {
        self.reminders.get(key)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// Number of armed timers across all reminders
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// When the armed timer for `key` will fire
    pub fn timer_deadline(&self, key: &ReminderKey) -> Option<DateTime<Utc>> {
        let timer = self.reminders.get(key)?.timer?;
        self.timers.deadline(timer)
    }

    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// How long the event loop may sleep before the next timer is due
    pub fn time_until_next(&self) -> Option<std::time::Duration> {
        let deadline = self.next_wakeup()?;
        Some(
            (deadline - self.clock.now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO),
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Display rows, soonest first
    pub fn views(&self) -> Vec<ReminderView> {
        let now = self.clock.now();
        let mut views: Vec<ReminderView> = self
            .reminders
            .iter()
            .map(|(key, entry)| ReminderView::new(key, &entry.data, now))
            .collect();
        views.sort_by(|a, b| a.datetime.cmp(&b.datetime).then_with(|| a.key.cmp(&b.key)));
        views
    }
}

impl Drop for ReminderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SilentNotifier;

    impl Notifier for SilentNotifier {
        fn request_permission(&mut self) -> Permission {
            Permission::Granted
        }

        fn permission(&self) -> Permission {
            Permission::Granted
        }

        fn show(&self, _title: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct CountingObserver {
        fired: Rc<RefCell<Vec<ReminderKey>>>,
        list_changes: Rc<RefCell<usize>>,
    }

    impl ReminderObserver for CountingObserver {
        fn on_reminder_fired(&mut self, key: &ReminderKey, _reminder: &ReminderData) {
            self.fired.borrow_mut().push(key.clone());
        }

        fn on_reminder_list_changed(&mut self) {
            *self.list_changes.borrow_mut() += 1;
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
    }

    fn service(store: &MemoryStore, clock: &ManualClock) -> ReminderService {
        ReminderService::new(Box::new(store.clone()), Box::new(SilentNotifier))
            .with_clock(clock.clone())
    }

    fn data(comment: &str, datetime: DateTime<Utc>, frequency: u32) -> ReminderData {
        ReminderData {
            comment: comment.into(),
            datetime,
            frequency,
            disable_time: None,
        }
    }

    #[test]
    fn test_unchanged_snapshot_keeps_timer() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut svc = service(&store, &clock);
        svc.start().unwrap();

        let key = svc
            .create(ReminderFields::new("Stretch", t0() + Duration::minutes(10)))
            .unwrap();
        let armed = svc.get(&key).unwrap().timer;

        // Our own write echoes back identical data
        assert!(svc.sync().unwrap());
        assert_eq!(svc.get(&key).unwrap().timer, armed);
        assert_eq!(svc.pending_timers(), 1);
    }

    #[test]
    fn test_external_change_rearms() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut svc = service(&store, &clock);
        svc.start().unwrap();

        let key = svc
            .create(ReminderFields::new("Stretch", t0() + Duration::minutes(10)))
            .unwrap();
        svc.sync().unwrap();

        store.external_write(&key, Some(data("Stretch", t0() + Duration::minutes(3), 5)));
        svc.sync().unwrap();
        assert_eq!(svc.timer_deadline(&key), Some(t0() + Duration::minutes(3)));
        assert_eq!(svc.pending_timers(), 1);

        store.external_write(&key, None);
        svc.sync().unwrap();
        assert!(svc.get(&key).is_none());
        assert_eq!(svc.pending_timers(), 0);
    }

    #[test]
    fn test_tombstoned_key_is_not_rescheduled() {
        let mut records = Snapshot::new();
        let key = ReminderKey::from("expired");
        let mut expired = data("Old", t0() - Duration::hours(1), 30);
        expired.disable_time = Some(t0() - Duration::minutes(1));
        records.insert(key.clone(), expired.clone());

        let store = MemoryStore::with_records(records);
        store.set_fail_writes(true);
        let clock = ManualClock::new(t0());
        let mut svc = service(&store, &clock);
        svc.start().unwrap();

        assert!(svc.get(&key).is_none());
        assert_eq!(store.delete_requests(&key), 1);

        // The record is still in the store; another snapshot must not retry
        store.external_write(&ReminderKey::from("other"), Some(data("New", t0() + Duration::hours(1), 60)));
        svc.sync().unwrap();
        assert_eq!(store.delete_requests(&key), 1);
        assert!(svc.get(&key).is_none());
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_find_by_key_prefix_and_comment() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut svc = service(&store, &clock);
        svc.start().unwrap();

        let first = svc
            .create(ReminderFields::new("Feed the cat", t0() + Duration::minutes(5)))
            .unwrap();
        let second = svc
            .create(ReminderFields::new("Water plants", t0() + Duration::minutes(5)))
            .unwrap();

        assert_eq!(svc.find(first.as_str()).unwrap(), first);
        assert_eq!(svc.find("Water plants").unwrap(), second);
        assert!(matches!(svc.find("key-"), Err(NudgeError::Validation(_))));
        assert!(matches!(svc.find("nothing"), Err(NudgeError::ReminderNotFound(_))));
    }

    #[test]
    fn test_observers_and_views() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let observer = CountingObserver::default();
        let mut svc = service(&store, &clock).with_observer(observer.clone());
        svc.start().unwrap();

        let later = svc
            .create(ReminderFields::new("Later", t0() + Duration::minutes(30)))
            .unwrap();
        let sooner = svc
            .create(ReminderFields::new("Sooner", t0() + Duration::minutes(2)).every("15"))
            .unwrap();
        assert_eq!(*observer.list_changes.borrow(), 2);

        let views = svc.views();
        assert_eq!(views[0].key, sooner);
        assert_eq!(views[0].time_left(), Duration::minutes(2));
        assert_eq!(views[1].key, later);

        clock.advance(Duration::minutes(2));
        assert_eq!(svc.run_due(), 1);
        assert_eq!(*observer.fired.borrow(), vec![sooner.clone()]);
        assert_eq!(svc.views()[0].time_left(), Duration::minutes(15));
    }

    #[test]
    fn test_shutdown_unsubscribes() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(t0());
        let mut svc = service(&store, &clock);
        svc.start().unwrap();
        svc.create(ReminderFields::new("Stretch", t0() + Duration::minutes(1)))
            .unwrap();
        assert_eq!(store.subscriber_count(), 1);

        svc.shutdown();
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(svc.pending_timers(), 0);
        assert!(svc.is_empty());
        assert!(svc.next_wakeup().is_none());
    }
}
