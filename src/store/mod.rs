//! Persistence boundary for reminders.
//!
//! A store holds the authoritative reminder set and broadcasts the whole set
//! to its subscribers whenever it changes. Subscriptions are plain channels:
//! the subscriber drains them from its own event loop, so no callback ever
//! runs re-entrantly inside a write.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoreWrite};
pub use sqlite::SqliteStore;

use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::Result;
use crate::reminder::{ReminderData, ReminderKey, Snapshot};

/// Store gateway consumed by the scheduler
pub trait ReminderStore {
    /// Current full set of reminders
    fn load(&self) -> Result<Snapshot>;

    /// Register for change notifications. The current snapshot is queued on
    /// the returned subscription right away.
    fn subscribe(&mut self) -> Result<Subscription>;

    fn unsubscribe(&mut self, subscription: Subscription);

    /// Upsert the record at `key`; `None` deletes it
    fn write(&mut self, key: &ReminderKey, value: Option<&ReminderData>) -> Result<()>;

    /// Allocate a key for a record that has not been written yet
    fn generate_key(&mut self) -> ReminderKey {
        ReminderKey::generate()
    }

    /// Look for changes made by other clients and publish them.
    /// Returns whether anything changed.
    fn poll_changes(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Receiving end of a store subscription
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<Snapshot>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Drain queued snapshots and keep only the newest one.
    /// Every snapshot is complete, so older ones carry no extra information.
    pub fn latest(&self) -> Option<Snapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.receiver.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

/// Sender side bookkeeping shared by the store implementations
#[derive(Debug, Default)]
pub struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, Sender<Snapshot>)>,
}

impl Subscribers {
    pub fn register(&mut self, initial: Snapshot) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_id;
        self.next_id += 1;
        // Cannot fail: the receiver is alive in this scope
        let _ = sender.send(initial);
        self.senders.push((id, sender));
        Subscription { id, receiver }
    }

    pub fn remove(&mut self, id: u64) {
        self.senders.retain(|(existing, _)| *existing != id);
    }

    /// Send to every live subscriber, dropping the ones whose receiver is gone
    pub fn publish(&mut self, snapshot: &Snapshot) {
        self.senders
            .retain(|(_, sender)| sender.send(snapshot.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot_with(comment: &str) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ReminderKey::from("k1"),
            ReminderData {
                comment: comment.into(),
                datetime: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
                frequency: 60,
                disable_time: None,
            },
        );
        snapshot
    }

    #[test]
    fn test_subscription_gets_initial_and_latest() {
        let mut subscribers = Subscribers::default();
        let sub = subscribers.register(Snapshot::new());

        subscribers.publish(&snapshot_with("first"));
        subscribers.publish(&snapshot_with("second"));

        let latest = sub.latest().unwrap();
        assert_eq!(latest[&ReminderKey::from("k1")].comment, "second");
        assert!(sub.latest().is_none());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let mut subscribers = Subscribers::default();
        let kept = subscribers.register(Snapshot::new());
        let dropped = subscribers.register(Snapshot::new());
        assert_eq!(subscribers.len(), 2);

        drop(dropped);
        subscribers.publish(&Snapshot::new());
        assert_eq!(subscribers.len(), 1);

        subscribers.remove(kept.id());
        assert!(subscribers.is_empty());
    }
}
