use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::{ReminderStore, Subscribers, Subscription};
use crate::error::{NudgeError, Result};
use crate::reminder::{ReminderData, ReminderKey, Snapshot};

/// One write attempt seen by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub key: ReminderKey,
    pub value: Option<ReminderData>,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: Snapshot,
    subscribers: Subscribers,
    next_key: u64,
    fail_writes: bool,
    writes: Vec<StoreWrite>,
}

/// In-process store for headless runs and tests.
///
/// Clones share state, so one handle can be given to the scheduler while
/// another plays "another client" or inspects what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Snapshot) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().records = records;
        store
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    pub fn get(&self, key: &ReminderKey) -> Option<ReminderData> {
        self.inner.borrow().records.get(key).cloned()
    }

    /// Every write attempt so far, in order
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.inner.borrow().writes.clone()
    }

    /// Number of delete requests issued for `key`
    pub fn delete_requests(&self, key: &ReminderKey) -> usize {
        self.inner
            .borrow()
            .writes
            .iter()
            .filter(|w| &w.key == key && w.value.is_none())
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Apply a change as if it came from another client, bypassing the
    /// write log and failure injection
    pub fn external_write(&self, key: &ReminderKey, value: Option<ReminderData>) {
        let mut inner = self.inner.borrow_mut();
        match value {
            Some(data) => {
                inner.records.insert(key.clone(), data);
            }
            None => {
                inner.records.remove(key);
            }
        }
        let snapshot = inner.records.clone();
        inner.subscribers.publish(&snapshot);
    }
}

impl ReminderStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.inner.borrow().records.clone())
    }

    fn subscribe(&mut self) -> Result<Subscription> {
        let mut inner = self.inner.borrow_mut();
        let snapshot = inner.records.clone();
        Ok(inner.subscribers.register(snapshot))
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.inner.borrow_mut().subscribers.remove(subscription.id());
    }

    fn write(&mut self, key: &ReminderKey, value: Option<&ReminderData>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let succeeded = !inner.fail_writes;
        inner.writes.push(StoreWrite {
            key: key.clone(),
            value: value.cloned(),
            succeeded,
        });
        if !succeeded {
            return Err(NudgeError::StoreError(format!("write to '{}' rejected", key)));
        }

        match value {
            Some(data) => {
                data.validate()?;
                inner.records.insert(key.clone(), data.clone());
            }
            None => {
                inner.records.remove(key);
            }
        }
        debug!(key = %key, deleted = value.is_none(), "memory store write");
        let snapshot = inner.records.clone();
        inner.subscribers.publish(&snapshot);
        Ok(())
    }

    fn generate_key(&mut self) -> ReminderKey {
        let mut inner = self.inner.borrow_mut();
        inner.next_key += 1;
        ReminderKey::new(format!("key-{:04}", inner.next_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn data() -> ReminderData {
        ReminderData {
            comment: "Check the oven".into(),
            datetime: Utc.with_ymd_and_hms(2026, 4, 4, 18, 0, 0).unwrap(),
            frequency: 10,
            disable_time: None,
        }
    }

    #[test]
    fn test_clones_share_state() {
        let mut store = MemoryStore::new();
        let observer = store.clone();
        let key = store.generate_key();
        assert_eq!(key.as_str(), "key-0001");

        store.write(&key, Some(&data())).unwrap();
        assert_eq!(observer.get(&key), Some(data()));
        assert_eq!(observer.writes().len(), 1);
    }

    #[test]
    fn test_failed_writes_are_logged_but_not_applied() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let key = ReminderKey::from("k");

        assert!(matches!(
            store.write(&key, Some(&data())),
            Err(NudgeError::StoreError(_))
        ));
        assert!(store.get(&key).is_none());
        assert!(!store.writes()[0].succeeded);
    }

    #[test]
    fn test_external_write_reaches_subscribers() {
        let mut store = MemoryStore::new();
        let sub = store.subscribe().unwrap();
        assert!(sub.latest().unwrap().is_empty());

        store.external_write(&ReminderKey::from("remote"), Some(data()));
        assert_eq!(sub.latest().unwrap().len(), 1);
        assert!(store.writes().is_empty());

        store.unsubscribe(sub);
        assert_eq!(store.subscriber_count(), 0);
    }
}
