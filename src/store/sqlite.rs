use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::{ReminderStore, Subscribers, Subscription};
use crate::config::Config;
use crate::error::{NudgeError, Result};
use crate::reminder::{ReminderData, ReminderKey, Snapshot};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// SQLite-backed reminder store.
///
/// Several processes may open the same file (the daemon and one-off CLI
/// invocations). Commits from other connections are picked up by
/// [`ReminderStore::poll_changes`] via `PRAGMA data_version`.
pub struct SqliteStore {
    conn: Connection,
    subscribers: Subscribers,
    data_version: i64,
}

impl SqliteStore {
    /// Open or create the database at the configured location
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        Self::open_at(&db_path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        embedded::migrations::runner().run(&mut conn)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let data_version = Self::read_data_version(&conn)?;
        Ok(Self {
            conn,
            subscribers: Subscribers::default(),
            data_version,
        })
    }

    fn read_data_version(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }

    fn publish(&mut self) -> Result<()> {
        if self.subscribers.is_empty() {
            return Ok(());
        }
        let snapshot = self.load()?;
        self.subscribers.publish(&snapshot);
        Ok(())
    }
}

impl ReminderStore for SqliteStore {
    fn load(&self) -> Result<Snapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT key, comment, datetime, frequency, disable_time
             FROM reminders ORDER BY datetime ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut snapshot = Snapshot::new();
        for row in rows {
            let (key, comment, datetime, frequency, disable_time) = row?;
            match decode_record(&key, comment, &datetime, frequency, disable_time.as_deref()) {
                Ok(data) => {
                    snapshot.insert(ReminderKey::new(key), data);
                }
                Err(e) => warn!(key = %key, error = %e, "skipping malformed reminder row"),
            }
        }
        Ok(snapshot)
    }

    fn subscribe(&mut self) -> Result<Subscription> {
        let snapshot = self.load()?;
        Ok(self.subscribers.register(snapshot))
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.remove(subscription.id());
    }

    fn write(&mut self, key: &ReminderKey, value: Option<&ReminderData>) -> Result<()> {
        match value {
            Some(data) => {
                data.validate()?;
                self.conn.execute(
                    "INSERT INTO reminders (key, comment, datetime, frequency, disable_time, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(key) DO UPDATE SET
                        comment = excluded.comment,
                        datetime = excluded.datetime,
                        frequency = excluded.frequency,
                        disable_time = excluded.disable_time,
                        updated_at = excluded.updated_at",
                    params![
                        key.as_str(),
                        data.comment,
                        format_timestamp(data.datetime),
                        i64::from(data.frequency),
                        data.disable_time.map(format_timestamp),
                        Utc::now().timestamp(),
                    ],
                )?;
            }
            None => {
                self.conn.execute(
                    "DELETE FROM reminders WHERE key = ?1",
                    params![key.as_str()],
                )?;
            }
        }
        self.publish()
    }

    fn poll_changes(&mut self) -> Result<bool> {
        let version = Self::read_data_version(&self.conn)?;
        if version == self.data_version {
            return Ok(false);
        }
        debug!(from = self.data_version, to = version, "database changed by another client");
        self.data_version = version;
        self.publish()?;
        Ok(true)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NudgeError::InvalidRecord {
            key: key.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

fn decode_record(
    key: &str,
    comment: String,
    datetime: &str,
    frequency: i64,
    disable_time: Option<&str>,
) -> Result<ReminderData> {
    let frequency = u32::try_from(frequency)
        .ok()
        .filter(|f| *f > 0)
        .ok_or_else(|| NudgeError::InvalidRecord {
            key: key.to_string(),
            reason: format!("frequency {} is not a positive number of minutes", frequency),
        })?;

    Ok(ReminderData {
        comment,
        datetime: parse_timestamp(key, datetime)?,
        frequency,
        disable_time: disable_time.map(|raw| parse_timestamp(key, raw)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(comment: &str) -> ReminderData {
        ReminderData {
            comment: comment.into(),
            datetime: Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap()
                + Duration::nanoseconds(123_456_789),
            frequency: 45,
            disable_time: Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_write_load_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let key = store.generate_key();

        store.write(&key, Some(&sample("Stretch"))).unwrap();
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.len(), 1);
        // Sub-second precision survives so snapshots compare equal to what was written
        assert_eq!(snapshot[&key], sample("Stretch"));

        store.write(&key, Some(&sample("Stretch more"))).unwrap();
        assert_eq!(store.load().unwrap()[&key].comment, "Stretch more");

        store.write(&key, None).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_invalid_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut data = sample("");
        data.comment = "  ".into();
        let result = store.write(&ReminderKey::from("k"), Some(&data));
        assert!(matches!(result, Err(NudgeError::Validation(_))));
    }

    #[test]
    fn test_subscribe_delivers_current_then_changes() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let key = ReminderKey::from("first");
        store.write(&key, Some(&sample("Before subscribe"))).unwrap();

        let sub = store.subscribe().unwrap();
        assert_eq!(sub.latest().unwrap().len(), 1);

        store.write(&ReminderKey::from("second"), Some(&sample("After"))).unwrap();
        assert_eq!(sub.latest().unwrap().len(), 2);

        store.unsubscribe(sub);
        store.write(&key, None).unwrap();
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.write(&ReminderKey::from("good"), Some(&sample("Fine"))).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO reminders (key, comment, datetime, frequency, disable_time, updated_at)
                 VALUES ('bad', 'Broken', 'not a time', 10, NULL, 0)",
                [],
            )
            .unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&ReminderKey::from("good")));
    }

    #[test]
    fn test_poll_detects_other_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nudge.db");

        let mut cli = SqliteStore::open_at(&path).unwrap();
        let mut daemon = SqliteStore::open_at(&path).unwrap();

        let sub = daemon.subscribe().unwrap();
        assert!(sub.latest().unwrap().is_empty());
        assert!(!daemon.poll_changes().unwrap());

        cli.write(&ReminderKey::from("from-cli"), Some(&sample("Pay rent")))
            .unwrap();

        assert!(daemon.poll_changes().unwrap());
        let snapshot = sub.latest().unwrap();
        assert_eq!(snapshot[&ReminderKey::from("from-cli")].comment, "Pay rent");
        assert!(!daemon.poll_changes().unwrap());
    }
}
