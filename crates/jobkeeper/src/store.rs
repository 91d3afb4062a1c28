//! Embedded durable store for job records.
//!
//! One SQLite table maps job name to its serialized record. Every mutation
//! runs inside a single transaction; the scan visits keys in ascending
//! order. Keys and values are opaque text from the manager's perspective.

use crate::error::JobResult;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        name   TEXT PRIMARY KEY,
        record TEXT NOT NULL
    );
";

/// SQLite-backed key/value store, keyed by job name.
pub struct JobStore {
    conn: Mutex<Connection>,
}

impl JobStore {
    /// Opens or creates the store database at `path`.
    pub fn open(path: impl AsRef<Path>) -> JobResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // WAL so readers are not blocked by the dispatch loop's writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        info!(path = %path.display(), "job store opened");
        Self::init(conn)
    }

    /// Opens a transient in-memory store. Nothing survives drop; intended
    /// for tests.
    pub fn open_in_memory() -> JobResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> JobResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts or replaces the record stored under `name`, atomically.
    pub fn save(&self, name: &str, record: &str) -> JobResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO jobs (name, record) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET record = excluded.record",
            params![name, record],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes the record stored under `name`, atomically. Returns whether
    /// a record existed.
    pub fn delete(&self, name: &str) -> JobResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM jobs WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Visits every record in ascending key order. The visitor returns
    /// `false` to stop early.
    pub fn scan<F>(&self, mut visit: F) -> JobResult<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name, record FROM jobs ORDER BY name")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let record: String = row.get(1)?;
            if !visit(&name, &record) {
                break;
            }
        }
        Ok(())
    }

    /// Returns the record stored under `name`, if any.
    pub fn get(&self, name: &str) -> JobResult<Option<String>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT record FROM jobs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(record)
    }

    /// Number of stored records.
    pub fn len(&self) -> JobResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns whether the store holds no records.
    pub fn is_empty(&self) -> JobResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_get_delete() {
        let store = JobStore::open_in_memory().unwrap();

        store.save("a", "record-a").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("record-a"));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.len().unwrap(), 1);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_save_is_an_upsert() {
        let store = JobStore::open_in_memory().unwrap();

        store.save("a", "v1").unwrap();
        store.save("a", "v2").unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_scan_is_key_ordered() {
        let store = JobStore::open_in_memory().unwrap();

        // Insertion order differs from key order.
        store.save("c", "3").unwrap();
        store.save("a", "1").unwrap();
        store.save("b", "2").unwrap();

        let mut seen = Vec::new();
        store
            .scan(|name, record| {
                seen.push((name.to_string(), record.to_string()));
                true
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_early_stop() {
        let store = JobStore::open_in_memory().unwrap();
        store.save("a", "1").unwrap();
        store.save("b", "2").unwrap();

        let mut visited = 0;
        store
            .scan(|_name, _record| {
                visited += 1;
                false
            })
            .unwrap();

        assert_eq!(visited, 1);
    }

    #[test]
    fn test_reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        {
            let store = JobStore::open(&path).unwrap();
            store.save("a", "survives").unwrap();
        }

        let store = JobStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("survives"));
    }
}
