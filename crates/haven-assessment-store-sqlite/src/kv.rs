use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use haven_assessment_core::{format_rfc3339, now_utc};
use rusqlite::{params, Connection, OptionalExtension};

const KV_MIGRATION_VERSION: i64 = 1;

const SCHEMA_KV_V1: &str = r"
CREATE TABLE IF NOT EXISTS kv_entries (
  key TEXT PRIMARY KEY CHECK (length(trim(key)) > 0),
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

/// Whole-document key-value persistence. Every `set` replaces the value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );",
            )
            .context("failed to ensure schema_migrations exists")?;

        self.conn
            .execute_batch(SCHEMA_KV_V1)
            .context("failed to apply key-value schema")?;

        let now = format_rfc3339(now_utc()).map_err(|err| anyhow!(err.to_string()))?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![KV_MIGRATION_VERSION, now],
            )
            .context("failed to register key-value schema migration")?;

        Ok(())
    }

    /// Keys currently stored, in ascending order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_entries ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list stored keys")
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = format_rfc3339(now_utc()).map_err(|err| anyhow!(err.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO kv_entries(key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .with_context(|| format!("failed to remove key {key}"))?;
        Ok(())
    }
}

/// Process-local store, mainly for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err}"),
        }
    }

    fn fixture_store() -> SqliteKeyValueStore {
        let store = must(SqliteKeyValueStore::open_in_memory());
        must(store.migrate());
        store
    }

    #[test]
    fn set_overwrites_and_remove_deletes() {
        let mut store = fixture_store();
        assert_eq!(must(store.get("k")), None);

        must(store.set("k", "one"));
        must(store.set("k", "two"));
        assert_eq!(must(store.get("k")).as_deref(), Some("two"));
        assert_eq!(must(store.keys()), vec!["k".to_string()]);

        must(store.remove("k"));
        assert_eq!(must(store.get("k")), None);
        // removing a missing key is fine
        must(store.remove("k"));
    }

    #[test]
    fn migration_is_idempotent_and_preserves_existing_data() {
        let mut store = fixture_store();
        must(store.set("k", "kept"));
        must(store.migrate());
        assert_eq!(must(store.get("k")).as_deref(), Some("kept"));

        let applied: i64 = match store.connection().query_row(
            "SELECT COUNT(*) FROM schema_migrations",
            [],
            |row| row.get(0),
        ) {
            Ok(value) => value,
            Err(err) => panic!("failed to count migrations: {err}"),
        };
        assert_eq!(applied, 1);
    }

    #[test]
    fn blank_keys_are_rejected_by_schema() {
        let mut store = fixture_store();
        assert!(store.set("  ", "value").is_err());
    }

    #[test]
    fn data_survives_reopen_on_disk() {
        let db_path = std::env::temp_dir().join(format!(
            "haven-kv-test-{}.sqlite3",
            ulid::Ulid::new()
        ));

        {
            let mut store = must(SqliteKeyValueStore::open(&db_path));
            must(store.migrate());
            must(store.set("history", "[]"));
        }

        let store = must(SqliteKeyValueStore::open(&db_path));
        must(store.migrate());
        assert_eq!(must(store.get("history")).as_deref(), Some("[]"));

        drop(store);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("sqlite3-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("sqlite3-shm"));
    }

    #[test]
    fn memory_store_round_trips_values() {
        let mut store = MemoryKeyValueStore::new();
        must(store.set("a", "1"));
        assert_eq!(must(store.get("a")).as_deref(), Some("1"));
        must(store.remove("a"));
        assert_eq!(must(store.get("a")), None);
    }
}
