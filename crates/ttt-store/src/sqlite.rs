//! SQLite-backed store.
//!
//! # Schema
//!
//! One table, `records`, maps the tab-ID key to the record's JSON encoding
//! (camelCase fields, the same shape the browser extension persisted).
//! `updated_at` is an ISO 8601 UTC timestamp of the last write, kept for
//! inspection only.
//!
//! # Concurrency
//!
//! A single `rusqlite::Connection` sits behind a mutex. Each operation runs on
//! the blocking thread pool, takes the lock for the duration of one query or
//! transaction, and releases it.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params, params_from_iter};
use ttt_core::TabRecord;

use crate::{Query, Records, Store, StoreError};

/// Record store persisted in SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens a store at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens an in-memory store.
    ///
    /// Useful for testing. The data is lost when the last clone is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Initializes the schema. Idempotent.
    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        tracing::debug!("record store schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            op(&mut guard)
        })
        .await?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock().map_err(|_| StoreError::Poisoned)
}

fn decode(key: String, value: &str) -> Result<(String, TabRecord), StoreError> {
    match serde_json::from_str(value) {
        Ok(record) => Ok((key, record)),
        Err(source) => Err(StoreError::Serialization { key, source }),
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn select(conn: &Connection, query: &Query) -> Result<Records, StoreError> {
    let (sql, keys): (String, Vec<String>) = match query {
        Query::Key(key) => (
            "SELECT key, value FROM records WHERE key = ?".to_string(),
            vec![key.clone()],
        ),
        Query::Keys(keys) if keys.is_empty() => return Ok(Records::new()),
        Query::Keys(keys) => {
            let placeholders = vec!["?"; keys.len()].join(", ");
            (
                format!("SELECT key, value FROM records WHERE key IN ({placeholders})"),
                keys.clone(),
            )
        }
        Query::All => ("SELECT key, value FROM records".to_string(), Vec::new()),
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(keys.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut records = Records::new();
    for row in rows {
        let (key, value) = row?;
        let (key, record) = decode(key, &value)?;
        records.insert(key, record);
    }
    Ok(records)
}

impl Store for SqliteStore {
    async fn get(&self, query: Query) -> Result<Records, StoreError> {
        self.with_conn(move |conn| select(conn, &query)).await
    }

    async fn set(&self, records: Records) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(records.len());
        for (key, record) in records {
            match serde_json::to_string(&record) {
                Ok(value) => encoded.push((key, value)),
                Err(source) => return Err(StoreError::Serialization { key, source }),
            }
        }

        self.with_conn(move |conn| {
            let updated_at = now_timestamp();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "
                    INSERT INTO records (key, value, updated_at) VALUES (?, ?, ?)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at
                    ",
                )?;
                for (key, value) in &encoded {
                    stmt.execute(params![key, value, updated_at])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, keys: Vec<String>) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("DELETE FROM records WHERE key = ?")?;
                for key in &keys {
                    stmt.execute(params![key])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttt_core::TabId;

    fn record(id: i64) -> (String, TabRecord) {
        let mut record =
            TabRecord::new(TabId::new(id), None, "Title", "https://a.test", 1_000, true);
        record.navigate("https://b.test", "B", 4_000);
        (record.id.key(), record)
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn schema_matches_data_model() {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        let conn = store.conn.lock().unwrap();
        assert_eq!(table_columns(&conn, "records"), vec!["key", "value", "updated_at"]);
    }

    #[tokio::test]
    async fn records_round_trip_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (key, value) = record(7);
        store
            .set([(key.clone(), value.clone())].into_iter().collect())
            .await
            .unwrap();

        let loaded = store.get(Query::Key(key.clone())).await.unwrap();
        assert_eq!(loaded[&key], value);
    }

    #[tokio::test]
    async fn keys_query_skips_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set([record(1), record(2), record(3)].into_iter().collect())
            .await
            .unwrap();

        let loaded = store
            .get(Query::Keys(vec!["3".into(), "1".into(), "5".into()]))
            .await
            .unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["1", "3"]);

        let none = store.get(Query::Keys(Vec::new())).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_only_named_keys() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set([record(1), record(2)].into_iter().collect())
            .await
            .unwrap();
        store.remove(vec!["1".into(), "42".into()]).await.unwrap();

        let all = store.get(Query::All).await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["2"]);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttt.db");
        let (key, value) = record(9);
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .set([(key.clone(), value.clone())].into_iter().collect())
                .await
                .unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        let loaded = reopened.get(Query::All).await.unwrap();
        assert_eq!(loaded.get(&key), Some(&value));
    }

    #[tokio::test]
    async fn corrupt_row_reports_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO records (key, value, updated_at) VALUES ('3', 'not json', '')",
                [],
            )
            .unwrap();
        }
        let err = store.get(Query::All).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == "3"));
    }
}
