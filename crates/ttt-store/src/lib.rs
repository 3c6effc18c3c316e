//! Storage layer for the tab time tracker.
//!
//! The tracker treats storage as an async key-value map from tab-ID strings
//! to [`TabRecord`]s. [`Store`] is that contract; two backends implement it:
//!
//! - [`MemoryStore`]: a shared in-process map, used in tests and for
//!   throwaway sessions
//! - [`SqliteStore`]: records as JSON rows in a `rusqlite` database
//!
//! # Consistency
//!
//! The contract is read-then-write, not compare-and-swap. Two writers that
//! read the same record and write it back will lose one update. Callers that
//! need read-modify-write must serialize access per key themselves (the
//! tracker does this with one lane per tab).
//!
//! Operations carry no timeout; a backend's own failures surface as
//! [`StoreError`].

use std::collections::BTreeMap;
use std::future::Future;

use thiserror::Error;
use ttt_core::TabRecord;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Records keyed by tab-ID string, in key order.
pub type Records = BTreeMap<String, TabRecord>;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value could not be encoded or decoded.
    #[error("invalid record for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// A previous holder of the connection lock panicked.
    #[error("storage connection lock poisoned")]
    Poisoned,
}

/// Which records a read should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A single key.
    Key(String),
    /// Several keys; missing keys are simply absent from the result.
    Keys(Vec<String>),
    /// Every record.
    All,
}

impl Query {
    /// Whether `key` is selected by this query.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Key(k) => k == key,
            Self::Keys(keys) => keys.iter().any(|k| k == key),
            Self::All => true,
        }
    }
}

/// An async key-value map of tab records.
pub trait Store: Send + Sync + 'static {
    /// Returns the records matched by `query`.
    fn get(&self, query: Query) -> impl Future<Output = Result<Records, StoreError>> + Send;

    /// Upserts every record in `records`.
    fn set(&self, records: Records) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the given keys. Missing keys are ignored.
    fn remove(&self, keys: Vec<String>) -> impl Future<Output = Result<(), StoreError>> + Send;
}
