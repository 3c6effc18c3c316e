//! In-memory store.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{Query, Records, Store, StoreError};

/// Thread-safe in-memory record map.
///
/// Clones share the same map, so a test can keep a handle while the tracker
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: Records) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Store for MemoryStore {
    async fn get(&self, query: Query) -> Result<Records, StoreError> {
        let records = self.records.read().await;
        let matched = match &query {
            Query::Key(key) => records
                .get_key_value(key)
                .map(|(k, v)| (k.clone(), v.clone()))
                .into_iter()
                .collect(),
            Query::Keys(_) | Query::All => records
                .iter()
                .filter(|(key, _)| query.matches(key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(matched)
    }

    async fn set(&self, records: Records) -> Result<(), StoreError> {
        let mut stored = self.records.write().await;
        stored.extend(records);
        Ok(())
    }

    async fn remove(&self, keys: Vec<String>) -> Result<(), StoreError> {
        let mut stored = self.records.write().await;
        for key in keys {
            stored.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttt_core::{TabId, TabRecord};

    fn record(id: i64) -> (String, TabRecord) {
        let record = TabRecord::new(TabId::new(id), None, "T", "https://t.test", 0, false);
        (record.id.key(), record)
    }

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        store
            .set([record(1), record(2), record(3)].into_iter().collect())
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);

        let one = store.get(Query::Key("2".into())).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one["2"].id, TabId::new(2));

        let some = store
            .get(Query::Keys(vec!["1".into(), "3".into(), "9".into()]))
            .await
            .unwrap();
        assert_eq!(some.keys().collect::<Vec<_>>(), vec!["1", "3"]);

        store.remove(vec!["1".into(), "9".into()]).await.unwrap();
        let all = store.get(Query::All).await.unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["2", "3"]);
    }

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let store = MemoryStore::new();
        let (key, mut value) = record(1);
        store.set([(key.clone(), value.clone())].into_iter().collect()).await.unwrap();

        value.close(5_000);
        store.set([(key.clone(), value)].into_iter().collect()).await.unwrap();

        let stored = store.get(Query::Key(key.clone())).await.unwrap();
        assert_eq!(stored[&key].end_time, Some(5_000));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set([record(4)].into_iter().collect()).await.unwrap();
        assert!(!handle.is_empty().await);
    }
}
