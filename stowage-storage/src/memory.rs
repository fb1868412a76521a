//! Volatile in-process storage.
//!
//! Records live in an insertion-ordered map, so `list` and `get_all`
//! enumerate in creation order. Nothing survives the process.

use std::marker::PhantomData;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use stowage_core::{
    from_payload, to_payload, Document, Filter, Payload, Record, RecordId, Storage, StorageError,
    StorageResult,
};

/// In-memory storage backend.
#[derive(Debug)]
pub struct MemoryStorage<T> {
    records: RwLock<IndexMap<RecordId, Payload>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
            _marker: PhantomData,
        }
    }
}

impl<T> MemoryStorage<T> {
    /// Create an empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every stored record.
    pub fn clear(&self) -> StorageResult<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.read_lock()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    fn read_lock(&self) -> StorageResult<RwLockReadGuard<'_, IndexMap<RecordId, Payload>>> {
        self.records.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, IndexMap<RecordId, Payload>>> {
        self.records.write().map_err(|_| StorageError::LockPoisoned)
    }
}

#[async_trait]
impl<T: Document> Storage<T> for MemoryStorage<T> {
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let payload = to_payload(&data)?;
        let id = RecordId::generate();
        self.write()?.insert(id.clone(), payload);
        Ok(id)
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        let payload = self.read_lock()?.get(id).cloned();
        payload
            .map(|payload| from_payload(id.clone(), payload))
            .transpose()
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let payload = to_payload(&data)?;
        self.write()?.insert(id.clone(), payload);
        Ok(())
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        self.write()?.shift_remove(id);
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        Ok(self.read_lock()?.keys().cloned().collect())
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        let matched: Vec<(RecordId, Payload)> = self
            .read_lock()?
            .iter()
            .filter(|(_, payload)| filter.matches(payload))
            .map(|(id, payload)| (id.clone(), payload.clone()))
            .collect();

        matched
            .into_iter()
            .map(|(id, payload)| from_payload(id, payload))
            .collect()
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.read_lock()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_create_read() {
        let storage = MemoryStorage::<Value>::new();
        let id = storage.create(json!({"x": "100"})).await.unwrap();

        let record = storage.read(&id).await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.data, json!({"x": "100"}));
    }

    #[tokio::test]
    async fn test_update_keeps_position() {
        let storage = MemoryStorage::<Value>::new();
        let a = storage.create(json!({"n": 1})).await.unwrap();
        let b = storage.create(json!({"n": 2})).await.unwrap();

        storage.update(&a, json!({"n": 10})).await.unwrap();
        assert_eq!(storage.list().await.unwrap(), vec![a.clone(), b.clone()]);

        let c = RecordId::from("custom");
        storage.update(&c, json!({"n": 3})).await.unwrap();
        assert_eq!(storage.list().await.unwrap(), vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_remove_preserves_order_of_the_rest() {
        let storage = MemoryStorage::<Value>::new();
        let a = storage.create(json!({"n": 1})).await.unwrap();
        let b = storage.create(json!({"n": 2})).await.unwrap();
        let c = storage.create(json!({"n": 3})).await.unwrap();

        storage.remove(&b).await.unwrap();
        assert_eq!(storage.list().await.unwrap(), vec![a, c]);
        assert_eq!(storage.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stored_payload_has_no_id() {
        let storage = MemoryStorage::<Value>::new();
        let id = storage.create(json!({"id": "spoofed", "x": "1"})).await.unwrap();
        assert_ne!(id.as_str(), "spoofed");

        let record = storage.read(&id).await.unwrap().unwrap();
        assert_eq!(record.data, json!({"x": "1"}));
    }

    #[tokio::test]
    async fn test_clear() {
        let storage = MemoryStorage::<Value>::new();
        storage.create(json!({"n": 1})).await.unwrap();
        storage.clear().unwrap();
        assert!(storage.is_empty().unwrap());
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
