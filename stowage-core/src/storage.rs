//! The Storage capability shared by every backend.

use std::sync::Arc;

use ::async_trait::async_trait;

use crate::error::StorageResult;
use crate::filter::Filter;
use crate::record::{Document, Record, RecordId};

/// Async create/read/update/remove/list over records of `T`.
///
/// A missing record is not an error. `read` of an unknown id answers
/// `Ok(None)` and `remove` of an unknown id is a no-op. `update` is an
/// upsert: an unknown id is created under that id.
///
/// Backends never enforce document limits; that belongs to the router.
#[async_trait]
pub trait Storage<T: Document>: Send + Sync {
    /// Store a new record and return its generated id.
    async fn create(&self, data: T) -> StorageResult<RecordId>;

    /// Fetch a record by id.
    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>>;

    /// Replace the payload stored under `id`, creating it if absent.
    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()>;

    /// Delete a record and its index entry.
    async fn remove(&self, id: &RecordId) -> StorageResult<()>;

    /// All ids, in the backend's enumeration order.
    async fn list(&self) -> StorageResult<Vec<RecordId>>;

    /// Every record with its id attached.
    async fn get_all(&self) -> StorageResult<Vec<Record<T>>> {
        self.find(&Filter::all()).await
    }

    /// Records whose payload matches every condition of `filter`.
    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>>;

    /// Number of stored records.
    async fn count(&self) -> StorageResult<u64>;

    /// Create when `id` is `None`, otherwise update. Returns the id used.
    async fn set(&self, id: Option<RecordId>, data: T) -> StorageResult<RecordId> {
        match id {
            Some(id) => {
                self.update(&id, data).await?;
                Ok(id)
            }
            None => self.create(data).await,
        }
    }
}

#[async_trait]
impl<T, S> Storage<T> for Arc<S>
where
    T: Document,
    S: Storage<T> + ?Sized,
{
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        (**self).create(data).await
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        (**self).read(id).await
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        (**self).update(id, data).await
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        (**self).remove(id).await
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        (**self).list().await
    }

    async fn get_all(&self) -> StorageResult<Vec<Record<T>>> {
        (**self).get_all().await
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        (**self).find(filter).await
    }

    async fn count(&self) -> StorageResult<u64> {
        (**self).count().await
    }

    async fn set(&self, id: Option<RecordId>, data: T) -> StorageResult<RecordId> {
        (**self).set(id, data).await
    }
}
