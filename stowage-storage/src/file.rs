//! Filesystem storage: one JSON document per record.
//!
//! Layout of a collection directory:
//!
//! ```text
//! <dir>/_index.json          ids in insertion order
//! <dir>/<hex(id)>.json       payload, without the id field
//! ```
//!
//! File names are the hex encoding of the id, so any id string is safe on
//! disk. Writes go to a temporary file first and are renamed into place.
//! Mutations hold the index lock for their whole duration.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stowage_core::{
    from_payload, to_payload, Document, Filter, Payload, Record, RecordId, Storage, StorageError,
    StorageResult,
};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

const INDEX_FILE: &str = "_index.json";

fn io_error(e: std::io::Error) -> StorageError {
    StorageError::backend("file", e)
}

/// File-backed storage for one collection directory.
pub struct FileStorage<T> {
    dir: PathBuf,
    index: Mutex<Vec<RecordId>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FileStorage<T> {
    /// Open a collection directory, creating it if needed, and load its index.
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(io_error)?;

        let index = match fs::read(dir.join(INDEX_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(e)),
        };

        Ok(Self {
            dir,
            index: Mutex::new(index),
            _marker: PhantomData,
        })
    }

    /// Collection directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(id.as_str())))
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await.map_err(io_error)?;
        fs::rename(&tmp, path).await.map_err(io_error)
    }

    async fn persist_index(&self, keys: &[RecordId]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(keys)?;
        self.write_atomic(&self.dir.join(INDEX_FILE), &bytes).await
    }

    async fn read_payload(&self, id: &RecordId) -> StorageResult<Option<Payload>> {
        match fs::read(self.record_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn put(&self, id: &RecordId, payload: &Payload) -> StorageResult<()> {
        let bytes = serde_json::to_vec(payload)?;
        let mut keys = self.index.lock().await;

        self.write_atomic(&self.record_path(id), &bytes).await?;
        if !keys.contains(id) {
            keys.push(id.clone());
            self.persist_index(&keys).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Document> Storage<T> for FileStorage<T> {
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let payload = to_payload(&data)?;
        let id = RecordId::generate();
        self.put(&id, &payload).await?;
        Ok(id)
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        self.read_payload(id)
            .await?
            .map(|payload| from_payload(id.clone(), payload))
            .transpose()
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let payload = to_payload(&data)?;
        self.put(id, &payload).await
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        let mut keys = self.index.lock().await;

        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }

        let before = keys.len();
        keys.retain(|k| k != id);
        if keys.len() != before {
            self.persist_index(&keys).await?;
        }
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        Ok(self.index.lock().await.clone())
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        let keys = self.index.lock().await.clone();

        let mut records = Vec::new();
        for id in keys {
            match self.read_payload(&id).await? {
                Some(payload) if filter.matches(&payload) => {
                    records.push(from_payload(id, payload)?);
                }
                Some(_) => {}
                None => warn!(id = %id, dir = %self.dir.display(), "Indexed record has no file"),
            }
        }
        Ok(records)
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.index.lock().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    async fn create_test_storage() -> (FileStorage<Value>, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let storage = FileStorage::open(temp_dir.path().join("items"))
            .await
            .expect("open should succeed");
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_one_file_per_record() {
        let (storage, _temp_dir) = create_test_storage().await;
        let id = storage.create(json!({"x": "100"})).await.expect("create should succeed");

        let path = storage.record_path(&id);
        let on_disk: Value =
            serde_json::from_slice(&std::fs::read(&path).expect("record file should exist"))
                .expect("record file should be JSON");
        assert_eq!(on_disk, json!({"x": "100"}));
    }

    #[tokio::test]
    async fn test_awkward_ids_are_safe_filenames() {
        let (storage, _temp_dir) = create_test_storage().await;
        let id = RecordId::from("../../etc/passwd");

        storage.update(&id, json!({"x": "1"})).await.expect("update should succeed");
        assert!(storage.record_path(&id).starts_with(storage.dir()));
        assert!(storage.read(&id).await.expect("read should succeed").is_some());
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let dir = temp_dir.path().join("items");

        let (a, b) = {
            let storage: FileStorage<Value> =
                FileStorage::open(&dir).await.expect("open should succeed");
            let a = storage.create(json!({"n": 1})).await.expect("create should succeed");
            let b = storage.create(json!({"n": 2})).await.expect("create should succeed");
            (a, b)
        };

        let storage: FileStorage<Value> =
            FileStorage::open(&dir).await.expect("reopen should succeed");
        assert_eq!(storage.list().await.expect("list should succeed"), vec![a, b]);
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped_in_enumeration() {
        let (storage, _temp_dir) = create_test_storage().await;
        let a = storage.create(json!({"n": 1})).await.expect("create should succeed");
        let b = storage.create(json!({"n": 2})).await.expect("create should succeed");

        std::fs::remove_file(storage.record_path(&a)).expect("remove should succeed");

        let all = storage.get_all().await.expect("get_all should succeed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, b);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_noop() {
        let (storage, _temp_dir) = create_test_storage().await;
        storage
            .remove(&RecordId::from("ghost"))
            .await
            .expect("remove should succeed");
        assert_eq!(storage.count().await.expect("count should succeed"), 0);
    }
}
