//! LMDB-backed persistent storage.
//!
//! Uses the heed crate (Rust bindings for LMDB). Records of one collection
//! share a key prefix inside a single unnamed database:
//!
//! - `{prefix}{id}` holds the JSON payload (no id field)
//! - `keys/{prefix}` holds the JSON array of ids in insertion order
//!
//! LMDB has no ordered enumeration by insertion, so the key index is the
//! source for `list`, `get_all` and `count`. Every mutation rewrites the
//! payload and the index inside one write transaction.

use std::marker::PhantomData;
use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use stowage_core::{
    from_payload, to_payload, Document, Filter, Payload, Record, RecordId, Storage, StorageError,
    StorageResult,
};

/// Prefix of the key holding a collection's id index.
pub const KEYS_PREFIX: &str = "keys/";

/// Error type for LMDB storage operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStorageError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes could not be decoded, or a payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for LmdbStorageError {
    fn from(e: heed::Error) -> Self {
        LmdbStorageError::Transaction(e.to_string())
    }
}

impl From<serde_json::Error> for LmdbStorageError {
    fn from(e: serde_json::Error) -> Self {
        LmdbStorageError::Serialization(e.to_string())
    }
}

/// Convert LmdbStorageError to StorageError.
impl From<LmdbStorageError> for StorageError {
    fn from(e: LmdbStorageError) -> Self {
        StorageError::backend("lmdb", e)
    }
}

/// LMDB-backed storage for one collection.
///
/// # Example
///
/// ```ignore
/// let users = LmdbStorage::<User>::open("/var/lib/app/lmdb", "users/", 100)?;
/// let sessions = users.collection::<Session>("sessions/");
///
/// let id = users.create(user).await?;
/// ```
pub struct LmdbStorage<T> {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Key prefix of this collection.
    prefix: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LmdbStorage<T> {
    /// Open (or create) an LMDB environment at `path` and bind a collection.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `prefix` - Key prefix separating this collection from others
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(
        path: P,
        prefix: impl Into<String>,
        max_size_mb: usize,
    ) -> Result<Self, LmdbStorageError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStorageError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn()?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStorageError::DbOpen(e.to_string()))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            db,
            prefix: prefix.into(),
            _marker: PhantomData,
        })
    }

    /// Bind another collection living in the same environment.
    pub fn collection<U>(&self, prefix: impl Into<String>) -> LmdbStorage<U> {
        LmdbStorage {
            env: self.env.clone(),
            db: self.db,
            prefix: prefix.into(),
            _marker: PhantomData,
        }
    }

    /// Key prefix of this collection.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn record_key(&self, id: &RecordId) -> String {
        format!("{}{}", self.prefix, id)
    }

    fn index_key(&self) -> String {
        format!("{}{}", KEYS_PREFIX, self.prefix)
    }

    fn read_index(&self, txn: &RoTxn) -> Result<Vec<RecordId>, LmdbStorageError> {
        match self.db.get(txn, self.index_key().as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_index(&self, wtxn: &mut RwTxn, keys: &[RecordId]) -> Result<(), LmdbStorageError> {
        let bytes = serde_json::to_vec(keys)?;
        self.db.put(wtxn, self.index_key().as_bytes(), &bytes)?;
        Ok(())
    }

    fn read_payload(
        &self,
        txn: &RoTxn,
        id: &RecordId,
    ) -> Result<Option<Payload>, LmdbStorageError> {
        match self.db.get(txn, self.record_key(id).as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    /// Write a payload and append the id to the index if it is new.
    fn put(&self, id: &RecordId, payload: &Payload) -> Result<(), LmdbStorageError> {
        let bytes = serde_json::to_vec(payload)?;
        let mut wtxn = self.env.write_txn()?;

        self.db.put(&mut wtxn, self.record_key(id).as_bytes(), &bytes)?;
        let mut keys = self.read_index(&wtxn)?;
        if !keys.contains(id) {
            keys.push(id.clone());
            self.write_index(&mut wtxn, &keys)?;
        }

        wtxn.commit()?;
        Ok(())
    }

    fn delete(&self, id: &RecordId) -> Result<(), LmdbStorageError> {
        let mut wtxn = self.env.write_txn()?;

        self.db.delete(&mut wtxn, self.record_key(id).as_bytes())?;
        let mut keys = self.read_index(&wtxn)?;
        let before = keys.len();
        keys.retain(|k| k != id);
        if keys.len() != before {
            self.write_index(&mut wtxn, &keys)?;
        }

        wtxn.commit()?;
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Payload>, LmdbStorageError> {
        let rtxn = self.env.read_txn()?;
        self.read_payload(&rtxn, id)
    }

    fn keys(&self) -> Result<Vec<RecordId>, LmdbStorageError> {
        let rtxn = self.env.read_txn()?;
        self.read_index(&rtxn)
    }

    /// Payloads in index order. Index entries without a payload are skipped.
    fn scan(&self, filter: &Filter) -> Result<Vec<(RecordId, Payload)>, LmdbStorageError> {
        let rtxn = self.env.read_txn()?;
        let mut matched = Vec::new();
        for id in self.read_index(&rtxn)? {
            if let Some(payload) = self.read_payload(&rtxn, &id)? {
                if filter.matches(&payload) {
                    matched.push((id, payload));
                }
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl<T: Document> Storage<T> for LmdbStorage<T> {
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let payload = to_payload(&data)?;
        let id = RecordId::generate();
        self.put(&id, &payload)?;
        Ok(id)
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        self.get(id)?
            .map(|payload| from_payload(id.clone(), payload))
            .transpose()
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let payload = to_payload(&data)?;
        self.put(id, &payload)?;
        Ok(())
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        self.delete(id)?;
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        Ok(self.keys()?)
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        self.scan(filter)?
            .into_iter()
            .map(|(id, payload)| from_payload(id, payload))
            .collect()
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.keys()?.len() as u64)
    }
}
