//! STOWAGE Storage - Backends and the caching decorator
//!
//! Every backend implements [`stowage_core::Storage`]:
//!
//! - [`MemoryStorage`]: volatile, insertion-ordered
//! - [`LmdbStorage`]: LMDB via heed, with a persisted key index
//! - [`FileStorage`]: one JSON file per record, with a persisted key index
//! - `DocumentStorage`: PostgreSQL JSONB table (feature `postgres`)
//!
//! [`CacheStorage`] composes any two of them.

pub mod cache;
pub mod file;
pub mod lmdb;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use cache::{CacheConfig, CacheStats, CacheStorage};
pub use file::FileStorage;
pub use lmdb::{LmdbStorage, LmdbStorageError};
pub use memory::MemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::{DocumentStorage, DocumentStoreConfig};

pub use stowage_core::{Document, Filter, Record, RecordId, Storage, StorageError, StorageResult};
