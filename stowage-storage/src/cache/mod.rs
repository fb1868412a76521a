//! Caching decorator composing two storage backends.
//!
//! [`CacheStorage`] puts a fast backend in front of an authoritative one and
//! implements the same [`Storage`](stowage_core::Storage) trait, so callers
//! never know which side answered.
//!
//! # Completeness
//!
//! Before the cache is known to be complete, enumerations go to the source
//! and their results are copied into the cache in the background. The first
//! unfiltered enumeration (or an eager preload) marks the cache loaded, and
//! from then on the cache answers everything. Cache-served calls wait for
//! copies still in flight, and a copy never overwrites an id the decorator
//! wrote or removed after the copy's source read.
//!
//! # Example
//!
//! ```ignore
//! let storage = CacheStorage::new(
//!     Arc::new(FileStorage::open("/var/lib/app/users").await?),
//!     Arc::new(MemoryStorage::new()),
//!     CacheConfig::new().with_name("users"),
//! );
//!
//! storage.get_all().await?;   // from the file store, mirrored
//! assert!(storage.is_loaded());
//! storage.count().await?;     // from memory, once the copy has landed
//! ```

pub mod cache_storage;
pub mod config;
mod ledger;
mod mirror;

pub use cache_storage::CacheStorage;
pub use config::{CacheConfig, CacheStats};
