//! Builds the storage stack the server exposes from a [`ServerConfig`].

use std::sync::Arc;

use serde_json::Value;
use stowage_core::StorageError;
use stowage_storage::{CacheConfig, CacheStorage, FileStorage, LmdbStorage, MemoryStorage};
use tracing::info;

use crate::config::{BackendKind, CacheKind, ServerConfig};
use crate::error::ApiResult;
use crate::state::SharedStorage;

/// Key prefix of the single collection the server stores.
pub const COLLECTION_PREFIX: &str = "records/";

/// Open the configured backend, optionally behind a memory cache.
///
/// With eager preload enabled this must run inside a tokio runtime.
pub async fn open_storage(config: &ServerConfig) -> ApiResult<SharedStorage> {
    let source: SharedStorage = match config.backend {
        BackendKind::Memory => Arc::new(MemoryStorage::<Value>::new()),
        BackendKind::Lmdb => Arc::new(
            LmdbStorage::<Value>::open(&config.data_dir, COLLECTION_PREFIX, config.lmdb_max_size_mb)
                .map_err(StorageError::from)?,
        ),
        BackendKind::File => Arc::new(FileStorage::<Value>::open(&config.data_dir).await?),
    };
    info!(
        backend = ?config.backend,
        data_dir = %config.data_dir.display(),
        "Storage backend opened"
    );

    match config.cache {
        CacheKind::None => Ok(source),
        CacheKind::Memory => {
            let cache_config = CacheConfig::new()
                .with_eager_preload(config.eager_preload)
                .with_name("server");
            info!(eager_preload = config.eager_preload, "Memory cache enabled");
            Ok(Arc::new(CacheStorage::<Value, _, _>::new(
                Arc::new(source),
                Arc::new(MemoryStorage::<Value>::new()),
                cache_config,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stowage_core::Storage;

    #[tokio::test]
    async fn test_memory_backend() {
        let storage = open_storage(&ServerConfig::default()).await.unwrap();
        let id = storage.as_ref().create(json!({"x": "1"})).await.unwrap();
        assert!(storage.as_ref().read(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_backend_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            backend: BackendKind::File,
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let id = {
            let storage = open_storage(&config).await.unwrap();
            storage.as_ref().create(json!({"x": "1"})).await.unwrap()
        };

        let reopened = open_storage(&config).await.unwrap();
        assert_eq!(reopened.as_ref().count().await.unwrap(), 1);
        assert!(reopened.as_ref().read(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lmdb_backend_with_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            backend: BackendKind::Lmdb,
            data_dir: dir.path().to_path_buf(),
            lmdb_max_size_mb: 16,
            cache: CacheKind::Memory,
            ..Default::default()
        };

        let storage = open_storage(&config).await.unwrap();
        storage.as_ref().create(json!({"x": "1"})).await.unwrap();
        assert_eq!(storage.as_ref().get_all().await.unwrap().len(), 1);
    }
}
