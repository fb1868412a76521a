//! Runs the shared conformance suite against every local backend.

use std::sync::Arc;

use serde_json::Value;
use stowage_storage::{CacheConfig, CacheStorage, FileStorage, LmdbStorage, MemoryStorage, Storage};
use stowage_test_utils::conformance::{self, run_suite};
use stowage_test_utils::fixtures::{three_points, Point};
use stowage_test_utils::generators::arb_payload;
use tempfile::TempDir;

type Mem = MemoryStorage<Value>;

#[tokio::test]
async fn memory_storage_conforms() {
    run_suite(|| async { Mem::new() }).await;
}

#[tokio::test]
async fn cache_over_memory_conforms() {
    run_suite(|| async {
        CacheStorage::<Value, _, _>::with_defaults(Arc::new(Mem::new()), Arc::new(Mem::new()))
    })
    .await;
}

#[tokio::test]
async fn cache_with_eager_preload_conforms() {
    run_suite(|| async {
        CacheStorage::<Value, _, _>::new(
            Arc::new(Mem::new()),
            Arc::new(Mem::new()),
            CacheConfig::new().with_eager_preload(true),
        )
    })
    .await;
}

#[tokio::test]
async fn lmdb_storage_conforms() {
    let root = TempDir::new().expect("TempDir creation should succeed");
    let mut n = 0;
    run_suite(|| {
        n += 1;
        let dir = root.path().join(format!("env-{n}"));
        async move { LmdbStorage::<Value>::open(dir, "items/", 10).expect("open should succeed") }
    })
    .await;
}

#[tokio::test]
async fn file_storage_conforms() {
    let root = TempDir::new().expect("TempDir creation should succeed");
    let mut n = 0;
    run_suite(|| {
        n += 1;
        let dir = root.path().join(format!("collection-{n}"));
        async move { FileStorage::<Value>::open(dir).await.expect("open should succeed") }
    })
    .await;
}

#[tokio::test]
async fn cache_over_file_conforms() {
    let root = TempDir::new().expect("TempDir creation should succeed");
    let mut n = 0;
    run_suite(|| {
        n += 1;
        let dir = root.path().join(format!("collection-{n}"));
        async move {
            let source = FileStorage::<Value>::open(dir).await.expect("open should succeed");
            CacheStorage::<Value, _, _>::with_defaults(Arc::new(source), Arc::new(Mem::new()))
        }
    })
    .await;
}

#[tokio::test]
async fn typed_documents_round_trip() {
    let storage = MemoryStorage::<Point>::new();
    let point = Point::new("100").labelled("origin");

    let id = storage.create(point.clone()).await.expect("create should succeed");
    let record = storage.read(&id).await.expect("read should succeed");
    assert_eq!(record.map(|r| r.data), Some(point));
}

#[tokio::test]
async fn file_backed_cache_latches_after_full_enumeration() {
    let root = TempDir::new().expect("TempDir creation should succeed");
    let source = Arc::new(
        FileStorage::<Value>::open(root.path())
            .await
            .expect("open should succeed"),
    );
    for doc in three_points() {
        source.create(doc).await.expect("create should succeed");
    }

    let cache = Arc::new(Mem::new());
    let storage =
        CacheStorage::<Value, _, _>::with_defaults(Arc::clone(&source), Arc::clone(&cache));

    let all = storage.get_all().await.expect("get_all should succeed");
    assert!(storage.is_loaded());
    assert_eq!(storage.count().await.expect("count should succeed"), 3);

    storage.settled().await;
    assert_eq!(cache.list().await.expect("list should succeed"), conformance::ids(&all));
}

#[test]
fn memory_round_trip_property() {
    use proptest::prelude::*;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build");

    proptest!(ProptestConfig::with_cases(64), |(payload in arb_payload())| {
        let storage = Mem::new();
        let (id, record) = runtime.block_on(async {
            let id = storage.create(payload.clone()).await.expect("create should succeed");
            let record = storage.read(&id).await.expect("read should succeed");
            (id, record)
        });
        let record = record.expect("record should exist");
        prop_assert_eq!(record.id, id);
        prop_assert_eq!(record.data, payload);
    });
}
