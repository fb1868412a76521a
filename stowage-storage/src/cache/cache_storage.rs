//! Caching decorator over an authoritative source and a fast cache.
//!
//! Both sides are plain [`Storage`] backends. The decorator decides per
//! operation which one answers, and keeps them aligned on writes without a
//! shared transaction:
//!
//! - writes (`update`, `remove`) go to the cache first, then the source;
//! - `create` goes to the source, which assigns the id, and is then copied
//!   into the cache;
//! - reads and enumerations are served by the cache once it is known to be
//!   complete, by the source otherwise.
//!
//! Completeness is a one-way latch. An unfiltered enumeration sets it before
//! returning, eager preload sets it when the preload is done, and nothing
//! clears it. Writes that bypass the decorator and hit the source directly
//! are not noticed afterwards.
//!
//! Copies made on the read path are detached tasks. The triggering call
//! returns before they land; use [`CacheStorage::settled`] to wait for them.
//! Cache-served operations wait for them too, so a loaded cache never
//! answers half filled. A copy of an id the decorator wrote or removed after
//! the copy's source read is dropped.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use stowage_core::{Document, Filter, Record, RecordId, Storage, StorageResult};
use tracing::{debug, warn};

use super::config::{CacheConfig, CacheStats};
use super::ledger::{Snapshot, WriteLedger, WriteMark};
use super::mirror::MirrorTracker;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    mirrored: AtomicU64,
    mirror_failures: AtomicU64,
    stale_skips: AtomicU64,
}

impl Counters {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Storage decorator adding a fast-path cache in front of a source.
///
/// # Type Parameters
///
/// - `T`: the record type
/// - `S`: the authoritative source backend
/// - `C`: the cache backend
///
/// # Example
///
/// ```ignore
/// let storage = CacheStorage::new(
///     Arc::new(remote),
///     Arc::new(MemoryStorage::new()),
///     CacheConfig::new().with_eager_preload(true),
/// );
///
/// let id = storage.create(json!({"x": "100"})).await?;
/// let record = storage.read(&id).await?; // served by the cache
/// ```
pub struct CacheStorage<T, S, C> {
    source: Arc<S>,
    cache: Arc<C>,
    config: CacheConfig,
    loaded: Arc<AtomicBool>,
    mirrors: Arc<MirrorTracker>,
    ledger: Arc<WriteLedger>,
    counters: Arc<Counters>,
    _marker: PhantomData<fn() -> T>,
}

/// What a detached mirror task needs from its decorator.
struct MirrorTarget<C: ?Sized> {
    cache: Arc<C>,
    ledger: Arc<WriteLedger>,
    counters: Arc<Counters>,
    name: String,
}

impl<T, S, C> CacheStorage<T, S, C>
where
    T: Document,
    S: Storage<T> + 'static,
    C: Storage<T> + 'static,
{
    /// Create a new caching decorator.
    ///
    /// With `eager_preload` set this submits the preload task, so it must be
    /// called from within a tokio runtime. Outside a runtime the preload is
    /// skipped and the cache fills lazily.
    pub fn new(source: Arc<S>, cache: Arc<C>, config: CacheConfig) -> Self {
        let storage = Self {
            source,
            cache,
            config,
            loaded: Arc::new(AtomicBool::new(false)),
            mirrors: Arc::new(MirrorTracker::default()),
            ledger: Arc::new(WriteLedger::default()),
            counters: Arc::new(Counters::default()),
            _marker: PhantomData,
        };

        if storage.config.eager_preload {
            storage.start_preload();
        }

        storage
    }

    /// Create a new caching decorator with default configuration.
    pub fn with_defaults(source: Arc<S>, cache: Arc<C>) -> Self {
        Self::new(source, cache, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the source backend.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a reference to the cache backend.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Whether the cache is trusted to hold every source record.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Wait for every detached mirror task submitted so far.
    pub async fn settled(&self) {
        self.mirrors.settled().await;
    }

    /// Number of detached mirror tasks still running.
    pub fn pending_mirrors(&self) -> usize {
        self.mirrors.pending()
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            mirrored: self.counters.mirrored.load(Ordering::Relaxed),
            mirror_failures: self.counters.mirror_failures.load(Ordering::Relaxed),
            stale_skips: self.counters.stale_skips.load(Ordering::Relaxed),
        }
    }

    fn mirror_target(&self) -> MirrorTarget<C> {
        MirrorTarget {
            cache: Arc::clone(&self.cache),
            ledger: Arc::clone(&self.ledger),
            counters: Arc::clone(&self.counters),
            name: self.config.name.clone(),
        }
    }

    /// Whether the cache answers. Waits for pending mirrors when it does.
    async fn serve_from_cache(&self) -> bool {
        if !self.is_loaded() {
            self.counters.miss();
            return false;
        }
        self.mirrors.settled().await;
        self.counters.hit();
        true
    }

    fn start_preload(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(cache = %self.config.name, "No tokio runtime, eager preload skipped");
            return;
        }

        let source = Arc::clone(&self.source);
        let loaded = Arc::clone(&self.loaded);
        let target = self.mirror_target();
        let snapshot = self.ledger.snapshot();

        debug!(cache = %target.name, "Eager preload started");
        self.mirrors.spawn(async move {
            let records = match source.get_all().await {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        cache = %target.name,
                        error = %e,
                        "Eager preload could not enumerate source"
                    );
                    return;
                }
            };

            let count = records.len();
            mirror_into(&target, records, &snapshot).await;
            loaded.store(true, Ordering::Release);
            debug!(
                cache = %target.name,
                records = count,
                "Eager preload finished, cache loaded"
            );
        });
    }

    /// Copy `records`, read from the source after `snapshot`, into the
    /// cache in a detached task.
    fn spawn_mirror(&self, records: Vec<Record<T>>, snapshot: Snapshot) {
        let target = self.mirror_target();
        self.mirrors.spawn(async move {
            mirror_into(&target, records, &snapshot).await;
        });
    }

    /// Run one cache-side write of the decorator, ordered against mirrors.
    /// The returned mark must live until the source side is done.
    async fn write_cache<F>(&self, id: &RecordId, write: F) -> StorageResult<WriteMark>
    where
        F: std::future::Future<Output = StorageResult<()>>,
    {
        let _gate = self.ledger.gate().await;
        let mark = self.ledger.begin_write(id);
        write.await?;
        Ok(mark)
    }
}

/// Write each record into the cache under its own id, skipping ids the
/// decorator wrote since `snapshot`. Failures are logged and counted.
async fn mirror_into<T, C>(
    target: &MirrorTarget<C>,
    records: Vec<Record<T>>,
    snapshot: &Snapshot,
) where
    T: Document,
    C: Storage<T> + ?Sized,
{
    for record in records {
        let (id, data) = record.into_parts();
        let _gate = target.ledger.gate().await;
        if snapshot.is_stale(&id) {
            target.counters.stale_skips.fetch_add(1, Ordering::Relaxed);
            debug!(cache = %target.name, id = %id, "Mirror skipped, id written since");
            continue;
        }
        match target.cache.update(&id, data).await {
            Ok(()) => {
                target.counters.mirrored.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                target.counters.mirror_failures.fetch_add(1, Ordering::Relaxed);
                warn!(cache = %target.name, id = %id, error = %e, "Mirror write failed");
            }
        }
    }
}

#[async_trait]
impl<T, S, C> Storage<T> for CacheStorage<T, S, C>
where
    T: Document,
    S: Storage<T> + 'static,
    C: Storage<T> + 'static,
{
    async fn create(&self, data: T) -> StorageResult<RecordId> {
        let id = self.source.create(data.clone()).await?;

        match self.write_cache(&id, self.cache.update(&id, data)).await {
            Ok(_mark) => {
                self.counters.mirrored.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.mirror_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    cache = %self.config.name,
                    id = %id,
                    error = %e,
                    "Mirror of created record failed"
                );
            }
        }

        Ok(id)
    }

    async fn read(&self, id: &RecordId) -> StorageResult<Option<Record<T>>> {
        if self.is_loaded() {
            self.mirrors.settled().await;
            self.counters.hit();
            return self.cache.read(id).await;
        }

        // A cached entry is trusted even while the cache is partial.
        let snapshot = self.ledger.snapshot();
        if let Some(cached) = self.cache.read(id).await? {
            self.counters.hit();
            return Ok(Some(cached));
        }

        self.counters.miss();
        let record = self.source.read(id).await?;
        if let Some(record) = &record {
            self.spawn_mirror(vec![record.clone()], snapshot);
        }
        Ok(record)
    }

    async fn update(&self, id: &RecordId, data: T) -> StorageResult<()> {
        let _mark = self.write_cache(id, self.cache.update(id, data.clone())).await?;
        self.source.update(id, data).await
    }

    async fn remove(&self, id: &RecordId) -> StorageResult<()> {
        let _mark = self.write_cache(id, self.cache.remove(id)).await?;
        self.source.remove(id).await
    }

    async fn list(&self) -> StorageResult<Vec<RecordId>> {
        if self.serve_from_cache().await {
            return self.cache.list().await;
        }
        self.source.list().await
    }

    async fn find(&self, filter: &Filter) -> StorageResult<Vec<Record<T>>> {
        if self.serve_from_cache().await {
            return self.cache.find(filter).await;
        }

        let snapshot = self.ledger.snapshot();
        let records = self.source.find(filter).await?;
        let unfiltered = filter.is_empty();
        if unfiltered || !records.is_empty() {
            self.spawn_mirror(records.clone(), snapshot);
        }
        if unfiltered && !self.loaded.swap(true, Ordering::AcqRel) {
            debug!(
                cache = %self.config.name,
                records = records.len(),
                "Full enumeration, cache loaded"
            );
        }
        Ok(records)
    }

    async fn count(&self) -> StorageResult<u64> {
        if self.serve_from_cache().await {
            return self.cache.count().await;
        }
        self.source.count().await
    }
}
