//! Construction-time settings for [`CacheStorage`](super::CacheStorage).

/// Configuration for the caching decorator.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Copy every source record into the cache right after construction.
    pub eager_preload: bool,
    /// Label used in log lines, to tell decorator instances apart.
    pub name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eager_preload: false,
            name: "cache".to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable eager preload.
    pub fn with_eager_preload(mut self, enabled: bool) -> Self {
        self.eager_preload = enabled;
        self
    }

    /// Set the instance name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Counters describing how a decorator instance has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Operations answered by the cache backend.
    pub hits: u64,
    /// Operations answered by the source backend.
    pub misses: u64,
    /// Records copied into the cache by detached mirror tasks.
    pub mirrored: u64,
    /// Detached mirror writes that failed and were dropped.
    pub mirror_failures: u64,
    /// Mirror copies dropped because the decorator wrote the id since.
    pub stale_skips: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
