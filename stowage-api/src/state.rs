//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use stowage_core::Storage;

use crate::config::RouterConfig;
use crate::router::StorageRouter;

/// Storage served by the HTTP layer. Payloads are schemaless JSON objects.
pub type SharedStorage = Arc<dyn Storage<Value>>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub storage: SharedStorage,
    pub router: Arc<StorageRouter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(storage: SharedStorage, config: RouterConfig) -> Self {
        Self {
            storage,
            router: Arc::new(StorageRouter::new(config)),
            start_time: Instant::now(),
        }
    }
}
