//! STOWAGE API - HTTP front for any Storage
//!
//! Exposes one endpoint, `POST {prefix}/:action`, that forwards a storage
//! action to a served [`Storage`](stowage_core::Storage) with document
//! limits applied. [`StorageRouter`] holds the transport-independent logic;
//! [`routes`] wires it into Axum.

pub mod backend;
pub mod config;
pub mod error;
pub mod router;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use backend::open_storage;
pub use config::{BackendKind, CacheKind, RouterConfig, ServerConfig, DEFAULT_PREFIX};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use router::StorageRouter;
pub use routes::create_api_router;
pub use state::{AppState, SharedStorage};
