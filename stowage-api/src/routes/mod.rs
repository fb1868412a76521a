//! REST API Routes Module
//!
//! Includes:
//! - The storage endpoint (`POST {prefix}/:action`)
//! - Health check endpoints
//! - CORS support for browser-based clients

pub mod health;
pub mod storage;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub use health::create_router as health_router;
pub use storage::create_router as storage_router;

/// Preflight cache duration for browser clients.
const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(CORS_MAX_AGE)
}

/// Build the complete application router.
///
/// The storage endpoint is mounted under `prefix`, health checks under
/// `/health`. Body size is not capped here; the storage router enforces
/// `maximum_document_size` itself.
pub fn create_api_router(state: AppState, prefix: &str) -> Router {
    Router::new()
        .merge(storage_router(prefix))
        .nest("/health", health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer()),
        )
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}
