//! STOWAGE Server Entry Point
//!
//! Bootstraps configuration, opens the configured storage and starts the
//! Axum HTTP server.

use axum::Router;
use stowage_api::telemetry::{init_tracer, TelemetryConfig};
use stowage_api::{create_api_router, open_storage, ApiError, ApiResult, AppState, ServerConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let config = ServerConfig::from_env()?;
    let storage = open_storage(&config).await?;

    let state = AppState::new(storage, config.router);
    let app: Router = create_api_router(state, &config.prefix);

    let addr = config.bind_addr()?;
    tracing::info!(
        %addr,
        prefix = %config.prefix,
        documents_limit = config.router.documents_limit,
        maximum_document_size = config.router.maximum_document_size,
        "Starting STOWAGE server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Server error");
            ApiError::internal_error(format!("Server error: {}", e))
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
