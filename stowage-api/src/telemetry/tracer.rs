//! Tracing Subscriber Initialization
//!
//! Human-readable output by default, JSON lines when `STOWAGE_LOG_JSON` is
//! set. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "stowage_api=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported at startup
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("STOWAGE_SERVICE_NAME")
                .unwrap_or_else(|_| "stowage-server".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            json: std::env::var("STOWAGE_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global tracing subscriber.
///
/// Must be called once at startup before any tracing occurs. A second call
/// fails with `InternalError`.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        json = config.json,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_reads_env() {
        let _name = EnvVarGuard::set("STOWAGE_SERVICE_NAME", Some("stowage-test"));
        let _json = EnvVarGuard::set("STOWAGE_LOG_JSON", Some("1"));

        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "stowage-test");
        assert!(config.json);
        assert_eq!(config.default_filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            json: false,
            ..TelemetryConfig::default()
        };
        // Another test in this binary may have installed a subscriber first.
        let _ = init_tracer(&config);
        assert!(init_tracer(&config).is_err());
    }
}
