//! Server Configuration Module
//!
//! Router limits, bind address and backend selection for the STOWAGE
//! server. Configuration is loaded from environment variables with
//! defaults suited to local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// Mount point of the storage endpoint when `STOWAGE_PREFIX` is unset.
pub const DEFAULT_PREFIX: &str = "/storage";

// ============================================================================
// ROUTER CONFIGURATION
// ============================================================================

/// Limits enforced by the request router. Zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterConfig {
    /// Maximum number of stored documents; checked before a create.
    pub documents_limit: u64,

    /// Maximum request body length in bytes for create and update.
    pub maximum_document_size: usize,
}

impl RouterConfig {
    pub fn new(documents_limit: u64, maximum_document_size: usize) -> Self {
        Self {
            documents_limit,
            maximum_document_size,
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }
}

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Storage medium served by the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Memory,
    Lmdb,
    File,
}

impl FromStr for BackendKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "lmdb" => Ok(BackendKind::Lmdb),
            "file" => Ok(BackendKind::File),
            other => Err(ApiError::invalid_input(format!(
                "Invalid STOWAGE_BACKEND value: {} (expected memory, lmdb or file)",
                other
            ))),
        }
    }
}

/// Cache placed in front of the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheKind {
    #[default]
    None,
    Memory,
}

impl FromStr for CacheKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(CacheKind::None),
            "memory" => Ok(CacheKind::Memory),
            other => Err(ApiError::invalid_input(format!(
                "Invalid STOWAGE_CACHE value: {} (expected none or memory)",
                other
            ))),
        }
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Everything the `stowage-server` binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Mount point of `POST {prefix}/:action`. Empty mounts at the root.
    pub prefix: String,
    pub router: RouterConfig,
    pub backend: BackendKind,
    /// Directory for the LMDB and file backends.
    pub data_dir: PathBuf,
    /// LMDB map size in megabytes.
    pub lmdb_max_size_mb: usize,
    pub cache: CacheKind,
    pub eager_preload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            prefix: DEFAULT_PREFIX.to_string(),
            router: RouterConfig::unlimited(),
            backend: BackendKind::Memory,
            data_dir: PathBuf::from("./stowage-data"),
            lmdb_max_size_mb: 1024,
            cache: CacheKind::None,
            eager_preload: false,
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STOWAGE_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` / `STOWAGE_PORT`: Listen port (default: 3000)
    /// - `STOWAGE_PREFIX`: Endpoint mount point (default: /storage)
    /// - `STOWAGE_DOCUMENTS_LIMIT`: Max documents, 0 = unlimited (default: 0)
    /// - `STOWAGE_MAX_DOCUMENT_SIZE`: Max body bytes, 0 = unlimited (default: 0)
    /// - `STOWAGE_BACKEND`: memory, lmdb or file (default: memory)
    /// - `STOWAGE_DATA_DIR`: Data directory (default: ./stowage-data)
    /// - `STOWAGE_LMDB_MAX_SIZE_MB`: LMDB map size (default: 1024)
    /// - `STOWAGE_CACHE`: none or memory (default: none)
    /// - `STOWAGE_EAGER_PRELOAD`: "true" or "false" (default: false)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind = lookup("STOWAGE_BIND").unwrap_or(defaults.bind);
        let port = match lookup("PORT").or_else(|| lookup("STOWAGE_PORT")) {
            Some(value) => parse_number("port", &value)?,
            None => defaults.port,
        };

        let prefix = match lookup("STOWAGE_PREFIX") {
            Some(value) => normalize_prefix(&value)?,
            None => defaults.prefix,
        };

        let documents_limit = match lookup("STOWAGE_DOCUMENTS_LIMIT") {
            Some(value) => parse_number("STOWAGE_DOCUMENTS_LIMIT", &value)?,
            None => 0,
        };
        let maximum_document_size = match lookup("STOWAGE_MAX_DOCUMENT_SIZE") {
            Some(value) => parse_number("STOWAGE_MAX_DOCUMENT_SIZE", &value)?,
            None => 0,
        };

        let backend = match lookup("STOWAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.backend,
        };
        let data_dir = lookup("STOWAGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let lmdb_max_size_mb = match lookup("STOWAGE_LMDB_MAX_SIZE_MB") {
            Some(value) => parse_number("STOWAGE_LMDB_MAX_SIZE_MB", &value)?,
            None => defaults.lmdb_max_size_mb,
        };

        let cache = match lookup("STOWAGE_CACHE") {
            Some(value) => value.parse()?,
            None => defaults.cache,
        };
        let eager_preload = lookup("STOWAGE_EAGER_PRELOAD")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Ok(Self {
            bind,
            port,
            prefix,
            router: RouterConfig::new(documents_limit, maximum_document_size),
            backend,
            data_dir,
            lmdb_max_size_mb,
            cache,
            eager_preload,
        })
    }

    /// Socket address built from `bind` and `port`.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}

fn parse_number<N: FromStr>(name: &str, value: &str) -> ApiResult<N> {
    value
        .trim()
        .parse::<N>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid {} value: {}", name, value)))
}

/// Trailing slashes are dropped; "/" becomes the root mount.
fn normalize_prefix(value: &str) -> ApiResult<String> {
    let prefix = value.trim().trim_end_matches('/');
    if !prefix.is_empty() && !prefix.starts_with('/') {
        return Err(ApiError::invalid_input(format!(
            "Invalid STOWAGE_PREFIX value: {} (must start with '/')",
            value
        )));
    }
    Ok(prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.router, RouterConfig::unlimited());
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.cache, CacheKind::None);
        assert!(!config.eager_preload);
    }

    #[test]
    fn test_full_config() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("STOWAGE_BIND", "127.0.0.1"),
            ("STOWAGE_PORT", "8080"),
            ("STOWAGE_PREFIX", "/api/docs/"),
            ("STOWAGE_DOCUMENTS_LIMIT", "100"),
            ("STOWAGE_MAX_DOCUMENT_SIZE", "4096"),
            ("STOWAGE_BACKEND", "LMDB"),
            ("STOWAGE_DATA_DIR", "/var/lib/stowage"),
            ("STOWAGE_CACHE", "memory"),
            ("STOWAGE_EAGER_PRELOAD", "true"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.prefix, "/api/docs");
        assert_eq!(config.router, RouterConfig::new(100, 4096));
        assert_eq!(config.backend, BackendKind::Lmdb);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/stowage"));
        assert_eq!(config.cache, CacheKind::Memory);
        assert!(config.eager_preload);
    }

    #[test]
    fn test_port_env_wins() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("STOWAGE_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_root_prefix() {
        let config = ServerConfig::from_lookup(lookup_from(&[("STOWAGE_PREFIX", "/")])).unwrap();
        assert_eq!(config.prefix, "");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for pairs in [
            [("STOWAGE_PORT", "http")],
            [("STOWAGE_BACKEND", "redis")],
            [("STOWAGE_CACHE", "lmdb")],
            [("STOWAGE_PREFIX", "storage")],
            [("STOWAGE_DOCUMENTS_LIMIT", "-1")],
        ] {
            let err = ServerConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert_eq!(err.code, crate::error::ErrorCode::InvalidInput, "{:?}", pairs);
        }
    }

    #[test]
    fn test_invalid_bind_addr() {
        let config = ServerConfig {
            bind: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.bind_addr().is_err());
    }
}
