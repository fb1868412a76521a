//! Configuration loading for the STOWAGE HTTP client.
//!
//! `base_url` and `request_timeout_ms` are required; `prefix` defaults to
//! the server's default mount point.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Mount point used by the server when none is configured.
pub const DEFAULT_PREFIX: &str = "/storage";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub request_timeout_ms: u64,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("Missing configuration file path (use --config or STOWAGE_CLIENT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Build a config in code, mostly for tests and embedding.
    pub fn new(base_url: impl Into<String>, request_timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: default_prefix(),
            request_timeout_ms,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Load from `--config <path>` or `STOWAGE_CLIENT_CONFIG`, then validate.
    pub fn load() -> Result<Self, ClientConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ClientConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ClientConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ClientConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientConfigError::InvalidValue {
                field: "base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if !self.prefix.is_empty() && !self.prefix.starts_with('/') {
            return Err(ClientConfigError::InvalidValue {
                field: "prefix",
                reason: "must be empty or start with '/'".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL joined with the prefix, without a trailing slash.
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim().trim_end_matches('/'),
            self.prefix.trim_end_matches('/')
        )
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("STOWAGE_CLIENT_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_toml_uses_default_prefix() {
        let config = ClientConfig::from_toml(
            r#"
base_url = "http://localhost:3000"
request_timeout_ms = 5000
"#,
        )
        .unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint(), "http://localhost:3000/storage");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = ClientConfig::from_toml(
            r#"
base_url = "http://localhost:3000"
request_timeout_ms = 5000
retries = 3
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClientConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty = ClientConfig::new("  ", 1000);
        assert!(matches!(
            empty.validate(),
            Err(ClientConfigError::InvalidValue { field: "base_url", .. })
        ));

        let no_scheme = ClientConfig::new("localhost:3000", 1000);
        assert!(no_scheme.validate().is_err());

        let zero_timeout = ClientConfig::new("http://localhost", 0);
        assert!(matches!(
            zero_timeout.validate(),
            Err(ClientConfigError::InvalidValue { field: "request_timeout_ms", .. })
        ));

        let bad_prefix = ClientConfig::new("http://localhost", 10).with_prefix("storage");
        assert!(bad_prefix.validate().is_err());
    }

    #[test]
    fn test_endpoint_trims_slashes() {
        let config = ClientConfig::new("http://localhost:3000/", 10).with_prefix("/api/");
        assert_eq!(config.endpoint(), "http://localhost:3000/api");

        let bare = ClientConfig::new("http://localhost:3000", 10).with_prefix("");
        assert_eq!(bare.endpoint(), "http://localhost:3000");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = \"https://store.example\"").unwrap();
        writeln!(file, "prefix = \"/docs\"").unwrap();
        writeln!(file, "request_timeout_ms = 250").unwrap();

        let config = ClientConfig::from_path(file.path()).unwrap();
        assert_eq!(config.endpoint(), "https://store.example/docs");
        assert_eq!(config.request_timeout_ms, 250);
    }
}
