//! Error types for STOWAGE storage operations

use thiserror::Error;

/// Storage layer errors.
///
/// A missing record is never an error: `read` answers `Ok(None)` and
/// `remove` of an unknown id succeeds without doing anything.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("{backend} backend failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Transport failed{}: {message}", status_suffix(.status))]
    Transport { status: Option<u16>, message: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

impl StorageError {
    /// Create a backend failure for the named medium.
    pub fn backend(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a transport failure carrying the remote error text.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = StorageError::backend("lmdb", "map full");
        let msg = err.to_string();
        assert!(msg.contains("lmdb"));
        assert!(msg.contains("map full"));
    }

    #[test]
    fn test_transport_error_display_with_status() {
        let err = StorageError::transport(Some(413), "Maximum document size reached.");
        let msg = err.to_string();
        assert!(msg.contains("413"));
        assert!(msg.contains("Maximum document size reached."));
    }

    #[test]
    fn test_transport_error_display_without_status() {
        let err = StorageError::transport(None, "connection refused");
        assert_eq!(err.to_string(), "Transport failed: connection refused");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("invalid json should fail");
        let err = StorageError::from(json_err);
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[test]
    fn test_lock_poisoned_display() {
        assert_eq!(StorageError::LockPoisoned.to_string(), "Storage lock poisoned");
    }
}
