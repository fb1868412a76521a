//! Error types for building a client.
//!
//! Failures of individual storage calls are `StorageError::Transport`.

use crate::config::ClientConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ClientConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
