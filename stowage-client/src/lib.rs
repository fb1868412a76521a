//! STOWAGE Client - Storage over HTTP
//!
//! [`HttpStorage`] implements the same [`Storage`](stowage_core::Storage)
//! trait as the local backends, by calling a STOWAGE server. It can be used
//! on its own or as the source of a caching decorator.

pub mod config;
pub mod error;
pub mod http;

pub use config::{ClientConfig, ClientConfigError, DEFAULT_PREFIX};
pub use error::ClientError;
pub use http::HttpStorage;
