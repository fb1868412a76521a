//! Error Types for STOWAGE API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use stowage_core::StorageError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur while serving a storage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Request Errors (400)
    // ========================================================================
    /// Action name is not part of the storage protocol
    UnknownAction,

    /// Request body could not be interpreted
    InvalidInput,

    // ========================================================================
    // Limit Errors (413, 422)
    // ========================================================================
    /// Creating another document would exceed the documents limit
    DocumentsLimitExceeded,

    /// Request body exceeds the maximum document size
    DocumentTooLarge,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// The storage backend failed
    StorageFailure,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::UnknownAction | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,

            ErrorCode::DocumentsLimitExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DocumentTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            ErrorCode::StorageFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::UnknownAction => "Unknown action.",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::DocumentsLimitExceeded => "Maximum documents count reached.",
            ErrorCode::DocumentTooLarge => "Maximum document size reached.",
            ErrorCode::StorageFailure => "Storage operation failed",
            ErrorCode::InternalError => "Internal server error",
        }
    }

    /// Whether this code belongs to the limit family (request rejected,
    /// storage untouched).
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            ErrorCode::DocumentsLimitExceeded | ErrorCode::DocumentTooLarge
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an UnknownAction error.
    pub fn unknown_action(action: &str) -> Self {
        Self::new(ErrorCode::UnknownAction, format!("Unknown action: {action}"))
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a DocumentsLimitExceeded error.
    pub fn documents_limit_exceeded() -> Self {
        Self::from_code(ErrorCode::DocumentsLimitExceeded)
    }

    /// Create a DocumentTooLarge error.
    pub fn document_too_large() -> Self {
        Self::from_code(ErrorCode::DocumentTooLarge)
    }

    /// Create a StorageFailure error.
    pub fn storage_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageFailure, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// Convert from StorageError to ApiError.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPayload { reason } => ApiError::invalid_input(reason),
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::storage_failure(other.to_string())
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
