//! Error types for the chatvault library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the application. The enum doubles as the
//! HTTP error surface: every variant knows its status code and is rendered as a JSON
//! body through axum's `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the chatvault application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed upload: not a ZIP, missing conversations.json, bad JSON,
    /// or an invalid field value. Surfaced as a 400.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Requested export, conversation, or media does not exist (or is
    /// scoped to a different export). Surfaced as a 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors during media extraction or serving
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Archive errors while reading ZIP entries
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // A broken archive is a defect in the upload, not in us.
            Self::Validation(_) | Self::Archive(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Pool(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database_error",
            Self::Pool(_) => "pool_error",
            Self::Storage(_) => "storage_error",
            Self::Archive(_) => "invalid_archive",
            Self::Serialization(_) => "serialization_error",
            Self::Other(_) => "internal_error",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error detail.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable error code.
    pub code: String,
    /// Human-readable message naming the specific defect.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
            crate::metrics::MetricsCollector::record_error(self.error_code());
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Validation("bad zip".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("export".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Other("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::Validation("x".into()).error_code(),
            "validation_error"
        );
        assert_eq!(AppError::NotFound("x".into()).error_code(), "not_found");
    }
}
