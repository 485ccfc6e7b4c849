//! Service error types with HTTP status code mapping.
//!
//! [`StorageError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "folder not found: /docs/",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request (1004: 413)  |
/// | 2000–2099 | Not Found       | 404 Not Found                |
/// | 2100–2199 | Conflict        | 409 Conflict                 |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A folder or file name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The uploaded file extension is not on the allow-list.
    #[error("extension '{0}' not allowed")]
    ExtensionNotAllowed(String),

    /// The request body exceeded the upload limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// No folder matches the given id or path.
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// No file matches the given id or path.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A folder already occupies the requested virtual path.
    #[error("folder at '{0}' already exists")]
    FolderAlreadyExists(String),

    /// Database constraint or filesystem conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(String),

    /// Filesystem failure.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidName(_) => 1002,
            Self::ExtensionNotAllowed(_) => 1003,
            Self::PayloadTooLarge(_) => 1004,
            Self::FolderNotFound(_) => 2001,
            Self::FileNotFound(_) => 2002,
            Self::FolderAlreadyExists(_) => 2101,
            Self::Conflict(_) => 2102,
            Self::Internal(_) => 3000,
            Self::Database(_) => 3001,
            Self::Filesystem(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidName(_) | Self::ExtensionNotAllowed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::FolderNotFound(_) | Self::FileNotFound(_) => StatusCode::NOT_FOUND,
            Self::FolderAlreadyExists(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Filesystem(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return Self::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!(
                    "referenced folder does not exist: {}",
                    db_err.message()
                ));
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Filesystem(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for StorageError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::InvalidRequest(err.body_text())
        }
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        for err in [
            StorageError::InvalidRequest("x".into()),
            StorageError::InvalidName("x".into()),
            StorageError::ExtensionNotAllowed(".exe".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!((1000..2000).contains(&err.error_code()));
        }
    }

    #[test]
    fn not_found_and_conflict_statuses() {
        assert_eq!(
            StorageError::FolderNotFound("/a/".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StorageError::FileNotFound("/a/b".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StorageError::FolderAlreadyExists("/a/".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StorageError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn io_errors_map_to_filesystem() {
        let err = StorageError::from(std::io::Error::other("disk on fire"));
        assert_eq!(err.error_code(), 3002);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn row_not_found_maps_to_database() {
        let err = StorageError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn response_carries_status_and_message() {
        let response = StorageError::FolderAlreadyExists("/docs/".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn payload_too_large_status() {
        let err = StorageError::PayloadTooLarge("limit".into());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.error_code(), 1004);
    }

    #[test]
    fn extension_message_mentions_extension() {
        let err = StorageError::ExtensionNotAllowed(".exe".into());
        assert_eq!(err.to_string(), "extension '.exe' not allowed");
    }
}
