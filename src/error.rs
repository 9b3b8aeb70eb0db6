//! # Error Handling
//!
//! Application-level error type and its conversion into HTTP responses.
//!
//! ## Layers:
//! - **Codec errors** (`container::EncodingError`, `container::FormatError`):
//!   typed with `thiserror`, returned by the pure encode/decode functions
//! - **anyhow::Error**: startup, configuration and bundle packaging
//! - **AppError**: what handlers return; actix turns it into a JSON response
//!
//! ## JSON Response Format:
//! ```json
//! {
//!   "error": {
//!     "type": "format_error",
//!     "message": "bad magic: expected \"DWPv1\"",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use crate::container::FormatError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Message returned to clients for failures on our side.
///
/// Details go to the log only; clients cannot act on them.
pub const GENERIC_SERVER_ERROR: &str = "server error";

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Internal**: Server-side problems, including container encoding failures (500)
/// - **BadRequest**: Malformed multipart data or manifest JSON (400)
/// - **NotFound**: Requested resource doesn't exist (404)
/// - **ConfigError**: Configuration problems (500)
/// - **ValidationError**: Input failed validation rules (400)
/// - **PayloadTooLarge**: An upload exceeded a configured limit (413)
/// - **FormatError**: A posted container could not be decoded (400)
#[derive(Debug)]
pub enum AppError {
    Internal(String),
    BadRequest(String),
    NotFound(String),
    ConfigError(String),
    ValidationError(String),
    PayloadTooLarge(String),
    FormatError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::FormatError(msg) => write!(f, "Container format error: {}", msg),
        }
    }
}

impl AppError {
    /// Machine-readable error type used in the JSON body.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::FormatError(_) => "format_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ConfigError(msg)
            | AppError::ValidationError(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::FormatError(msg) => msg,
        }
    }
}

/// Convert errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - Internal/ConfigError → 500
/// - BadRequest/ValidationError/FormatError → 400
/// - NotFound → 404
/// - PayloadTooLarge → 413
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) | AppError::ValidationError(_) | AppError::FormatError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.message(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Conversion from anyhow::Error to AppError.
///
/// anyhow errors come from packaging and other server-side work, so the full
/// error chain is logged and the client only sees a generic message.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "Request failed with internal error");
        AppError::Internal(GENERIC_SERVER_ERROR.to_string())
    }
}

/// JSON parsing errors are almost always the client's fault (400).
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// A posted container that fails to decode is a client error.
impl From<FormatError> for AppError {
    fn from(err: FormatError) -> Self {
        AppError::FormatError(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::FormatError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PayloadTooLarge("x".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_anyhow_errors_hide_details() {
        let err: AppError = anyhow::anyhow!("zip writer exploded at offset 42").into();
        assert_eq!(err.message(), GENERIC_SERVER_ERROR);

        let body = err.error_response().into_body().try_into_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["type"], "internal_error");
        assert_eq!(json["error"]["message"], "server error");
    }

    #[test]
    fn test_format_error_conversion() {
        let err: AppError = FormatError::BadMagic.into();
        assert_eq!(err.error_type(), "format_error");
        assert!(err.to_string().contains("bad magic"));
    }
}
