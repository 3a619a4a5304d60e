//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 403 Forbidden - Required permissions were refused.
    Forbidden {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - Operation cannot be completed due to current state.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },

    /// 503 Service Unavailable - The Bluetooth radio is unavailable.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "validation_failed",
    "message": "Fill both title and time",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "permission_denied").
    #[schema(example = "validation_failed")]
    pub error: String,

    /// Human-readable error message, suitable for an alert.
    #[schema(example = "Fill both title and time")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Forbidden { error_code, message } => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Conflict { error_code, message } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }

            Self::ServiceUnavailable {
                error_code,
                message,
                details,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: details.map(|d| serde_json::json!(d)),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::Forbidden { message, .. } => write!(f, "Forbidden: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::InternalError { message, .. } => {
                write!(f, "Internal Error: {message}")
            }
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from smrki_core errors.
///
/// The status comes from [`smrki_core::SmrkiError::http_status_code`].
impl From<smrki_core::SmrkiError> for ApiError {
    fn from(err: smrki_core::SmrkiError) -> Self {
        if !err.is_user_error() {
            tracing::warn!(error = %err, "Request failed");
        }

        let error_code = err.error_code().to_lowercase();
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::BadRequest {
                error_code,
                message,
            },
            403 => Self::Forbidden {
                error_code,
                message,
            },
            404 => Self::NotFound {
                error_code,
                message,
            },
            409 => Self::Conflict {
                error_code,
                message,
            },
            503 => Self::ServiceUnavailable {
                error_code,
                message,
                details: err
                    .is_bluetooth_error()
                    .then(|| "Check that the adapter is present and powered on".to_string()),
            },
            _ => Self::InternalError {
                error_code,
                message,
                details: err
                    .is_storage_error()
                    .then(|| "Check that the data directory is writable".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smrki_core::SmrkiError;

    #[test]
    fn test_bad_request_error() {
        let err = ApiError::BadRequest {
            error_code: "test_error".to_string(),
            message: "Test message".to_string(),
        };
        assert!(err.to_string().contains("Bad Request"));
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "test_error".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
    }

    #[test]
    fn test_core_errors_map_to_status_codes() {
        let cases = [
            (SmrkiError::ValidationFailed("x".into()), StatusCode::BAD_REQUEST),
            (SmrkiError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (SmrkiError::ScheduleNotFound("x".into()), StatusCode::NOT_FOUND),
            (SmrkiError::ScanInProgress, StatusCode::CONFLICT),
            (
                SmrkiError::BluetoothAdapterNotFound,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SmrkiError::PersistenceError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SmrkiError::ConfigValidationError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SmrkiError::NotificationFailed("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let expected = err.http_status_code();
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[test]
    fn test_error_code_is_snake_case() {
        let err = ApiError::from(SmrkiError::ScanInProgress);
        assert!(matches!(err, ApiError::Conflict { ref error_code, .. } if error_code == "scan_in_progress"));
    }
}
