//! Unified error types for the smrki core library.
//!
//! [`SmrkiError`] covers every failure mode across the crate. The Bluetooth
//! module keeps its own [`BluetoothError`](crate::bluetooth::BluetoothError)
//! for backend-level detail, which converts into the unified type.
//!
//! Errors fall into three groups:
//!
//! - **User-facing**: permission denial and form validation. These are the
//!   only failures the controller reports back to the caller.
//! - **Platform**: scan, storage and notification failures. The controller
//!   logs and swallows these during background work.
//! - **Configuration**: raised at startup only.
//!
//! # Example
//!
//! ```rust
//! use smrki_core::error::{Result, SmrkiError};
//!
//! fn require_title(title: &str) -> Result<()> {
//!     if title.is_empty() {
//!         return Err(SmrkiError::ValidationFailed("Fill both title and time".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The unified error type for all smrki operations.
#[derive(Debug, Error)]
pub enum SmrkiError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Bluetooth device scanning failed.
    #[error("Bluetooth scan failed: {0}")]
    BluetoothScanFailed(String),

    /// A scan session is already running.
    #[error("A scan is already in progress")]
    ScanInProgress,

    // =========================================================================
    // USER-FACING ERRORS
    // =========================================================================
    /// The radio permissions were not granted.
    #[error("Permissions required: {0}")]
    PermissionDenied(String),

    /// The schedule form is incomplete.
    #[error("{0}")]
    ValidationFailed(String),

    /// No schedule with the given id exists.
    #[error("Schedule not found: '{0}'")]
    ScheduleNotFound(String),

    // =========================================================================
    // NOTIFICATION ERRORS
    // =========================================================================
    /// The notification backend rejected a request.
    #[error("Failed to schedule notification: {0}")]
    NotificationFailed(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for smrki operations.
pub type Result<T> = std::result::Result<T, SmrkiError>;

impl SmrkiError {
    /// Returns `true` if this error is related to Bluetooth operations.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::BluetoothAdapterNotFound
                | Self::BluetoothAdapterPoweredOff
                | Self::BluetoothScanFailed(_)
                | Self::ScanInProgress
        )
    }

    /// Returns `true` if this error should be shown to the user as an alert.
    #[inline]
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::ValidationFailed(_) | Self::ScheduleNotFound(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::PersistenceError(_) | Self::SerializationError(_) | Self::IoError(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::ScheduleNotFound(_) => 404,
            Self::ScanInProgress => 409,
            Self::ConfigParseError(_)
            | Self::ConfigValidationError(_)
            | Self::NotificationFailed(_)
            | Self::PersistenceError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff
            | Self::BluetoothScanFailed(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothScanFailed(_) => "BLUETOOTH_SCAN_FAILED",
            Self::ScanInProgress => "SCAN_IN_PROGRESS",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::ScheduleNotFound(_) => "SCHEDULE_NOT_FOUND",
            Self::NotificationFailed(_) => "NOTIFICATION_FAILED",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::bluetooth::BluetoothError> for SmrkiError {
    fn from(err: crate::bluetooth::BluetoothError) -> Self {
        use crate::bluetooth::BluetoothError;
        match err {
            BluetoothError::AdapterNotFound => Self::BluetoothAdapterNotFound,
            BluetoothError::AdapterPoweredOff => Self::BluetoothAdapterPoweredOff,
            BluetoothError::SessionInitFailed { message }
            | BluetoothError::DiscoveryFailed { message }
            | BluetoothError::Internal { message } => Self::BluetoothScanFailed(message),
        }
    }
}

impl From<config::ConfigError> for SmrkiError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigParseError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_bluetooth_error_classification() {
        assert!(SmrkiError::BluetoothAdapterNotFound.is_bluetooth_error());
        assert!(SmrkiError::BluetoothAdapterPoweredOff.is_bluetooth_error());
        assert!(SmrkiError::BluetoothScanFailed("test".into()).is_bluetooth_error());
        assert!(SmrkiError::ScanInProgress.is_bluetooth_error());

        assert!(!SmrkiError::ValidationFailed("x".into()).is_bluetooth_error());
    }

    #[test]
    fn test_user_error_classification() {
        assert!(SmrkiError::PermissionDenied("scan".into()).is_user_error());
        assert!(SmrkiError::ValidationFailed("empty".into()).is_user_error());
        assert!(SmrkiError::ScheduleNotFound("1".into()).is_user_error());

        assert!(!SmrkiError::PersistenceError("disk full".into()).is_user_error());
    }

    #[test]
    fn test_storage_error_classification() {
        assert!(SmrkiError::PersistenceError("disk full".into()).is_storage_error());
        assert!(SmrkiError::IoError(IoErr::new(ErrorKind::NotFound, "test")).is_storage_error());
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        assert!(SmrkiError::from(json_err).is_storage_error());

        assert!(!SmrkiError::BluetoothAdapterNotFound.is_storage_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            SmrkiError::ValidationFailed("bad".into()).http_status_code(),
            400
        );
        assert_eq!(
            SmrkiError::PermissionDenied("scan".into()).http_status_code(),
            403
        );
        assert_eq!(
            SmrkiError::ScheduleNotFound("1".into()).http_status_code(),
            404
        );
        assert_eq!(SmrkiError::ScanInProgress.http_status_code(), 409);
        assert_eq!(
            SmrkiError::PersistenceError("error".into()).http_status_code(),
            500
        );
        assert_eq!(SmrkiError::BluetoothAdapterNotFound.http_status_code(), 503);
        assert_eq!(
            SmrkiError::ConfigValidationError("zero".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SmrkiError::BluetoothAdapterNotFound.error_code(),
            "BLUETOOTH_ADAPTER_NOT_FOUND"
        );
        assert_eq!(
            SmrkiError::PermissionDenied(String::new()).error_code(),
            "PERMISSION_DENIED"
        );
        assert_eq!(
            SmrkiError::ValidationFailed(String::new()).error_code(),
            "VALIDATION_FAILED"
        );
    }

    #[test]
    fn test_from_bluetooth_error() {
        use crate::bluetooth::BluetoothError;

        let err: SmrkiError = BluetoothError::AdapterPoweredOff.into();
        assert!(matches!(err, SmrkiError::BluetoothAdapterPoweredOff));

        let err: SmrkiError = BluetoothError::DiscoveryFailed {
            message: "busy".into(),
        }
        .into();
        assert!(matches!(err, SmrkiError::BluetoothScanFailed(ref m) if m == "busy"));
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = SmrkiError::ValidationFailed("Fill both title and time".into());
        assert_eq!(err.to_string(), "Fill both title and time");
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SmrkiError>();
        assert_sync::<SmrkiError>();
    }
}
