//! Error types for the FRITZ!Box monitor
//!
//! This module provides the crate error enum with structured error codes,
//! severity classification and logging helpers.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, FritzboxError>;

/// Error types for call monitor and statistics operations
#[derive(Error, Debug)]
pub enum FritzboxError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration source errors
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors (response fields, devices)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Service unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionRefused,
    ConnectionLost,

    // Configuration errors (1200-1299)
    ConfigurationMissing,
    ConfigurationInvalid,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,
    FieldMissing,

    // Service errors (1600-1699)
    ServiceUnavailable,
    ExternalServiceError,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionRefused => 1002,
            ErrorCode::ConnectionLost => 1003,

            ErrorCode::ConfigurationMissing => 1201,
            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::FieldMissing => 1403,

            ErrorCode::ServiceUnavailable => 1601,
            ErrorCode::ExternalServiceError => 1603,

            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Medium severity - warning condition
    Warning,
    /// High severity - error condition
    Error,
}

impl FritzboxError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a parsing error
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        Self::Parsing(msg.into())
    }

    /// Map to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            FritzboxError::Connection(_) => ErrorCode::ConnectionLost,
            FritzboxError::Http(e) if e.is_timeout() => ErrorCode::ConnectionTimeout,
            FritzboxError::Http(e) if e.is_connect() => ErrorCode::ConnectionRefused,
            FritzboxError::Http(_) => ErrorCode::ExternalServiceError,
            FritzboxError::Json(_) => ErrorCode::ParsingFailed,
            FritzboxError::Config(_) => ErrorCode::ConfigurationInvalid,
            FritzboxError::ConfigSource(config::ConfigError::NotFound(_)) => {
                ErrorCode::ConfigurationMissing
            }
            FritzboxError::ConfigSource(_) => ErrorCode::ConfigurationInvalid,
            FritzboxError::Io(e) if e.kind() == io::ErrorKind::TimedOut => {
                ErrorCode::ConnectionTimeout
            }
            FritzboxError::Io(_) => ErrorCode::InternalError,
            FritzboxError::Timeout(_) => ErrorCode::ConnectionTimeout,
            FritzboxError::InvalidInput(_) => ErrorCode::InvalidInput,
            FritzboxError::NotFound(_) => ErrorCode::FieldMissing,
            FritzboxError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            FritzboxError::Parsing(_) => ErrorCode::ParsingFailed,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FritzboxError::Connection(_) | FritzboxError::Timeout(_) => ErrorSeverity::Warning,
            FritzboxError::InvalidInput(_) | FritzboxError::Parsing(_) => ErrorSeverity::Warning,
            FritzboxError::NotFound(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FritzboxError::Connection(_)
                | FritzboxError::Timeout(_)
                | FritzboxError::ServiceUnavailable(_)
                | FritzboxError::Http(_)
        )
    }
}

/// Classification of transport-level I/O errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The router could not be reached or refused the connection
    ConnectFailed,
    /// The router closed or reset an established connection
    ConnectionReset,
    /// Anything else
    Other,
}

/// Classify an I/O error raised by the call monitor socket
pub fn classify_io_error(error: &io::Error) -> TransportErrorKind {
    use io::ErrorKind;

    match error.kind() {
        ErrorKind::AddrInUse
        | ErrorKind::ConnectionRefused
        | ErrorKind::PermissionDenied
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable
        | ErrorKind::TimedOut => TransportErrorKind::ConnectFailed,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            TransportErrorKind::ConnectionReset
        }
        _ => TransportErrorKind::Other,
    }
}

/// Error logging utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with the severity it carries
    pub fn log_error(error: &FritzboxError, component: &str, operation: &str) {
        let code = error.to_error_code();

        match error.severity() {
            ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component = component,
                    operation = operation,
                    "Error occurred: {}",
                    error
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component = component,
                    operation = operation,
                    "Warning: {}",
                    error
                );
            }
        }
    }
}
