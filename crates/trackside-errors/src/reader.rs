//! Reader session errors.
//!
//! This module provides the error type returned by the wire codec, the reader
//! link and the session controller.

use std::time::Duration;

use crate::common::{ErrorCategory, ErrorSeverity};

/// Reader session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    /// Connect, send or receive failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed message or missing mandatory sub-field
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The reader reported a non-success status
    #[error(
        "{operation} failed with status {code}: {}",
        .description.as_deref().unwrap_or("no error description given")
    )]
    DeviceStatus {
        /// Request that was refused
        operation: String,
        /// Raw status code from the status parameter
        code: u16,
        /// Optional human readable error description
        description: Option<String>,
    },

    /// A bounded wait expired
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Settings that cannot be applied to the reader
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReaderError::Transport(_) => ErrorCategory::Transport,
            ReaderError::Protocol(_) => ErrorCategory::Protocol,
            ReaderError::DeviceStatus { .. } => ErrorCategory::DeviceStatus,
            ReaderError::Timeout { .. } => ErrorCategory::Timeout,
            ReaderError::Config(_) => ErrorCategory::Config,
        }
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReaderError::Transport(_) => ErrorSeverity::Critical,
            ReaderError::Protocol(_) => ErrorSeverity::Error,
            ReaderError::DeviceStatus { .. } => ErrorSeverity::Error,
            ReaderError::Timeout { .. } => ErrorSeverity::Warning,
            ReaderError::Config(_) => ErrorSeverity::Error,
        }
    }

    /// Whether this error ends the report loop.
    ///
    /// Only transport failures are surfaced as connection loss while
    /// monitoring; everything else is logged and the loop continues.
    pub fn is_fatal_in_monitoring(&self) -> bool {
        matches!(self, ReaderError::Transport(_))
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReaderError::Timeout { .. })
    }

    /// Status code carried by a device status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ReaderError::DeviceStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        ReaderError::Transport(message.into())
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        ReaderError::Protocol(message.into())
    }

    /// Create a device status error.
    pub fn device_status(
        operation: impl Into<String>,
        code: u16,
        description: Option<String>,
    ) -> Self {
        ReaderError::DeviceStatus {
            operation: operation.into(),
            code,
            description: description.filter(|d| !d.is_empty()),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        ReaderError::Timeout {
            operation: operation.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ReaderError::Config(message.into())
    }
}

impl From<std::io::Error> for ReaderError {
    fn from(e: std::io::Error) -> Self {
        ReaderError::Transport(e.to_string())
    }
}
