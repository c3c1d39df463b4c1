//! Error classification shared by every Trackside crate.

use core::fmt;

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Connect, send or receive failures
    Transport = 0,
    /// Malformed or unexpected messages
    Protocol = 1,
    /// Non-success status reported by the reader
    DeviceStatus = 2,
    /// Bounded waits that expired
    Timeout = 3,
    /// Settings that cannot be applied
    Config = 4,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "Transport"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::DeviceStatus => write!(f, "DeviceStatus"),
            ErrorCategory::Timeout => write!(f, "Timeout"),
            ErrorCategory::Config => write!(f, "Config"),
        }
    }
}

/// Error severity level.
///
/// Also used as the level of diagnostic lines handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the session cannot continue
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
