//! LLRP codec error types.

use thiserror::Error;
use trackside_errors::ReaderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlrpError {
    #[error("Truncated {context}: needed {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Invalid length in {context}: {length}")]
    InvalidLength { context: &'static str, length: usize },

    #[error("Frame of {length} bytes exceeds maximum {max}")]
    FrameTooLarge { length: usize, max: usize },

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown TV parameter type: {0}")]
    UnknownTvType(u8),

    #[error("Invalid value {value} for field {field}")]
    InvalidField { field: &'static str, value: u32 },

    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Field {field} overflows its wire width ({length})")]
    FieldOverflow { field: &'static str, length: usize },
}

pub type LlrpResult<T> = Result<T, LlrpError>;

impl From<LlrpError> for ReaderError {
    fn from(e: LlrpError) -> Self {
        ReaderError::Protocol(e.to_string())
    }
}
