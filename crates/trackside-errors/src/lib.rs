//! Centralized error types for Trackside
//!
//! Every failure a reader session can hit falls into one of four classes:
//!
//! - [`ReaderError::Transport`]: connect/send/receive failures. Fatal to the session.
//! - [`ReaderError::Protocol`]: malformed or unexpected messages. Fatal during the
//!   handshake, logged and skipped while monitoring.
//! - [`ReaderError::DeviceStatus`]: the reader answered with a non-success status.
//!   Fatal for mandatory steps, tolerated for optional ones.
//! - [`ReaderError::Timeout`]: no answer in time. Fatal during the handshake,
//!   benign while waiting for reports.
//!
//! [`ReaderError::Config`] covers settings that cannot be applied to the device
//! (for example a transmit power index the reader does not offer).
//!
//! # Example
//!
//! ```
//! use trackside_errors::prelude::*;
//! use std::time::Duration;
//!
//! fn await_notice(received: bool) -> ReaderResult<()> {
//!     if !received {
//!         return Err(ReaderError::timeout("connection notice", Duration::from_secs(10)));
//!     }
//!     Ok(())
//! }
//!
//! let err = await_notice(false).unwrap_err();
//! assert!(err.is_timeout());
//! assert_eq!(err.category(), ErrorCategory::Timeout);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod prelude;
pub mod reader;

pub use common::{ErrorCategory, ErrorSeverity};
pub use reader::ReaderError;

/// A specialized `Result` type for reader session operations.
pub type ReaderResult<T> = std::result::Result<T, ReaderError>;
