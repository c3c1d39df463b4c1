//! Prelude module for convenient error handling imports.

pub use crate::{
    ReaderResult,
    common::{ErrorCategory, ErrorSeverity},
    reader::ReaderError,
};
