//! Unit tests for all error variants.
//!
//! Tests Display implementations, classification helpers and the
//! std::error::Error implementation.

use std::time::Duration;

use proptest::prelude::*;
use trackside_errors::prelude::*;

fn all_variants() -> Vec<ReaderError> {
    vec![
        ReaderError::transport("connection refused"),
        ReaderError::protocol("missing LLRPStatus"),
        ReaderError::device_status("ENABLE_ROSPEC", 300, Some("invalid id".into())),
        ReaderError::timeout("GET_READER_CONFIG", Duration::from_secs(3)),
        ReaderError::config("transmit power index 99 not offered"),
    ]
}

#[test]
fn test_all_variants_display() {
    for variant in all_variants() {
        let msg = variant.to_string();
        assert!(!msg.is_empty(), "ReaderError variant should have display message");
    }
}

#[test]
fn test_std_error_impl() {
    let err = ReaderError::protocol("truncated frame");
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_categories_are_distinct() {
    let mut categories: Vec<ErrorCategory> =
        all_variants().iter().map(ReaderError::category).collect();
    categories.dedup();
    assert_eq!(categories.len(), 5);
}

#[test]
fn test_only_timeouts_report_is_timeout() {
    let timeouts = all_variants().iter().filter(|e| e.is_timeout()).count();
    assert_eq!(timeouts, 1);
}

proptest! {
    #[test]
    fn timeout_keeps_millisecond_value(ms in 0u64..10_000_000) {
        let err = ReaderError::timeout("recv", Duration::from_millis(ms));
        prop_assert_eq!(err, ReaderError::Timeout { operation: "recv".into(), timeout_ms: ms });
    }

    #[test]
    fn device_status_round_trips_code(code in any::<u16>()) {
        let err = ReaderError::device_status("op", code, None);
        prop_assert_eq!(err.status_code(), Some(code));
        prop_assert_eq!(err.severity(), ErrorSeverity::Error);
    }
}
