//! Types shared between Trackside reader sessions, the lap engine and the
//! presentation layer.
//!
//! Reader sessions produce [`ReaderEvent`]s, the lap engine consumes them and
//! both publish [`PresentationEvent`]s. Neither side blocks on the other:
//! every hand-off goes through an unbounded [`EventSink`].

pub mod presentation;
pub mod shutdown;
pub mod sighting;

pub use presentation::{
    CapabilityReport, EventSink, LapEvent, PowerLevel, PresentationEvent, PresentationSink,
};
pub use shutdown::StopSignal;
pub use sighting::{ReaderEvent, TagSighting, device_clock_now_us};

/// Sink carrying reader output to the lap engine.
pub type ReaderEventSink = EventSink<ReaderEvent>;
