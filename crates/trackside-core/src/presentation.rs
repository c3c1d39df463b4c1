//! Notifications for the presentation layer.
//!
//! The core never waits on presentation. Events are pushed into an unbounded
//! queue and the renderer drains it at its own pace.

use tokio::sync::mpsc;
use trackside_errors::ErrorSeverity;

/// A lap engine result worth showing.
#[derive(Debug, Clone, PartialEq)]
pub struct LapEvent {
    pub rider_name: String,
    pub tag_id: String,
    pub device_timestamp_us: u64,
    /// Zero when the sighting did not close a lap
    pub lap_secs: f64,
    pub lap_count: u32,
}

/// One selectable transmit power level, in dBm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLevel {
    pub index: u16,
    pub dbm: f64,
}

/// What a reader said about itself during the handshake.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapabilityReport {
    pub manufacturer: u32,
    pub model: u32,
    pub firmware_version: String,
    pub max_antennas: u16,
    pub transmit_power_table: Vec<PowerLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    Log {
        severity: ErrorSeverity,
        source: String,
        text: String,
    },
    Lap(LapEvent),
    ReaderStatus {
        reader_id: String,
        state: String,
        capabilities: Option<CapabilityReport>,
    },
}

/// Non-blocking, cloneable sender half of an event queue.
///
/// A sink whose receiver has gone away silently discards events.
#[derive(Debug)]
pub struct EventSink<T> {
    tx: Option<mpsc::UnboundedSender<T>>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSink<T> {
    /// A connected sink and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything.
    pub fn null() -> Self {
        Self { tx: None }
    }

    /// Queue an event. Returns false if nobody is listening.
    pub fn emit(&self, event: T) -> bool {
        match &self.tx {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl EventSink<PresentationEvent> {
    pub fn log(&self, severity: ErrorSeverity, source: &str, text: impl Into<String>) {
        self.emit(PresentationEvent::Log {
            severity,
            source: source.to_string(),
            text: text.into(),
        });
    }
}

pub type PresentationSink = EventSink<PresentationEvent>;
