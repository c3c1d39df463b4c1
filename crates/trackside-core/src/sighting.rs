//! Normalised reader output.

use std::time::{SystemTime, UNIX_EPOCH};

/// One observation of one tag by one antenna.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSighting {
    pub reader_id: String,
    pub antenna_id: u16,
    /// Lowercase hex of the canonical EPC bytes
    pub tag_id: String,
    /// Microseconds on the reader clock
    pub device_timestamp_us: u64,
    /// Local clock at the moment the report was decoded
    pub arrived_at: SystemTime,
}

impl TagSighting {
    pub fn new(
        reader_id: impl Into<String>,
        antenna_id: u16,
        tag_id: impl Into<String>,
        device_timestamp_us: u64,
    ) -> Self {
        Self {
            reader_id: reader_id.into(),
            antenna_id,
            tag_id: tag_id.into(),
            device_timestamp_us,
            arrived_at: SystemTime::now(),
        }
    }
}

/// Everything a reader session emits towards the lap engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Sighting(TagSighting),
    Antenna {
        reader_id: String,
        antenna_id: u16,
        connected: bool,
    },
    Exception {
        reader_id: String,
        message: Option<String>,
    },
}

impl ReaderEvent {
    pub fn reader_id(&self) -> &str {
        match self {
            ReaderEvent::Sighting(s) => &s.reader_id,
            ReaderEvent::Antenna { reader_id, .. } | ReaderEvent::Exception { reader_id, .. } => {
                reader_id
            }
        }
    }
}

/// Current UTC time in microseconds, the clock readers stamp sightings with.
pub fn device_clock_now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
