//! Normalisation of reader output into [`ReaderEvent`]s.

use std::fmt;

use tracing::{debug, info, warn};
use trackside_core::{PresentationSink, ReaderEvent, ReaderEventSink, TagSighting};
use trackside_errors::ErrorSeverity;
use trackside_llrp_protocol::{AntennaEventType, ReaderEventNotificationData, TagReportData};

/// Why a tag report record could not be turned into a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDefect {
    MissingEpc,
    MissingAntenna,
    MissingFirstSeen,
}

impl fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordDefect::MissingEpc => "no EPC",
            RecordDefect::MissingAntenna => "no antenna id",
            RecordDefect::MissingFirstSeen => "no first-seen timestamp",
        })
    }
}

/// Counters kept by a [`TagEventStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub sightings: u64,
    pub dropped_records: u64,
    pub reader_events: u64,
}

/// Turns decoded reports and notifications from one reader into an ordered
/// stream of [`ReaderEvent`]s.
pub struct TagEventStream {
    reader_id: String,
    events: ReaderEventSink,
    presentation: PresentationSink,
    stats: StreamStats,
}

impl TagEventStream {
    pub fn new(
        reader_id: impl Into<String>,
        events: ReaderEventSink,
        presentation: PresentationSink,
    ) -> Self {
        Self {
            reader_id: reader_id.into(),
            events,
            presentation,
            stats: StreamStats::default(),
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Build a sighting from one tag report record.
    ///
    /// The first-seen UTC timestamp is preferred; the uptime form is used
    /// when a reader has no UTC clock.
    ///
    /// # Errors
    ///
    /// Returns the first mandatory field the record lacks.
    pub fn normalize(reader_id: &str, record: &TagReportData) -> Result<TagSighting, RecordDefect> {
        let epc = record.epc.as_ref().ok_or(RecordDefect::MissingEpc)?;
        let antenna_id = record.antenna_id.ok_or(RecordDefect::MissingAntenna)?;
        let timestamp = record
            .first_seen_utc
            .or(record.first_seen_uptime)
            .ok_or(RecordDefect::MissingFirstSeen)?;
        Ok(TagSighting::new(reader_id, antenna_id, epc.to_hex(), timestamp))
    }

    /// Emit one sighting per usable record. Returns the number emitted.
    pub fn on_tag_report(&mut self, records: &[TagReportData]) -> usize {
        let mut emitted = 0;
        for record in records {
            match Self::normalize(&self.reader_id, record) {
                Ok(sighting) => {
                    self.emit_sighting(sighting);
                    emitted += 1;
                }
                Err(defect) => {
                    self.stats.dropped_records += 1;
                    warn!(reader_id = %self.reader_id, %defect, "Dropping tag report record");
                    self.presentation.log(
                        ErrorSeverity::Warning,
                        &self.reader_id,
                        format!("dropped tag report record: {defect}"),
                    );
                }
            }
        }
        emitted
    }

    /// Emit a sighting that is already normalised.
    pub fn emit_sighting(&mut self, sighting: TagSighting) {
        debug!(
            reader_id = %self.reader_id,
            tag = %sighting.tag_id,
            antenna = sighting.antenna_id,
            timestamp_us = sighting.device_timestamp_us,
            "Tag sighting"
        );
        self.stats.sightings += 1;
        self.events.emit(ReaderEvent::Sighting(sighting));
    }

    /// Log and forward the events carried by a READER_EVENT_NOTIFICATION.
    pub fn on_reader_event(&mut self, data: &ReaderEventNotificationData) {
        self.stats.reader_events += 1;
        let reader_id = self.reader_id.clone();

        if let Some(event) = data.antenna_event {
            match event.event_type {
                AntennaEventType::Connected | AntennaEventType::Disconnected => {
                    let connected = event.event_type == AntennaEventType::Connected;
                    let text = format!(
                        "antenna {} {}",
                        event.antenna_id,
                        if connected { "connected" } else { "disconnected" }
                    );
                    if connected {
                        info!(%reader_id, antenna = event.antenna_id, "Antenna connected");
                        self.presentation.log(ErrorSeverity::Info, &reader_id, text);
                    } else {
                        warn!(%reader_id, antenna = event.antenna_id, "Antenna disconnected");
                        self.presentation.log(ErrorSeverity::Warning, &reader_id, text);
                    }
                    self.events.emit(ReaderEvent::Antenna {
                        reader_id: reader_id.clone(),
                        antenna_id: event.antenna_id,
                        connected,
                    });
                }
                AntennaEventType::Other(kind) => {
                    debug!(%reader_id, kind, antenna = event.antenna_id, "Unrecognised antenna event");
                }
            }
        }

        if let Some(message) = &data.reader_exception {
            let message = Some(message.trim().to_string()).filter(|m| !m.is_empty());
            warn!(%reader_id, message = message.as_deref().unwrap_or(""), "Reader exception");
            self.presentation.log(
                ErrorSeverity::Warning,
                &reader_id,
                format!(
                    "reader exception: {}",
                    message.as_deref().unwrap_or("no message")
                ),
            );
            self.events.emit(ReaderEvent::Exception {
                reader_id: reader_id.clone(),
                message,
            });
        }

        if data.connection_closed {
            info!(%reader_id, "Reader reported connection close");
        }
        if let Some(status) = data.connection_attempt {
            debug!(%reader_id, ?status, "Connection attempt event while monitoring");
        }
        for kind in &data.other_events {
            debug!(%reader_id, kind, "Ignoring unrecognised reader event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackside_core::{EventSink, PresentationEvent};
    use trackside_llrp_protocol::{AntennaEvent, Epc, EventTimestamp};

    fn stream() -> (
        TagEventStream,
        tokio::sync::mpsc::UnboundedReceiver<ReaderEvent>,
        tokio::sync::mpsc::UnboundedReceiver<PresentationEvent>,
    ) {
        let (events, rx) = EventSink::channel();
        let (presentation, log_rx) = EventSink::channel();
        (TagEventStream::new("gate", events, presentation), rx, log_rx)
    }

    fn epc() -> Epc {
        Epc::from_bytes(&[0x20, 0x16, 0, 0, 0, 7])
    }

    #[test]
    fn test_normalize_prefers_utc() {
        let mut record = TagReportData::sighting(epc(), 2, 5_000_000);
        record.first_seen_uptime = Some(17);
        let sighting = TagEventStream::normalize("gate", &record);
        assert!(matches!(
            sighting,
            Ok(TagSighting { antenna_id: 2, device_timestamp_us: 5_000_000, ref tag_id, .. })
                if tag_id == "201600000007"
        ));
    }

    #[test]
    fn test_normalize_falls_back_to_uptime() {
        let record = TagReportData {
            epc: Some(epc()),
            antenna_id: Some(1),
            first_seen_uptime: Some(42),
            ..TagReportData::default()
        };
        let sighting = TagEventStream::normalize("gate", &record);
        assert_eq!(sighting.map(|s| s.device_timestamp_us), Ok(42));
    }

    #[test]
    fn test_incomplete_records_are_dropped_not_fatal() {
        let (mut stream, mut rx, mut log_rx) = stream();
        let complete = TagReportData::sighting(epc(), 1, 10);
        let no_antenna = TagReportData {
            antenna_id: None,
            ..complete.clone()
        };
        let no_time = TagReportData {
            first_seen_utc: None,
            ..complete.clone()
        };
        let no_epc = TagReportData {
            epc: None,
            ..complete.clone()
        };

        let emitted = stream.on_tag_report(&[no_antenna, complete, no_time, no_epc]);
        assert_eq!(emitted, 1);
        assert_eq!(
            stream.stats(),
            StreamStats {
                sightings: 1,
                dropped_records: 3,
                reader_events: 0
            }
        );
        assert!(matches!(rx.try_recv(), Ok(ReaderEvent::Sighting(_))));
        assert!(rx.try_recv().is_err());
        let logs = std::iter::from_fn(|| log_rx.try_recv().ok()).count();
        assert_eq!(logs, 3);
    }

    #[test]
    fn test_antenna_and_exception_events_are_forwarded() {
        let (mut stream, mut rx, _log_rx) = stream();
        stream.on_reader_event(&ReaderEventNotificationData {
            timestamp: Some(EventTimestamp::Utc(1)),
            antenna_event: Some(AntennaEvent {
                event_type: AntennaEventType::Disconnected,
                antenna_id: 3,
            }),
            reader_exception: Some("  ".to_string()),
            other_events: vec![250],
            ..ReaderEventNotificationData::default()
        });
        assert_eq!(
            rx.try_recv().ok(),
            Some(ReaderEvent::Antenna {
                reader_id: "gate".to_string(),
                antenna_id: 3,
                connected: false
            })
        );
        assert_eq!(
            rx.try_recv().ok(),
            Some(ReaderEvent::Exception {
                reader_id: "gate".to_string(),
                message: None
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unrecognised_events_only_count() {
        let (mut stream, mut rx, _log_rx) = stream();
        stream.on_reader_event(&ReaderEventNotificationData {
            timestamp: Some(EventTimestamp::Uptime(1)),
            antenna_event: Some(AntennaEvent {
                event_type: AntennaEventType::Other(9),
                antenna_id: 1,
            }),
            other_events: vec![247, 248],
            ..ReaderEventNotificationData::default()
        });
        assert!(rx.try_recv().is_err());
        assert_eq!(stream.stats().reader_events, 1);
    }
}
