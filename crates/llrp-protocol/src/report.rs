//! Tag reports and reader event notifications.

use crate::epc::Epc;
use crate::error::{LlrpError, LlrpResult};
use crate::types::{param_type, tv_type};
use crate::wire::{RawParam, WireReader, WireWriter};

/// One tag sighting inside an RO_ACCESS_REPORT.
///
/// Every field is optional on the wire; which ones arrive depends on the
/// content selector the reader was configured with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagReportData {
    pub epc: Option<Epc>,
    pub ro_spec_id: Option<u32>,
    pub spec_index: Option<u16>,
    pub inventory_parameter_spec_id: Option<u16>,
    pub antenna_id: Option<u16>,
    pub peak_rssi: Option<i8>,
    pub channel_index: Option<u16>,
    /// Microseconds since the Unix epoch
    pub first_seen_utc: Option<u64>,
    /// Microseconds since reader boot
    pub first_seen_uptime: Option<u64>,
    pub last_seen_utc: Option<u64>,
    pub last_seen_uptime: Option<u64>,
    pub tag_seen_count: Option<u16>,
    pub access_spec_id: Option<u32>,
}

impl TagReportData {
    /// A report carrying the fields the timing content selector enables.
    pub fn sighting(epc: Epc, antenna_id: u16, first_seen_utc: u64) -> Self {
        Self {
            epc: Some(epc),
            antenna_id: Some(antenna_id),
            first_seen_utc: Some(first_seen_utc),
            last_seen_utc: Some(first_seen_utc),
            ..Self::default()
        }
    }

    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::TAG_REPORT_DATA);
        match &self.epc {
            Some(Epc::Epc96(bytes)) => {
                w.put_tv(tv_type::EPC_96);
                w.put_bytes(bytes);
            }
            Some(Epc::Data { bit_len, bytes }) => {
                let e = w.begin_tlv(param_type::EPC_DATA);
                w.put_u1v(*bit_len, bytes);
                w.end_tlv(e, "EPCData")?;
            }
            None => {}
        }
        if let Some(v) = self.ro_spec_id {
            w.put_tv(tv_type::RO_SPEC_ID);
            w.put_u32(v);
        }
        if let Some(v) = self.spec_index {
            w.put_tv(tv_type::SPEC_INDEX);
            w.put_u16(v);
        }
        if let Some(v) = self.inventory_parameter_spec_id {
            w.put_tv(tv_type::INVENTORY_PARAMETER_SPEC_ID);
            w.put_u16(v);
        }
        if let Some(v) = self.antenna_id {
            w.put_tv(tv_type::ANTENNA_ID);
            w.put_u16(v);
        }
        if let Some(v) = self.peak_rssi {
            w.put_tv(tv_type::PEAK_RSSI);
            w.put_i8(v);
        }
        if let Some(v) = self.channel_index {
            w.put_tv(tv_type::CHANNEL_INDEX);
            w.put_u16(v);
        }
        for (tv, value) in [
            (tv_type::FIRST_SEEN_UTC, self.first_seen_utc),
            (tv_type::FIRST_SEEN_UPTIME, self.first_seen_uptime),
            (tv_type::LAST_SEEN_UTC, self.last_seen_utc),
            (tv_type::LAST_SEEN_UPTIME, self.last_seen_uptime),
        ] {
            if let Some(v) = value {
                w.put_tv(tv);
                w.put_u64(v);
            }
        }
        if let Some(v) = self.tag_seen_count {
            w.put_tv(tv_type::TAG_SEEN_COUNT);
            w.put_u16(v);
        }
        if let Some(v) = self.access_spec_id {
            w.put_tv(tv_type::ACCESS_SPEC_ID);
            w.put_u32(v);
        }
        w.end_tlv(mark, "TagReportData")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "TagReportData");
        let mut report = Self::default();
        while let Some(param) = r.next_param()? {
            match param {
                RawParam::Tv { tv, value } => report.apply_tv(tv, value)?,
                RawParam::Tlv {
                    param_type: param_type::EPC_DATA,
                    body,
                } => {
                    let mut e = WireReader::new(body, "EPCData");
                    let (bit_len, bytes) = e.u1v()?;
                    report.epc = Some(Epc::from_bits(bit_len, bytes));
                }
                RawParam::Tlv { .. } => {}
            }
        }
        Ok(report)
    }

    fn apply_tv(&mut self, tv: u8, value: &[u8]) -> LlrpResult<()> {
        let mut r = WireReader::new(value, "TagReportData TV");
        match tv {
            tv_type::EPC_96 => {
                let mut bytes = [0u8; 12];
                bytes.copy_from_slice(r.take(12)?);
                self.epc = Some(Epc::Epc96(bytes));
            }
            tv_type::RO_SPEC_ID => self.ro_spec_id = Some(r.u32()?),
            tv_type::SPEC_INDEX => self.spec_index = Some(r.u16()?),
            tv_type::INVENTORY_PARAMETER_SPEC_ID => {
                self.inventory_parameter_spec_id = Some(r.u16()?);
            }
            tv_type::ANTENNA_ID => self.antenna_id = Some(r.u16()?),
            tv_type::PEAK_RSSI => self.peak_rssi = Some(r.i8()?),
            tv_type::CHANNEL_INDEX => self.channel_index = Some(r.u16()?),
            tv_type::FIRST_SEEN_UTC => self.first_seen_utc = Some(r.u64()?),
            tv_type::FIRST_SEEN_UPTIME => self.first_seen_uptime = Some(r.u64()?),
            tv_type::LAST_SEEN_UTC => self.last_seen_utc = Some(r.u64()?),
            tv_type::LAST_SEEN_UPTIME => self.last_seen_uptime = Some(r.u64()?),
            tv_type::TAG_SEEN_COUNT => self.tag_seen_count = Some(r.u16()?),
            tv_type::ACCESS_SPEC_ID => self.access_spec_id = Some(r.u32()?),
            // Air protocol tag data and op spec results are not used.
            _ => {}
        }
        Ok(())
    }
}

/// Timestamp attached to a reader event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTimestamp {
    /// Microseconds since the Unix epoch
    Utc(u64),
    /// Microseconds since reader boot
    Uptime(u64),
}

/// Result of the reader-side connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAttemptStatus {
    Success,
    FailedReaderInitiatedConnectionExists,
    FailedClientInitiatedConnectionExists,
    FailedOtherReason,
    AnotherConnectionAttempted,
    Other(u16),
}

impl ConnectionAttemptStatus {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::FailedReaderInitiatedConnectionExists,
            2 => Self::FailedClientInitiatedConnectionExists,
            3 => Self::FailedOtherReason,
            4 => Self::AnotherConnectionAttempted,
            other => Self::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::Success => 0,
            Self::FailedReaderInitiatedConnectionExists => 1,
            Self::FailedClientInitiatedConnectionExists => 2,
            Self::FailedOtherReason => 3,
            Self::AnotherConnectionAttempted => 4,
            Self::Other(other) => other,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntennaEventType {
    Disconnected,
    Connected,
    Other(u8),
}

impl AntennaEventType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connected,
            other => Self::Other(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
            Self::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaEvent {
    pub event_type: AntennaEventType,
    pub antenna_id: u16,
}

/// Payload of a READER_EVENT_NOTIFICATION.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReaderEventNotificationData {
    pub timestamp: Option<EventTimestamp>,
    pub connection_attempt: Option<ConnectionAttemptStatus>,
    pub connection_closed: bool,
    pub antenna_event: Option<AntennaEvent>,
    pub reader_exception: Option<String>,
    /// Parameter types of events that were present but not decoded
    pub other_events: Vec<u16>,
}

impl ReaderEventNotificationData {
    /// The notice a reader sends when it accepts a connection.
    pub fn connection_attempt(status: ConnectionAttemptStatus, utc_us: u64) -> Self {
        Self {
            timestamp: Some(EventTimestamp::Utc(utc_us)),
            connection_attempt: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::READER_EVENT_NOTIFICATION_DATA);
        match self.timestamp {
            Some(EventTimestamp::Utc(us)) => {
                let t = w.begin_tlv(param_type::UTC_TIMESTAMP);
                w.put_u64(us);
                w.end_tlv(t, "UTCTimestamp")?;
            }
            Some(EventTimestamp::Uptime(us)) => {
                let t = w.begin_tlv(param_type::UPTIME);
                w.put_u64(us);
                w.end_tlv(t, "Uptime")?;
            }
            None => {}
        }
        if let Some(status) = self.connection_attempt {
            let e = w.begin_tlv(param_type::CONNECTION_ATTEMPT_EVENT);
            w.put_u16(status.to_u16());
            w.end_tlv(e, "ConnectionAttemptEvent")?;
        }
        if self.connection_closed {
            let e = w.begin_tlv(param_type::CONNECTION_CLOSE_EVENT);
            w.end_tlv(e, "ConnectionCloseEvent")?;
        }
        if let Some(event) = &self.antenna_event {
            let e = w.begin_tlv(param_type::ANTENNA_EVENT);
            w.put_u8(event.event_type.to_u8());
            w.put_u16(event.antenna_id);
            w.end_tlv(e, "AntennaEvent")?;
        }
        if let Some(message) = &self.reader_exception {
            let e = w.begin_tlv(param_type::READER_EXCEPTION_EVENT);
            w.put_utf8v("ReaderExceptionEvent.Message", message)?;
            w.end_tlv(e, "ReaderExceptionEvent")?;
        }
        w.end_tlv(mark, "ReaderEventNotificationData")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "ReaderEventNotificationData");
        let mut data = Self::default();
        while let Some(param) = r.next_param()? {
            let RawParam::Tlv {
                param_type: kind,
                body,
            } = param
            else {
                continue;
            };
            let mut p = WireReader::new(body, "reader event");
            match kind {
                param_type::UTC_TIMESTAMP => data.timestamp = Some(EventTimestamp::Utc(p.u64()?)),
                param_type::UPTIME => data.timestamp = Some(EventTimestamp::Uptime(p.u64()?)),
                param_type::CONNECTION_ATTEMPT_EVENT => {
                    data.connection_attempt = Some(ConnectionAttemptStatus::from_u16(p.u16()?));
                }
                param_type::CONNECTION_CLOSE_EVENT => data.connection_closed = true,
                param_type::ANTENNA_EVENT => {
                    let event_type = AntennaEventType::from_u8(p.u8()?);
                    data.antenna_event = Some(AntennaEvent {
                        event_type,
                        antenna_id: p.u16()?,
                    });
                }
                param_type::READER_EXCEPTION_EVENT => data.reader_exception = Some(p.utf8v()?),
                other => data.other_events.push(other),
            }
        }
        if data.timestamp.is_none() {
            return Err(LlrpError::MissingParameter("UTCTimestamp"));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn first_tlv(bytes: &[u8]) -> Result<&[u8], Box<dyn std::error::Error>> {
        match WireReader::new(bytes, "test").next_param()? {
            Some(RawParam::Tlv { body, .. }) => Ok(body),
            other => Err(format!("expected TLV, got {other:?}").into()),
        }
    }

    #[test]
    fn test_timing_report_fields() -> TestResult {
        let report = TagReportData::sighting(Epc::Epc96([7; 12]), 2, 1_700_000_000_000_000);
        let mut w = WireWriter::new();
        report.encode(&mut w)?;
        let bytes = w.into_inner();
        let decoded = TagReportData::decode(first_tlv(&bytes)?)?;
        assert_eq!(decoded.antenna_id, Some(2));
        assert_eq!(decoded.first_seen_utc, Some(1_700_000_000_000_000));
        assert_eq!(decoded.epc.as_ref().map(Epc::to_hex), Some("07".repeat(12)));
        Ok(())
    }

    #[test]
    fn test_epc_data_form_decodes() -> TestResult {
        let report = TagReportData {
            epc: Some(Epc::from_bytes(&[0xab, 0x12])),
            antenna_id: Some(1),
            ..TagReportData::default()
        };
        let mut w = WireWriter::new();
        report.encode(&mut w)?;
        let bytes = w.into_inner();
        assert_eq!(TagReportData::decode(first_tlv(&bytes)?)?, report);
        Ok(())
    }

    #[test]
    fn test_epc_data_pad_bits_are_cleared() -> TestResult {
        let report = TagReportData {
            epc: Some(Epc::Data {
                bit_len: 12,
                bytes: vec![0xab, 0x1f],
            }),
            ..TagReportData::default()
        };
        let mut w = WireWriter::new();
        report.encode(&mut w)?;
        let bytes = w.into_inner();
        let decoded = TagReportData::decode(first_tlv(&bytes)?)?;
        assert_eq!(decoded.epc.as_ref().map(Epc::to_hex).as_deref(), Some("ab10"));
        assert_eq!(decoded.epc.as_ref().map(Epc::bit_len), Some(12));
        Ok(())
    }

    #[test]
    fn test_event_without_timestamp_is_rejected() -> TestResult {
        let mut w = WireWriter::new();
        let mark = w.begin_tlv(param_type::READER_EVENT_NOTIFICATION_DATA);
        w.end_tlv(mark, "ReaderEventNotificationData")?;
        let bytes = w.into_inner();
        assert_eq!(
            ReaderEventNotificationData::decode(first_tlv(&bytes)?),
            Err(LlrpError::MissingParameter("UTCTimestamp"))
        );
        Ok(())
    }

    #[test]
    fn test_antenna_event() -> TestResult {
        let data = ReaderEventNotificationData {
            timestamp: Some(EventTimestamp::Uptime(5)),
            antenna_event: Some(AntennaEvent {
                event_type: AntennaEventType::Disconnected,
                antenna_id: 3,
            }),
            ..ReaderEventNotificationData::default()
        };
        let mut w = WireWriter::new();
        data.encode(&mut w)?;
        let bytes = w.into_inner();
        assert_eq!(ReaderEventNotificationData::decode(first_tlv(&bytes)?)?, data);
        Ok(())
    }
}
