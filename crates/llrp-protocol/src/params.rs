//! Status, capability and antenna configuration parameters.

use crate::error::{LlrpError, LlrpResult};
use crate::types::{StatusCode, param_type};
use crate::wire::{RawParam, WireReader, WireWriter};

/// Outcome carried by every response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlrpStatus {
    pub code: StatusCode,
    pub error_description: String,
}

impl LlrpStatus {
    pub fn success() -> Self {
        Self {
            code: StatusCode::SUCCESS,
            error_description: String::new(),
        }
    }

    pub fn failure(code: StatusCode, description: impl Into<String>) -> Self {
        Self {
            code,
            error_description: description.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::LLRP_STATUS);
        w.put_u16(self.code.0);
        w.put_utf8v("ErrorDescription", &self.error_description)?;
        w.end_tlv(mark, "LLRPStatus")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "LLRPStatus");
        let code = StatusCode(r.u16()?);
        let error_description = r.utf8v()?;
        // FieldError / ParameterError details are not surfaced.
        while r.next_param()?.is_some() {}
        Ok(Self {
            code,
            error_description,
        })
    }
}

/// Reader identity and antenna count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneralDeviceCapabilities {
    pub max_antennas: u16,
    pub can_set_antenna_properties: bool,
    pub has_utc_clock: bool,
    pub manufacturer: u32,
    pub model: u32,
    pub firmware_version: String,
}

impl GeneralDeviceCapabilities {
    const CAN_SET_ANTENNA_PROPERTIES: u16 = 0x8000;
    const HAS_UTC_CLOCK: u16 = 0x4000;

    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::GENERAL_DEVICE_CAPABILITIES);
        w.put_u16(self.max_antennas);
        let mut flags = 0u16;
        if self.can_set_antenna_properties {
            flags |= Self::CAN_SET_ANTENNA_PROPERTIES;
        }
        if self.has_utc_clock {
            flags |= Self::HAS_UTC_CLOCK;
        }
        w.put_u16(flags);
        w.put_u32(self.manufacturer);
        w.put_u32(self.model);
        w.put_utf8v("ReaderFirmwareVersion", &self.firmware_version)?;
        w.end_tlv(mark, "GeneralDeviceCapabilities")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "GeneralDeviceCapabilities");
        let max_antennas = r.u16()?;
        let flags = r.u16()?;
        let manufacturer = r.u32()?;
        let model = r.u32()?;
        let firmware_version = r.utf8v()?;
        while r.next_param()?.is_some() {}
        Ok(Self {
            max_antennas,
            can_set_antenna_properties: flags & Self::CAN_SET_ANTENNA_PROPERTIES != 0,
            has_utc_clock: flags & Self::HAS_UTC_CLOCK != 0,
            manufacturer,
            model,
            firmware_version,
        })
    }
}

/// One selectable transmit power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitPowerEntry {
    pub index: u16,
    /// Power in hundredths of a dBm
    pub power_centi_dbm: i16,
}

impl TransmitPowerEntry {
    pub fn dbm(&self) -> f64 {
        f64::from(self.power_centi_dbm) / 100.0
    }
}

/// Regulatory and UHF band capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegulatoryCapabilities {
    pub country_code: u16,
    pub communications_standard: u16,
    pub transmit_power_table: Vec<TransmitPowerEntry>,
}

impl RegulatoryCapabilities {
    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::REGULATORY_CAPABILITIES);
        w.put_u16(self.country_code);
        w.put_u16(self.communications_standard);
        let band = w.begin_tlv(param_type::UHF_BAND_CAPABILITIES);
        for entry in &self.transmit_power_table {
            let e = w.begin_tlv(param_type::TRANSMIT_POWER_LEVEL_TABLE_ENTRY);
            w.put_u16(entry.index);
            w.put_i16(entry.power_centi_dbm);
            w.end_tlv(e, "TransmitPowerLevelTableEntry")?;
        }
        w.end_tlv(band, "UHFBandCapabilities")?;
        w.end_tlv(mark, "RegulatoryCapabilities")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "RegulatoryCapabilities");
        let country_code = r.u16()?;
        let communications_standard = r.u16()?;
        let mut transmit_power_table = Vec::new();
        while let Some(param) = r.next_param()? {
            if let RawParam::Tlv {
                param_type: param_type::UHF_BAND_CAPABILITIES,
                body,
            } = param
            {
                let mut band = WireReader::new(body, "UHFBandCapabilities");
                while let Some(entry) = band.next_param()? {
                    if let RawParam::Tlv {
                        param_type: param_type::TRANSMIT_POWER_LEVEL_TABLE_ENTRY,
                        body,
                    } = entry
                    {
                        let mut e = WireReader::new(body, "TransmitPowerLevelTableEntry");
                        transmit_power_table.push(TransmitPowerEntry {
                            index: e.u16()?,
                            power_centi_dbm: e.i16()?,
                        });
                    }
                }
            }
        }
        Ok(Self {
            country_code,
            communications_standard,
            transmit_power_table,
        })
    }
}

/// Transmitter settings for one antenna.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfTransmitter {
    pub hop_table_id: u16,
    pub channel_index: u16,
    /// Index into the reader's transmit power table
    pub transmit_power: u16,
}

/// Per-antenna configuration.
///
/// Antenna id 0 addresses every antenna on the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntennaConfiguration {
    pub antenna_id: u16,
    pub rf_transmitter: Option<RfTransmitter>,
}

impl AntennaConfiguration {
    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::ANTENNA_CONFIGURATION);
        w.put_u16(self.antenna_id);
        if let Some(tx) = &self.rf_transmitter {
            let t = w.begin_tlv(param_type::RF_TRANSMITTER);
            w.put_u16(tx.hop_table_id);
            w.put_u16(tx.channel_index);
            w.put_u16(tx.transmit_power);
            w.end_tlv(t, "RFTransmitter")?;
        }
        w.end_tlv(mark, "AntennaConfiguration")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "AntennaConfiguration");
        let antenna_id = r.u16()?;
        let mut rf_transmitter = None;
        while let Some(param) = r.next_param()? {
            if let RawParam::Tlv {
                param_type: param_type::RF_TRANSMITTER,
                body,
            } = param
            {
                let mut t = WireReader::new(body, "RFTransmitter");
                rf_transmitter = Some(RfTransmitter {
                    hop_table_id: t.u16()?,
                    channel_index: t.u16()?,
                    transmit_power: t.u16()?,
                });
            }
        }
        Ok(Self {
            antenna_id,
            rf_transmitter,
        })
    }
}

/// Pull the mandatory status out of a response body.
pub(crate) fn decode_status_only(body: &[u8], context: &'static str) -> LlrpResult<Option<LlrpStatus>> {
    let mut r = WireReader::new(body, context);
    let mut status = None;
    while let Some(param) = r.next_param()? {
        if let RawParam::Tlv {
            param_type: param_type::LLRP_STATUS,
            body,
        } = param
        {
            status = Some(LlrpStatus::decode(body)?);
        }
    }
    Ok(status)
}

pub(crate) fn require<T>(value: Option<T>, name: &'static str) -> LlrpResult<T> {
    value.ok_or(LlrpError::MissingParameter(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn tlv_body(bytes: &[u8]) -> Result<&[u8], Box<dyn std::error::Error>> {
        let mut r = WireReader::new(bytes, "test");
        match r.next_param()? {
            Some(RawParam::Tlv { body, .. }) => Ok(body),
            other => Err(format!("expected TLV, got {other:?}").into()),
        }
    }

    #[test]
    fn test_status_with_description() -> TestResult {
        let status = LlrpStatus::failure(StatusCode::FIELD_ERROR, "bad field");
        let mut w = WireWriter::new();
        status.encode(&mut w)?;
        let bytes = w.into_inner();
        let decoded = LlrpStatus::decode(tlv_body(&bytes)?)?;
        assert_eq!(decoded, status);
        assert!(!decoded.is_success());
        Ok(())
    }

    #[test]
    fn test_capabilities_flags() -> TestResult {
        let caps = GeneralDeviceCapabilities {
            max_antennas: 4,
            can_set_antenna_properties: false,
            has_utc_clock: true,
            manufacturer: crate::types::IMPINJ_PEN,
            model: 2001002,
            firmware_version: "5.12.0".into(),
        };
        let mut w = WireWriter::new();
        caps.encode(&mut w)?;
        let bytes = w.into_inner();
        assert_eq!(GeneralDeviceCapabilities::decode(tlv_body(&bytes)?)?, caps);
        Ok(())
    }

    #[test]
    fn test_power_table_decodes_in_order() -> TestResult {
        let caps = RegulatoryCapabilities {
            country_code: 840,
            communications_standard: 1,
            transmit_power_table: vec![
                TransmitPowerEntry { index: 1, power_centi_dbm: 1000 },
                TransmitPowerEntry { index: 2, power_centi_dbm: 1025 },
                TransmitPowerEntry { index: 81, power_centi_dbm: 3000 },
            ],
        };
        let mut w = WireWriter::new();
        caps.encode(&mut w)?;
        let bytes = w.into_inner();
        let decoded = RegulatoryCapabilities::decode(tlv_body(&bytes)?)?;
        assert_eq!(decoded.transmit_power_table.len(), 3);
        assert_eq!(decoded, caps);
        Ok(())
    }

    #[test]
    fn test_missing_status_is_none() -> TestResult {
        assert_eq!(decode_status_only(&[], "ADD_ROSPEC_RESPONSE")?, None);
        Ok(())
    }
}
