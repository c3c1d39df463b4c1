//! Typed LLRP messages.

use crate::error::{LlrpError, LlrpResult};
use crate::header::{HEADER_LEN, MessageHeader};
use crate::params::{
    AntennaConfiguration, GeneralDeviceCapabilities, LlrpStatus, RegulatoryCapabilities,
    decode_status_only, require,
};
use crate::report::{ReaderEventNotificationData, TagReportData};
use crate::rospec::RoSpec;
use crate::types::{CapabilitiesRequest, ConfigRequest, MessageType, param_type};
use crate::wire::{RawParam, WireReader, WireWriter};

/// Capabilities returned by GET_READER_CAPABILITIES_RESPONSE.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReaderCapabilities {
    pub status: Option<LlrpStatus>,
    pub general: Option<GeneralDeviceCapabilities>,
    pub regulatory: Option<RegulatoryCapabilities>,
}

/// Every message the session sends or expects to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    GetReaderCapabilities {
        requested_data: CapabilitiesRequest,
    },
    GetReaderCapabilitiesResponse(ReaderCapabilities),
    GetReaderConfig {
        antenna_id: u16,
        requested_data: ConfigRequest,
    },
    GetReaderConfigResponse {
        status: Option<LlrpStatus>,
        antenna_configurations: Vec<AntennaConfiguration>,
    },
    SetReaderConfig {
        reset_to_factory_default: bool,
        antenna_configurations: Vec<AntennaConfiguration>,
    },
    SetReaderConfigResponse {
        status: Option<LlrpStatus>,
    },
    CloseConnection,
    CloseConnectionResponse {
        status: Option<LlrpStatus>,
    },
    AddRoSpec {
        ro_spec: RoSpec,
    },
    AddRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    DeleteRoSpec {
        ro_spec_id: u32,
    },
    DeleteRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    StartRoSpec {
        ro_spec_id: u32,
    },
    StartRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    StopRoSpec {
        ro_spec_id: u32,
    },
    StopRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    EnableRoSpec {
        ro_spec_id: u32,
    },
    EnableRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    DisableRoSpec {
        ro_spec_id: u32,
    },
    DisableRoSpecResponse {
        status: Option<LlrpStatus>,
    },
    RoAccessReport {
        tag_reports: Vec<TagReportData>,
    },
    Keepalive,
    KeepaliveAck,
    ReaderEventNotification {
        data: ReaderEventNotificationData,
    },
    ErrorMessage {
        status: Option<LlrpStatus>,
    },
    /// A message type this codec does not model
    Unknown {
        message_type: u16,
        payload: Vec<u8>,
    },
}

/// Coarse classification used by the report loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    TagReport,
    ReaderEvent,
    Keepalive,
    ErrorMessage,
    Unknown,
}

impl Message {
    /// Raw message type number.
    pub fn type_code(&self) -> u16 {
        match self.message_type() {
            Some(t) => t.to_u16(),
            None => match self {
                Message::Unknown { message_type, .. } => *message_type,
                _ => 0,
            },
        }
    }

    pub fn message_type(&self) -> Option<MessageType> {
        let t = match self {
            Message::GetReaderCapabilities { .. } => MessageType::GetReaderCapabilities,
            Message::GetReaderCapabilitiesResponse(_) => MessageType::GetReaderCapabilitiesResponse,
            Message::GetReaderConfig { .. } => MessageType::GetReaderConfig,
            Message::GetReaderConfigResponse { .. } => MessageType::GetReaderConfigResponse,
            Message::SetReaderConfig { .. } => MessageType::SetReaderConfig,
            Message::SetReaderConfigResponse { .. } => MessageType::SetReaderConfigResponse,
            Message::CloseConnection => MessageType::CloseConnection,
            Message::CloseConnectionResponse { .. } => MessageType::CloseConnectionResponse,
            Message::AddRoSpec { .. } => MessageType::AddRoSpec,
            Message::AddRoSpecResponse { .. } => MessageType::AddRoSpecResponse,
            Message::DeleteRoSpec { .. } => MessageType::DeleteRoSpec,
            Message::DeleteRoSpecResponse { .. } => MessageType::DeleteRoSpecResponse,
            Message::StartRoSpec { .. } => MessageType::StartRoSpec,
            Message::StartRoSpecResponse { .. } => MessageType::StartRoSpecResponse,
            Message::StopRoSpec { .. } => MessageType::StopRoSpec,
            Message::StopRoSpecResponse { .. } => MessageType::StopRoSpecResponse,
            Message::EnableRoSpec { .. } => MessageType::EnableRoSpec,
            Message::EnableRoSpecResponse { .. } => MessageType::EnableRoSpecResponse,
            Message::DisableRoSpec { .. } => MessageType::DisableRoSpec,
            Message::DisableRoSpecResponse { .. } => MessageType::DisableRoSpecResponse,
            Message::RoAccessReport { .. } => MessageType::RoAccessReport,
            Message::Keepalive => MessageType::Keepalive,
            Message::KeepaliveAck => MessageType::KeepaliveAck,
            Message::ReaderEventNotification { .. } => MessageType::ReaderEventNotification,
            Message::ErrorMessage { .. } => MessageType::ErrorMessage,
            Message::Unknown { .. } => return None,
        };
        Some(t)
    }

    /// Human readable message name, for logs.
    pub fn name(&self) -> String {
        match self.message_type() {
            Some(t) => t.name().to_string(),
            None => format!("UNKNOWN({})", self.type_code()),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::RoAccessReport { .. } => MessageKind::TagReport,
            Message::ReaderEventNotification { .. } => MessageKind::ReaderEvent,
            Message::Keepalive => MessageKind::Keepalive,
            Message::ErrorMessage { .. } => MessageKind::ErrorMessage,
            Message::Unknown { .. } => MessageKind::Unknown,
            Message::GetReaderCapabilitiesResponse(_)
            | Message::GetReaderConfigResponse { .. }
            | Message::SetReaderConfigResponse { .. }
            | Message::CloseConnectionResponse { .. }
            | Message::AddRoSpecResponse { .. }
            | Message::DeleteRoSpecResponse { .. }
            | Message::StartRoSpecResponse { .. }
            | Message::StopRoSpecResponse { .. }
            | Message::EnableRoSpecResponse { .. }
            | Message::DisableRoSpecResponse { .. } => MessageKind::Response,
            _ => MessageKind::Request,
        }
    }

    /// Status carried by a response or error message.
    pub fn status(&self) -> Option<&LlrpStatus> {
        match self {
            Message::GetReaderCapabilitiesResponse(caps) => caps.status.as_ref(),
            Message::GetReaderConfigResponse { status, .. }
            | Message::SetReaderConfigResponse { status }
            | Message::CloseConnectionResponse { status }
            | Message::AddRoSpecResponse { status }
            | Message::DeleteRoSpecResponse { status }
            | Message::StartRoSpecResponse { status }
            | Message::StopRoSpecResponse { status }
            | Message::EnableRoSpecResponse { status }
            | Message::DisableRoSpecResponse { status }
            | Message::ErrorMessage { status } => status.as_ref(),
            _ => None,
        }
    }

    /// Whether `self` answers a request of type `request`.
    pub fn answers(&self, request: MessageType) -> bool {
        match (request.response_type(), self.message_type()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }

    /// Encode into one complete frame carrying `message_id`.
    pub fn encode(&self, message_id: u32) -> LlrpResult<Vec<u8>> {
        let mut body = WireWriter::new();
        self.encode_body(&mut body)?;
        let total = HEADER_LEN + body.len();
        let length = u32::try_from(total).ok().ok_or(LlrpError::FieldOverflow {
            field: "message length",
            length: total,
        })?;
        let header = MessageHeader::new(self.type_code(), length, message_id);
        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(&body.into_inner());
        Ok(frame)
    }

    fn encode_body(&self, w: &mut WireWriter) -> LlrpResult<()> {
        match self {
            Message::GetReaderCapabilities { requested_data } => {
                w.put_u8(requested_data.to_u8());
            }
            Message::GetReaderCapabilitiesResponse(caps) => {
                if let Some(status) = &caps.status {
                    status.encode(w)?;
                }
                if let Some(general) = &caps.general {
                    general.encode(w)?;
                }
                if let Some(regulatory) = &caps.regulatory {
                    regulatory.encode(w)?;
                }
            }
            Message::GetReaderConfig {
                antenna_id,
                requested_data,
            } => {
                w.put_u16(*antenna_id);
                w.put_u8(requested_data.to_u8());
                // GPI and GPO port numbers
                w.put_u16(0);
                w.put_u16(0);
            }
            Message::GetReaderConfigResponse {
                status,
                antenna_configurations,
            } => {
                if let Some(status) = status {
                    status.encode(w)?;
                }
                for config in antenna_configurations {
                    config.encode(w)?;
                }
            }
            Message::SetReaderConfig {
                reset_to_factory_default,
                antenna_configurations,
            } => {
                w.put_u8(if *reset_to_factory_default { 0x80 } else { 0 });
                for config in antenna_configurations {
                    config.encode(w)?;
                }
            }
            Message::AddRoSpec { ro_spec } => ro_spec.encode(w)?,
            Message::DeleteRoSpec { ro_spec_id }
            | Message::StartRoSpec { ro_spec_id }
            | Message::StopRoSpec { ro_spec_id }
            | Message::EnableRoSpec { ro_spec_id }
            | Message::DisableRoSpec { ro_spec_id } => w.put_u32(*ro_spec_id),
            Message::SetReaderConfigResponse { status }
            | Message::CloseConnectionResponse { status }
            | Message::AddRoSpecResponse { status }
            | Message::DeleteRoSpecResponse { status }
            | Message::StartRoSpecResponse { status }
            | Message::StopRoSpecResponse { status }
            | Message::EnableRoSpecResponse { status }
            | Message::DisableRoSpecResponse { status }
            | Message::ErrorMessage { status } => {
                if let Some(status) = status {
                    status.encode(w)?;
                }
            }
            Message::RoAccessReport { tag_reports } => {
                for report in tag_reports {
                    report.encode(w)?;
                }
            }
            Message::ReaderEventNotification { data } => data.encode(w)?,
            Message::CloseConnection | Message::Keepalive | Message::KeepaliveAck => {}
            Message::Unknown { payload, .. } => w.put_bytes(payload),
        }
        Ok(())
    }

    fn decode_body(message_type: u16, body: &[u8]) -> LlrpResult<Self> {
        let Some(kind) = MessageType::from_u16(message_type) else {
            return Ok(Message::Unknown {
                message_type,
                payload: body.to_vec(),
            });
        };
        let name = kind.name();
        let mut r = WireReader::new(body, name);
        let message = match kind {
            MessageType::GetReaderCapabilities => {
                let raw = r.u8()?;
                Message::GetReaderCapabilities {
                    requested_data: CapabilitiesRequest::from_u8(raw).ok_or(
                        LlrpError::InvalidField {
                            field: "RequestedData",
                            value: u32::from(raw),
                        },
                    )?,
                }
            }
            MessageType::GetReaderCapabilitiesResponse => {
                let mut caps = ReaderCapabilities::default();
                while let Some(param) = r.next_param()? {
                    let RawParam::Tlv {
                        param_type: kind,
                        body,
                    } = param
                    else {
                        continue;
                    };
                    match kind {
                        param_type::LLRP_STATUS => caps.status = Some(LlrpStatus::decode(body)?),
                        param_type::GENERAL_DEVICE_CAPABILITIES => {
                            caps.general = Some(GeneralDeviceCapabilities::decode(body)?);
                        }
                        param_type::REGULATORY_CAPABILITIES => {
                            caps.regulatory = Some(RegulatoryCapabilities::decode(body)?);
                        }
                        _ => {}
                    }
                }
                Message::GetReaderCapabilitiesResponse(caps)
            }
            MessageType::GetReaderConfig => {
                let antenna_id = r.u16()?;
                let raw = r.u8()?;
                let requested_data = ConfigRequest::from_u8(raw).ok_or(LlrpError::InvalidField {
                    field: "RequestedData",
                    value: u32::from(raw),
                })?;
                Message::GetReaderConfig {
                    antenna_id,
                    requested_data,
                }
            }
            MessageType::GetReaderConfigResponse => {
                let mut status = None;
                let mut antenna_configurations = Vec::new();
                while let Some(param) = r.next_param()? {
                    let RawParam::Tlv {
                        param_type: kind,
                        body,
                    } = param
                    else {
                        continue;
                    };
                    match kind {
                        param_type::LLRP_STATUS => status = Some(LlrpStatus::decode(body)?),
                        param_type::ANTENNA_CONFIGURATION => {
                            antenna_configurations.push(AntennaConfiguration::decode(body)?);
                        }
                        _ => {}
                    }
                }
                Message::GetReaderConfigResponse {
                    status,
                    antenna_configurations,
                }
            }
            MessageType::SetReaderConfig => {
                let reset_to_factory_default = r.u8()? & 0x80 != 0;
                let mut antenna_configurations = Vec::new();
                while let Some(param) = r.next_param()? {
                    if let RawParam::Tlv {
                        param_type: param_type::ANTENNA_CONFIGURATION,
                        body,
                    } = param
                    {
                        antenna_configurations.push(AntennaConfiguration::decode(body)?);
                    }
                }
                Message::SetReaderConfig {
                    reset_to_factory_default,
                    antenna_configurations,
                }
            }
            MessageType::AddRoSpec => {
                let mut ro_spec = None;
                while let Some(param) = r.next_param()? {
                    if let RawParam::Tlv {
                        param_type: param_type::RO_SPEC,
                        body,
                    } = param
                    {
                        ro_spec = Some(RoSpec::decode(body)?);
                    }
                }
                Message::AddRoSpec {
                    ro_spec: require(ro_spec, "ROSpec")?,
                }
            }
            MessageType::DeleteRoSpec => Message::DeleteRoSpec { ro_spec_id: r.u32()? },
            MessageType::StartRoSpec => Message::StartRoSpec { ro_spec_id: r.u32()? },
            MessageType::StopRoSpec => Message::StopRoSpec { ro_spec_id: r.u32()? },
            MessageType::EnableRoSpec => Message::EnableRoSpec { ro_spec_id: r.u32()? },
            MessageType::DisableRoSpec => Message::DisableRoSpec { ro_spec_id: r.u32()? },
            MessageType::SetReaderConfigResponse => Message::SetReaderConfigResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::CloseConnectionResponse => Message::CloseConnectionResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::AddRoSpecResponse => Message::AddRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::DeleteRoSpecResponse => Message::DeleteRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::StartRoSpecResponse => Message::StartRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::StopRoSpecResponse => Message::StopRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::EnableRoSpecResponse => Message::EnableRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::DisableRoSpecResponse => Message::DisableRoSpecResponse {
                status: decode_status_only(body, name)?,
            },
            MessageType::ErrorMessage => Message::ErrorMessage {
                status: decode_status_only(body, name)?,
            },
            MessageType::RoAccessReport => {
                let mut tag_reports = Vec::new();
                while let Some(param) = r.next_param()? {
                    if let RawParam::Tlv {
                        param_type: param_type::TAG_REPORT_DATA,
                        body,
                    } = param
                    {
                        tag_reports.push(TagReportData::decode(body)?);
                    }
                }
                Message::RoAccessReport { tag_reports }
            }
            MessageType::ReaderEventNotification => {
                let mut data = None;
                while let Some(param) = r.next_param()? {
                    if let RawParam::Tlv {
                        param_type: param_type::READER_EVENT_NOTIFICATION_DATA,
                        body,
                    } = param
                    {
                        data = Some(ReaderEventNotificationData::decode(body)?);
                    }
                }
                Message::ReaderEventNotification {
                    data: require(data, "ReaderEventNotificationData")?,
                }
            }
            MessageType::CloseConnection => Message::CloseConnection,
            MessageType::Keepalive => Message::Keepalive,
            MessageType::KeepaliveAck => Message::KeepaliveAck,
        };
        Ok(message)
    }
}

/// A message together with the id from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub message_id: u32,
    pub message: Message,
}

impl Envelope {
    pub fn new(message_id: u32, message: Message) -> Self {
        Self {
            message_id,
            message,
        }
    }

    /// Encode into one complete frame, header included.
    pub fn encode(&self) -> LlrpResult<Vec<u8>> {
        self.message.encode(self.message_id)
    }

    /// Decode one complete frame.
    ///
    /// The header length must match the frame exactly.
    pub fn decode(frame: &[u8]) -> LlrpResult<Self> {
        let header = MessageHeader::decode(frame)?;
        if header.length as usize != frame.len() {
            return Err(LlrpError::InvalidLength {
                context: "message frame",
                length: frame.len(),
            });
        }
        let body = frame.get(HEADER_LEN..).unwrap_or_default();
        Ok(Self {
            message_id: header.message_id,
            message: Message::decode_body(header.message_type, body)?,
        })
    }
}
