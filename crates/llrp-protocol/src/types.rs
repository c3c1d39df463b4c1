//! LLRP message and parameter type identifiers.

/// LLRP protocol version written into every header.
pub const LLRP_VERSION: u8 = 1;

/// IANA private enterprise number of Impinj.
pub const IMPINJ_PEN: u32 = 25882;

/// Message types used by the reader session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    GetReaderCapabilities,
    GetReaderConfig,
    SetReaderConfig,
    CloseConnectionResponse,
    GetReaderCapabilitiesResponse,
    GetReaderConfigResponse,
    SetReaderConfigResponse,
    CloseConnection,
    AddRoSpec,
    DeleteRoSpec,
    StartRoSpec,
    StopRoSpec,
    EnableRoSpec,
    DisableRoSpec,
    AddRoSpecResponse,
    DeleteRoSpecResponse,
    StartRoSpecResponse,
    StopRoSpecResponse,
    EnableRoSpecResponse,
    DisableRoSpecResponse,
    RoAccessReport,
    Keepalive,
    ReaderEventNotification,
    KeepaliveAck,
    ErrorMessage,
}

impl MessageType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::GetReaderCapabilities),
            2 => Some(Self::GetReaderConfig),
            3 => Some(Self::SetReaderConfig),
            4 => Some(Self::CloseConnectionResponse),
            11 => Some(Self::GetReaderCapabilitiesResponse),
            12 => Some(Self::GetReaderConfigResponse),
            13 => Some(Self::SetReaderConfigResponse),
            14 => Some(Self::CloseConnection),
            20 => Some(Self::AddRoSpec),
            21 => Some(Self::DeleteRoSpec),
            22 => Some(Self::StartRoSpec),
            23 => Some(Self::StopRoSpec),
            24 => Some(Self::EnableRoSpec),
            25 => Some(Self::DisableRoSpec),
            30 => Some(Self::AddRoSpecResponse),
            31 => Some(Self::DeleteRoSpecResponse),
            32 => Some(Self::StartRoSpecResponse),
            33 => Some(Self::StopRoSpecResponse),
            34 => Some(Self::EnableRoSpecResponse),
            35 => Some(Self::DisableRoSpecResponse),
            61 => Some(Self::RoAccessReport),
            62 => Some(Self::Keepalive),
            63 => Some(Self::ReaderEventNotification),
            72 => Some(Self::KeepaliveAck),
            100 => Some(Self::ErrorMessage),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::GetReaderCapabilities => 1,
            Self::GetReaderConfig => 2,
            Self::SetReaderConfig => 3,
            Self::CloseConnectionResponse => 4,
            Self::GetReaderCapabilitiesResponse => 11,
            Self::GetReaderConfigResponse => 12,
            Self::SetReaderConfigResponse => 13,
            Self::CloseConnection => 14,
            Self::AddRoSpec => 20,
            Self::DeleteRoSpec => 21,
            Self::StartRoSpec => 22,
            Self::StopRoSpec => 23,
            Self::EnableRoSpec => 24,
            Self::DisableRoSpec => 25,
            Self::AddRoSpecResponse => 30,
            Self::DeleteRoSpecResponse => 31,
            Self::StartRoSpecResponse => 32,
            Self::StopRoSpecResponse => 33,
            Self::EnableRoSpecResponse => 34,
            Self::DisableRoSpecResponse => 35,
            Self::RoAccessReport => 61,
            Self::Keepalive => 62,
            Self::ReaderEventNotification => 63,
            Self::KeepaliveAck => 72,
            Self::ErrorMessage => 100,
        }
    }

    /// The response type a reader answers this request with.
    pub fn response_type(self) -> Option<Self> {
        match self {
            Self::GetReaderCapabilities => Some(Self::GetReaderCapabilitiesResponse),
            Self::GetReaderConfig => Some(Self::GetReaderConfigResponse),
            Self::SetReaderConfig => Some(Self::SetReaderConfigResponse),
            Self::CloseConnection => Some(Self::CloseConnectionResponse),
            Self::AddRoSpec => Some(Self::AddRoSpecResponse),
            Self::DeleteRoSpec => Some(Self::DeleteRoSpecResponse),
            Self::StartRoSpec => Some(Self::StartRoSpecResponse),
            Self::StopRoSpec => Some(Self::StopRoSpecResponse),
            Self::EnableRoSpec => Some(Self::EnableRoSpecResponse),
            Self::DisableRoSpec => Some(Self::DisableRoSpecResponse),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GetReaderCapabilities => "GET_READER_CAPABILITIES",
            Self::GetReaderConfig => "GET_READER_CONFIG",
            Self::SetReaderConfig => "SET_READER_CONFIG",
            Self::CloseConnectionResponse => "CLOSE_CONNECTION_RESPONSE",
            Self::GetReaderCapabilitiesResponse => "GET_READER_CAPABILITIES_RESPONSE",
            Self::GetReaderConfigResponse => "GET_READER_CONFIG_RESPONSE",
            Self::SetReaderConfigResponse => "SET_READER_CONFIG_RESPONSE",
            Self::CloseConnection => "CLOSE_CONNECTION",
            Self::AddRoSpec => "ADD_ROSPEC",
            Self::DeleteRoSpec => "DELETE_ROSPEC",
            Self::StartRoSpec => "START_ROSPEC",
            Self::StopRoSpec => "STOP_ROSPEC",
            Self::EnableRoSpec => "ENABLE_ROSPEC",
            Self::DisableRoSpec => "DISABLE_ROSPEC",
            Self::AddRoSpecResponse => "ADD_ROSPEC_RESPONSE",
            Self::DeleteRoSpecResponse => "DELETE_ROSPEC_RESPONSE",
            Self::StartRoSpecResponse => "START_ROSPEC_RESPONSE",
            Self::StopRoSpecResponse => "STOP_ROSPEC_RESPONSE",
            Self::EnableRoSpecResponse => "ENABLE_ROSPEC_RESPONSE",
            Self::DisableRoSpecResponse => "DISABLE_ROSPEC_RESPONSE",
            Self::RoAccessReport => "RO_ACCESS_REPORT",
            Self::Keepalive => "KEEPALIVE",
            Self::ReaderEventNotification => "READER_EVENT_NOTIFICATION",
            Self::KeepaliveAck => "KEEPALIVE_ACK",
            Self::ErrorMessage => "ERROR_MESSAGE",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// TLV parameter type numbers.
pub mod param_type {
    pub const UTC_TIMESTAMP: u16 = 128;
    pub const UPTIME: u16 = 129;
    pub const GENERAL_DEVICE_CAPABILITIES: u16 = 137;
    pub const REGULATORY_CAPABILITIES: u16 = 143;
    pub const UHF_BAND_CAPABILITIES: u16 = 144;
    pub const TRANSMIT_POWER_LEVEL_TABLE_ENTRY: u16 = 145;
    pub const RO_SPEC: u16 = 177;
    pub const RO_BOUNDARY_SPEC: u16 = 178;
    pub const RO_SPEC_START_TRIGGER: u16 = 179;
    pub const RO_SPEC_STOP_TRIGGER: u16 = 182;
    pub const AI_SPEC: u16 = 183;
    pub const AI_SPEC_STOP_TRIGGER: u16 = 184;
    pub const INVENTORY_PARAMETER_SPEC: u16 = 186;
    pub const ANTENNA_CONFIGURATION: u16 = 222;
    pub const RF_TRANSMITTER: u16 = 224;
    pub const RO_REPORT_SPEC: u16 = 237;
    pub const TAG_REPORT_CONTENT_SELECTOR: u16 = 238;
    pub const TAG_REPORT_DATA: u16 = 240;
    pub const EPC_DATA: u16 = 241;
    pub const READER_EVENT_NOTIFICATION_DATA: u16 = 246;
    pub const READER_EXCEPTION_EVENT: u16 = 252;
    pub const ANTENNA_EVENT: u16 = 255;
    pub const CONNECTION_ATTEMPT_EVENT: u16 = 256;
    pub const CONNECTION_CLOSE_EVENT: u16 = 257;
    pub const LLRP_STATUS: u16 = 287;
}

/// TV parameter type numbers.
pub mod tv_type {
    pub const ANTENNA_ID: u8 = 1;
    pub const FIRST_SEEN_UTC: u8 = 2;
    pub const FIRST_SEEN_UPTIME: u8 = 3;
    pub const LAST_SEEN_UTC: u8 = 4;
    pub const LAST_SEEN_UPTIME: u8 = 5;
    pub const PEAK_RSSI: u8 = 6;
    pub const CHANNEL_INDEX: u8 = 7;
    pub const TAG_SEEN_COUNT: u8 = 8;
    pub const RO_SPEC_ID: u8 = 9;
    pub const INVENTORY_PARAMETER_SPEC_ID: u8 = 10;
    pub const C1G2_CRC: u8 = 11;
    pub const C1G2_PC: u8 = 12;
    pub const EPC_96: u8 = 13;
    pub const SPEC_INDEX: u8 = 14;
    pub const CLIENT_REQUEST_OP_SPEC_RESULT: u8 = 15;
    pub const ACCESS_SPEC_ID: u8 = 16;

    /// Fixed value length of a TV parameter, excluding its type byte.
    pub fn value_len(tv: u8) -> Option<usize> {
        match tv {
            ANTENNA_ID => Some(2),
            FIRST_SEEN_UTC | FIRST_SEEN_UPTIME | LAST_SEEN_UTC | LAST_SEEN_UPTIME => Some(8),
            PEAK_RSSI => Some(1),
            CHANNEL_INDEX | TAG_SEEN_COUNT => Some(2),
            RO_SPEC_ID => Some(4),
            INVENTORY_PARAMETER_SPEC_ID | C1G2_CRC | C1G2_PC => Some(2),
            EPC_96 => Some(12),
            SPEC_INDEX | CLIENT_REQUEST_OP_SPEC_RESULT => Some(2),
            ACCESS_SPEC_ID => Some(4),
            _ => None,
        }
    }
}

/// LLRP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const SUCCESS: Self = Self(0);
    pub const PARAMETER_ERROR: Self = Self(100);
    pub const FIELD_ERROR: Self = Self(101);
    pub const UNEXPECTED_PARAMETER: Self = Self(102);
    pub const MISSING_PARAMETER: Self = Self(103);
    pub const DUPLICATE_PARAMETER: Self = Self(104);
    pub const OVERFLOW_PARAMETER: Self = Self(105);
    pub const OVERFLOW_FIELD: Self = Self(106);
    pub const UNKNOWN_PARAMETER: Self = Self(107);
    pub const UNKNOWN_FIELD: Self = Self(108);
    pub const UNSUPPORTED_MESSAGE: Self = Self(109);
    pub const UNSUPPORTED_VERSION: Self = Self(110);
    pub const UNSUPPORTED_PARAMETER: Self = Self(111);
    pub const UNSUPPORTED_FIELD: Self = Self(209);
    pub const DEVICE_ERROR: Self = Self(401);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Codes a reader uses when it does not implement a request or field.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Self::UNSUPPORTED_MESSAGE
                | Self::UNSUPPORTED_VERSION
                | Self::UNSUPPORTED_PARAMETER
                | Self::UNSUPPORTED_FIELD
        )
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `RequestedData` values for GET_READER_CAPABILITIES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilitiesRequest {
    #[default]
    All,
    GeneralDevice,
    Llrp,
    Regulatory,
    AirProtocol,
}

impl CapabilitiesRequest {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::All),
            1 => Some(Self::GeneralDevice),
            2 => Some(Self::Llrp),
            3 => Some(Self::Regulatory),
            4 => Some(Self::AirProtocol),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::All => 0,
            Self::GeneralDevice => 1,
            Self::Llrp => 2,
            Self::Regulatory => 3,
            Self::AirProtocol => 4,
        }
    }
}

/// `RequestedData` values for GET_READER_CONFIG used by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigRequest {
    #[default]
    All,
    Identification,
    AntennaProperties,
    AntennaConfiguration,
    RoReportSpec,
    ReaderEventNotificationSpec,
    AccessReportSpec,
    LlrpConfigurationStateValue,
    KeepaliveSpec,
    GpiPortCurrentState,
    GpoWriteData,
    EventsAndReports,
}

impl ConfigRequest {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::All),
            1 => Some(Self::Identification),
            2 => Some(Self::AntennaProperties),
            3 => Some(Self::AntennaConfiguration),
            4 => Some(Self::RoReportSpec),
            5 => Some(Self::ReaderEventNotificationSpec),
            6 => Some(Self::AccessReportSpec),
            7 => Some(Self::LlrpConfigurationStateValue),
            8 => Some(Self::KeepaliveSpec),
            9 => Some(Self::GpiPortCurrentState),
            10 => Some(Self::GpoWriteData),
            11 => Some(Self::EventsAndReports),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Identification => 1,
            Self::AntennaProperties => 2,
            Self::AntennaConfiguration => 3,
            Self::RoReportSpec => 4,
            Self::ReaderEventNotificationSpec => 5,
            Self::AccessReportSpec => 6,
            Self::LlrpConfigurationStateValue => 7,
            Self::KeepaliveSpec => 8,
            Self::GpiPortCurrentState => 9,
            Self::GpoWriteData => 10,
            Self::EventsAndReports => 11,
        }
    }
}
