//! LLRP message codec for Trackside reader sessions.
//!
//! This crate is I/O free: it turns typed [`Message`]s into complete frames
//! and back. Framing a byte stream is left to the transport, which can use
//! [`frame_length`] to find message boundaries.
//!
//! Only the subset of LLRP 1.0.1 needed to configure a reader, run one
//! inventory spec and consume its tag reports is modelled. Unrecognised TLV
//! parameters are skipped; an unrecognised TV parameter cannot be skipped
//! because its length is implied by its type, so it fails the decode.
//!
//! # Example
//!
//! ```
//! use trackside_llrp_protocol::{Envelope, Message};
//!
//! let frame = Envelope::new(1, Message::EnableRoSpec { ro_spec_id: 123 }).encode()?;
//! let decoded = Envelope::decode(&frame)?;
//! assert_eq!(decoded.message, Message::EnableRoSpec { ro_spec_id: 123 });
//! # Ok::<(), trackside_llrp_protocol::LlrpError>(())
//! ```

#![deny(static_mut_refs)]

pub mod epc;
pub mod error;
pub mod header;
pub mod message;
pub mod params;
pub mod report;
pub mod rospec;
pub mod types;
mod wire;

pub use epc::Epc;
pub use error::{LlrpError, LlrpResult};
pub use header::{HEADER_LEN, MessageHeader, frame_length};
pub use message::{Envelope, Message, MessageKind, ReaderCapabilities};
pub use params::{
    AntennaConfiguration, GeneralDeviceCapabilities, LlrpStatus, RegulatoryCapabilities,
    RfTransmitter, TransmitPowerEntry,
};
pub use report::{
    AntennaEvent, AntennaEventType, ConnectionAttemptStatus, EventTimestamp,
    ReaderEventNotificationData, TagReportData,
};
pub use rospec::{
    AiSpec, AiSpecStopTriggerType, AirProtocol, RoBoundarySpec, RoReportSpec, RoReportTrigger,
    RoSpec, RoSpecBuilder, RoSpecStartTriggerType, RoSpecState, RoSpecStopTriggerType,
    TagReportContentSelector,
};
pub use types::{CapabilitiesRequest, ConfigRequest, IMPINJ_PEN, LLRP_VERSION, MessageType, StatusCode};

/// Default LLRP TCP port.
pub const DEFAULT_PORT: u16 = 5084;

/// Largest frame accepted from a reader.
pub const MAX_FRAME_BYTES: usize = 32 * 1024;
