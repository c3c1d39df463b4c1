//! Reader operation specification.
//!
//! A ROSpec tells the reader when to run inventory, on which antennas, and
//! how to report what it saw. The session installs a single spec that runs
//! until stopped and reports every tag as soon as it is singulated.

use crate::error::{LlrpError, LlrpResult};
use crate::types::param_type;
use crate::wire::{RawParam, WireReader, WireWriter};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn to_u8(self) -> u8 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            fn decode(value: u8, field: &'static str) -> LlrpResult<Self> {
                Self::from_u8(value).ok_or(LlrpError::InvalidField {
                    field,
                    value: u32::from(value),
                })
            }
        }
    };
}

wire_enum!(
    /// Lifecycle state of a ROSpec on the reader.
    RoSpecState { Disabled = 0, Inactive = 1, Active = 2 }
);
wire_enum!(
    RoSpecStartTriggerType { Null = 0, Immediate = 1, Periodic = 2, Gpi = 3 }
);
wire_enum!(
    RoSpecStopTriggerType { Null = 0, Duration = 1, GpiWithTimeout = 2 }
);
wire_enum!(
    AiSpecStopTriggerType { Null = 0, Duration = 1, GpiWithTimeout = 2, TagObservation = 3 }
);
wire_enum!(
    /// Air protocol used by an inventory.
    AirProtocol { Unspecified = 0, EpcGlobalClass1Gen2 = 1 }
);
wire_enum!(
    /// When the reader sends RO_ACCESS_REPORT messages.
    RoReportTrigger { None = 0, UponNTagsOrEndOfAiSpec = 1, UponNTagsOrEndOfRoSpec = 2 }
);

/// Which optional fields a reader puts in each tag report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagReportContentSelector {
    pub enable_ro_spec_id: bool,
    pub enable_spec_index: bool,
    pub enable_inventory_parameter_spec_id: bool,
    pub enable_antenna_id: bool,
    pub enable_channel_index: bool,
    pub enable_peak_rssi: bool,
    pub enable_first_seen_timestamp: bool,
    pub enable_last_seen_timestamp: bool,
    pub enable_tag_seen_count: bool,
    pub enable_access_spec_id: bool,
}

impl TagReportContentSelector {
    /// Antenna id plus first and last seen timestamps.
    pub fn timing() -> Self {
        Self {
            enable_antenna_id: true,
            enable_first_seen_timestamp: true,
            enable_last_seen_timestamp: true,
            ..Self::default()
        }
    }

    pub fn to_bits(self) -> u16 {
        [
            self.enable_ro_spec_id,
            self.enable_spec_index,
            self.enable_inventory_parameter_spec_id,
            self.enable_antenna_id,
            self.enable_channel_index,
            self.enable_peak_rssi,
            self.enable_first_seen_timestamp,
            self.enable_last_seen_timestamp,
            self.enable_tag_seen_count,
            self.enable_access_spec_id,
        ]
        .iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .fold(0u16, |acc, (i, _)| acc | (0x8000 >> i))
    }

    pub fn from_bits(bits: u16) -> Self {
        let on = |i: u16| bits & (0x8000 >> i) != 0;
        Self {
            enable_ro_spec_id: on(0),
            enable_spec_index: on(1),
            enable_inventory_parameter_spec_id: on(2),
            enable_antenna_id: on(3),
            enable_channel_index: on(4),
            enable_peak_rssi: on(5),
            enable_first_seen_timestamp: on(6),
            enable_last_seen_timestamp: on(7),
            enable_tag_seen_count: on(8),
            enable_access_spec_id: on(9),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoReportSpec {
    pub trigger: RoReportTrigger,
    pub n: u16,
    pub content_selector: TagReportContentSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoBoundarySpec {
    pub start_trigger: RoSpecStartTriggerType,
    pub stop_trigger: RoSpecStopTriggerType,
    pub stop_duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSpec {
    /// Antennas to inventory; a single 0 means all antennas
    pub antenna_ids: Vec<u16>,
    pub stop_trigger: AiSpecStopTriggerType,
    pub stop_duration_ms: u32,
    pub inventory_parameter_spec_id: u16,
    pub protocol: AirProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoSpec {
    pub ro_spec_id: u32,
    pub priority: u8,
    pub current_state: RoSpecState,
    pub boundary: RoBoundarySpec,
    pub ai_specs: Vec<AiSpec>,
    pub report_spec: Option<RoReportSpec>,
}

impl RoSpec {
    pub fn builder(ro_spec_id: u32) -> RoSpecBuilder {
        RoSpecBuilder::new(ro_spec_id)
    }

    pub(crate) fn encode(&self, w: &mut WireWriter) -> LlrpResult<()> {
        let mark = w.begin_tlv(param_type::RO_SPEC);
        w.put_u32(self.ro_spec_id);
        w.put_u8(self.priority);
        w.put_u8(self.current_state.to_u8());

        let boundary = w.begin_tlv(param_type::RO_BOUNDARY_SPEC);
        let start = w.begin_tlv(param_type::RO_SPEC_START_TRIGGER);
        w.put_u8(self.boundary.start_trigger.to_u8());
        w.end_tlv(start, "ROSpecStartTrigger")?;
        let stop = w.begin_tlv(param_type::RO_SPEC_STOP_TRIGGER);
        w.put_u8(self.boundary.stop_trigger.to_u8());
        w.put_u32(self.boundary.stop_duration_ms);
        w.end_tlv(stop, "ROSpecStopTrigger")?;
        w.end_tlv(boundary, "ROBoundarySpec")?;

        for ai in &self.ai_specs {
            let a = w.begin_tlv(param_type::AI_SPEC);
            w.put_u16v("AntennaIDs", &ai.antenna_ids)?;
            let stop = w.begin_tlv(param_type::AI_SPEC_STOP_TRIGGER);
            w.put_u8(ai.stop_trigger.to_u8());
            w.put_u32(ai.stop_duration_ms);
            w.end_tlv(stop, "AISpecStopTrigger")?;
            let inv = w.begin_tlv(param_type::INVENTORY_PARAMETER_SPEC);
            w.put_u16(ai.inventory_parameter_spec_id);
            w.put_u8(ai.protocol.to_u8());
            w.end_tlv(inv, "InventoryParameterSpec")?;
            w.end_tlv(a, "AISpec")?;
        }

        if let Some(report) = &self.report_spec {
            let rep = w.begin_tlv(param_type::RO_REPORT_SPEC);
            w.put_u8(report.trigger.to_u8());
            w.put_u16(report.n);
            let sel = w.begin_tlv(param_type::TAG_REPORT_CONTENT_SELECTOR);
            w.put_u16(report.content_selector.to_bits());
            w.end_tlv(sel, "TagReportContentSelector")?;
            w.end_tlv(rep, "ROReportSpec")?;
        }

        w.end_tlv(mark, "ROSpec")
    }

    pub(crate) fn decode(body: &[u8]) -> LlrpResult<Self> {
        let mut r = WireReader::new(body, "ROSpec");
        let ro_spec_id = r.u32()?;
        let priority = r.u8()?;
        let current_state = RoSpecState::decode(r.u8()?, "ROSpec.CurrentState")?;
        let mut boundary = None;
        let mut ai_specs = Vec::new();
        let mut report_spec = None;

        while let Some(param) = r.next_param()? {
            let RawParam::Tlv { param_type: kind, body } = param else {
                continue;
            };
            match kind {
                param_type::RO_BOUNDARY_SPEC => boundary = Some(decode_boundary(body)?),
                param_type::AI_SPEC => ai_specs.push(decode_ai_spec(body)?),
                param_type::RO_REPORT_SPEC => report_spec = Some(decode_report_spec(body)?),
                _ => {}
            }
        }

        Ok(Self {
            ro_spec_id,
            priority,
            current_state,
            boundary: boundary.ok_or(LlrpError::MissingParameter("ROBoundarySpec"))?,
            ai_specs,
            report_spec,
        })
    }
}

fn decode_boundary(body: &[u8]) -> LlrpResult<RoBoundarySpec> {
    let mut r = WireReader::new(body, "ROBoundarySpec");
    let mut spec = RoBoundarySpec::default();
    while let Some(param) = r.next_param()? {
        let RawParam::Tlv { param_type: kind, body } = param else {
            continue;
        };
        let mut p = WireReader::new(body, "ROBoundarySpec trigger");
        match kind {
            param_type::RO_SPEC_START_TRIGGER => {
                spec.start_trigger =
                    RoSpecStartTriggerType::decode(p.u8()?, "ROSpecStartTriggerType")?;
            }
            param_type::RO_SPEC_STOP_TRIGGER => {
                spec.stop_trigger = RoSpecStopTriggerType::decode(p.u8()?, "ROSpecStopTriggerType")?;
                spec.stop_duration_ms = p.u32()?;
            }
            _ => {}
        }
    }
    Ok(spec)
}

fn decode_ai_spec(body: &[u8]) -> LlrpResult<AiSpec> {
    let mut r = WireReader::new(body, "AISpec");
    let antenna_ids = r.u16v()?;
    let mut stop = None;
    let mut inventory = None;
    while let Some(param) = r.next_param()? {
        let RawParam::Tlv { param_type: kind, body } = param else {
            continue;
        };
        let mut p = WireReader::new(body, "AISpec parameter");
        match kind {
            param_type::AI_SPEC_STOP_TRIGGER => {
                let kind = AiSpecStopTriggerType::decode(p.u8()?, "AISpecStopTriggerType")?;
                stop = Some((kind, p.u32()?));
            }
            param_type::INVENTORY_PARAMETER_SPEC if inventory.is_none() => {
                let id = p.u16()?;
                let protocol = AirProtocol::decode(p.u8()?, "ProtocolID")?;
                inventory = Some((id, protocol));
            }
            _ => {}
        }
    }
    let (stop_trigger, stop_duration_ms) =
        stop.ok_or(LlrpError::MissingParameter("AISpecStopTrigger"))?;
    let (inventory_parameter_spec_id, protocol) =
        inventory.ok_or(LlrpError::MissingParameter("InventoryParameterSpec"))?;
    Ok(AiSpec {
        antenna_ids,
        stop_trigger,
        stop_duration_ms,
        inventory_parameter_spec_id,
        protocol,
    })
}

fn decode_report_spec(body: &[u8]) -> LlrpResult<RoReportSpec> {
    let mut r = WireReader::new(body, "ROReportSpec");
    let trigger = RoReportTrigger::decode(r.u8()?, "ROReportTrigger")?;
    let n = r.u16()?;
    let mut content_selector = TagReportContentSelector::default();
    while let Some(param) = r.next_param()? {
        if let RawParam::Tlv {
            param_type: param_type::TAG_REPORT_CONTENT_SELECTOR,
            body,
        } = param
        {
            content_selector = TagReportContentSelector::from_bits(
                WireReader::new(body, "TagReportContentSelector").u16()?,
            );
        }
    }
    Ok(RoReportSpec {
        trigger,
        n,
        content_selector,
    })
}

/// Builder for a [`RoSpec`].
///
/// Defaults describe a disabled spec with null triggers, one Gen2 inventory
/// across all antennas and a report per singulated tag carrying antenna id
/// and seen timestamps.
#[derive(Debug, Clone)]
pub struct RoSpecBuilder {
    spec: RoSpec,
}

impl RoSpecBuilder {
    pub const DEFAULT_INVENTORY_PARAMETER_SPEC_ID: u16 = 1234;

    pub fn new(ro_spec_id: u32) -> Self {
        Self {
            spec: RoSpec {
                ro_spec_id,
                priority: 0,
                current_state: RoSpecState::Disabled,
                boundary: RoBoundarySpec::default(),
                ai_specs: vec![AiSpec {
                    antenna_ids: vec![0],
                    stop_trigger: AiSpecStopTriggerType::Null,
                    stop_duration_ms: 0,
                    inventory_parameter_spec_id: Self::DEFAULT_INVENTORY_PARAMETER_SPEC_ID,
                    protocol: AirProtocol::EpcGlobalClass1Gen2,
                }],
                report_spec: Some(RoReportSpec {
                    trigger: RoReportTrigger::UponNTagsOrEndOfRoSpec,
                    n: 1,
                    content_selector: TagReportContentSelector::timing(),
                }),
            },
        }
    }

    #[must_use]
    pub fn priority(mut self, priority: u8) -> Self {
        self.spec.priority = priority;
        self
    }

    #[must_use]
    pub fn antennas(mut self, antenna_ids: Vec<u16>) -> Self {
        for ai in &mut self.spec.ai_specs {
            ai.antenna_ids = antenna_ids.clone();
        }
        self
    }

    #[must_use]
    pub fn report_every(mut self, n: u16) -> Self {
        if let Some(report) = &mut self.spec.report_spec {
            report.n = n;
        }
        self
    }

    #[must_use]
    pub fn content_selector(mut self, selector: TagReportContentSelector) -> Self {
        if let Some(report) = &mut self.spec.report_spec {
            report.content_selector = selector;
        }
        self
    }

    pub fn build(self) -> RoSpec {
        self.spec
    }
}
