//! In-memory reader for tests.
//!
//! [`MockTransport`] is a [`FrameTransport`] whose far end is driven by the
//! test through a [`MockHandle`]. A [`ScriptedReader`] can be installed as
//! the far end to answer requests the way a well behaved reader does, with
//! per-request failure injection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;
use trackside_errors::{ReaderError, ReaderResult};
use trackside_llrp_protocol::{
    AntennaConfiguration, ConnectionAttemptStatus, Envelope, GeneralDeviceCapabilities,
    IMPINJ_PEN, LlrpStatus, Message, MessageType, ReaderCapabilities,
    ReaderEventNotificationData, RegulatoryCapabilities, RfTransmitter, StatusCode,
    TagReportData, TransmitPowerEntry,
};

use crate::transport::{Connector, FrameTransport};

/// Computes the reader's replies to one request.
pub type Responder = Box<dyn FnMut(&Envelope) -> Vec<Message> + Send>;

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Envelope>,
    disconnected: bool,
    closed: bool,
    responder: Option<Responder>,
}

struct Shared {
    state: Mutex<MockState>,
    notify: Notify,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            notify: Notify::new(),
        })
    }
}

/// Client side of an in-memory reader connection.
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let shared = Shared::new();
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockHandle { shared },
        )
    }
}

#[async_trait::async_trait]
impl FrameTransport for MockTransport {
    async fn write_frame(&mut self, frame: &[u8]) -> ReaderResult<()> {
        let mut state = self.shared.state.lock();
        if state.closed || state.disconnected {
            return Err(ReaderError::transport("mock reader connection is down"));
        }
        let envelope = match Envelope::decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "Mock reader received an undecodable frame");
                return Ok(());
            }
        };
        let replies = match state.responder.as_mut() {
            Some(responder) => responder(&envelope),
            None => Vec::new(),
        };
        for reply in replies {
            state.inbound.push_back(reply.encode(envelope.message_id)?);
        }
        state.sent.push(envelope);
        drop(state);
        self.shared.notify.notify_one();
        Ok(())
    }

    async fn read_frame(&mut self) -> ReaderResult<Vec<u8>> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if let Some(frame) = state.inbound.pop_front() {
                    return Ok(frame);
                }
                if state.closed || state.disconnected {
                    return Err(ReaderError::transport("mock reader connection is down"));
                }
            }
            self.shared.notify.notified().await;
        }
    }

    async fn close(&mut self) -> ReaderResult<()> {
        self.shared.state.lock().closed = true;
        self.shared.notify.notify_one();
        Ok(())
    }

    fn peer(&self) -> String {
        "mock-reader".to_string()
    }
}

/// Test side of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockHandle {
    /// Queue a message from the reader, sent with message id 0.
    pub fn push(&self, message: Message) {
        if let Ok(frame) = message.encode(0) {
            self.push_raw(frame);
        }
    }

    /// Queue raw bytes as one frame from the reader.
    pub fn push_raw(&self, frame: Vec<u8>) {
        self.shared.state.lock().inbound.push_back(frame);
        self.shared.notify.notify_one();
    }

    /// Install the far end that answers client requests.
    pub fn set_responder(&self, responder: Responder) {
        self.shared.state.lock().responder = Some(responder);
    }

    /// Drop the connection from the reader side.
    pub fn disconnect(&self) {
        self.shared.state.lock().disconnected = true;
        self.shared.notify.notify_one();
    }

    /// Every message the client has sent, in order.
    pub fn sent(&self) -> Vec<Envelope> {
        self.shared.state.lock().sent.clone()
    }

    pub fn sent_types(&self) -> Vec<MessageType> {
        self.shared
            .state
            .lock()
            .sent
            .iter()
            .filter_map(|e| e.message.message_type())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

/// A reader that answers every request successfully unless told otherwise.
#[derive(Debug, Clone)]
pub struct ScriptedReader {
    greeting: Option<Message>,
    capabilities: ReaderCapabilities,
    antenna_configurations: Vec<AntennaConfiguration>,
    failures: HashMap<MessageType, StatusCode>,
    factory_reset_failure: Option<StatusCode>,
    ignored: HashSet<MessageType>,
    error_messages: HashSet<MessageType>,
    missing_status: HashSet<MessageType>,
    reports_after_start: Vec<TagReportData>,
}

impl Default for ScriptedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReader {
    /// Lowest entry of the default power table, in centi-dBm.
    pub const MIN_POWER_CENTI_DBM: i16 = 1000;
    /// Entries in the default power table, indexed from 1.
    pub const POWER_LEVELS: u16 = 81;
    pub const HOP_TABLE_ID: u16 = 7;
    pub const CHANNEL_INDEX: u16 = 3;

    pub fn new() -> Self {
        let transmit_power_table = (1..=Self::POWER_LEVELS)
            .zip(0i16..)
            .map(|(index, step)| TransmitPowerEntry {
                index,
                power_centi_dbm: Self::MIN_POWER_CENTI_DBM + step * 25,
            })
            .collect();
        Self {
            greeting: Some(Message::ReaderEventNotification {
                data: ReaderEventNotificationData::connection_attempt(
                    ConnectionAttemptStatus::Success,
                    1_700_000_000_000_000,
                ),
            }),
            capabilities: ReaderCapabilities {
                status: Some(LlrpStatus::success()),
                general: Some(GeneralDeviceCapabilities {
                    max_antennas: 4,
                    can_set_antenna_properties: true,
                    has_utc_clock: true,
                    manufacturer: IMPINJ_PEN,
                    model: 2_001_002,
                    firmware_version: "5.14.0.240".to_string(),
                }),
                regulatory: Some(RegulatoryCapabilities {
                    country_code: 840,
                    communications_standard: 1,
                    transmit_power_table,
                }),
            },
            antenna_configurations: vec![AntennaConfiguration {
                antenna_id: 1,
                rf_transmitter: Some(RfTransmitter {
                    hop_table_id: Self::HOP_TABLE_ID,
                    channel_index: Self::CHANNEL_INDEX,
                    transmit_power: Self::POWER_LEVELS,
                }),
            }],
            failures: HashMap::new(),
            factory_reset_failure: None,
            ignored: HashSet::new(),
            error_messages: HashSet::new(),
            missing_status: HashSet::new(),
            reports_after_start: Vec::new(),
        }
    }

    /// Replace the connection notice with a different first message.
    #[must_use]
    pub fn greeting(mut self, message: Message) -> Self {
        self.greeting = Some(message);
        self
    }

    #[must_use]
    pub fn connection_status(self, status: ConnectionAttemptStatus) -> Self {
        self.greeting(Message::ReaderEventNotification {
            data: ReaderEventNotificationData::connection_attempt(status, 1_700_000_000_000_000),
        })
    }

    /// Stay silent after the connection opens.
    #[must_use]
    pub fn without_greeting(mut self) -> Self {
        self.greeting = None;
        self
    }

    #[must_use]
    pub fn manufacturer(mut self, pen: u32) -> Self {
        if let Some(general) = self.capabilities.general.as_mut() {
            general.manufacturer = pen;
        }
        self
    }

    /// Answer GET_READER_CAPABILITIES with a status and nothing else.
    #[must_use]
    pub fn without_capabilities(mut self) -> Self {
        self.capabilities.general = None;
        self.capabilities.regulatory = None;
        self
    }

    #[must_use]
    pub fn antenna_configurations(mut self, configurations: Vec<AntennaConfiguration>) -> Self {
        self.antenna_configurations = configurations;
        self
    }

    /// Answer `request` with a failed status.
    #[must_use]
    pub fn fail(mut self, request: MessageType, code: StatusCode) -> Self {
        self.failures.insert(request, code);
        self
    }

    /// Answer only the factory reset form of SET_READER_CONFIG with `code`.
    #[must_use]
    pub fn fail_factory_reset(mut self, code: StatusCode) -> Self {
        self.factory_reset_failure = Some(code);
        self
    }

    /// Never answer `request`.
    #[must_use]
    pub fn ignore(mut self, request: MessageType) -> Self {
        self.ignored.insert(request);
        self
    }

    /// Answer `request` with ERROR_MESSAGE instead of its response type.
    #[must_use]
    pub fn reply_with_error_message(mut self, request: MessageType) -> Self {
        self.error_messages.insert(request);
        self
    }

    /// Answer `request` with a response that has no LLRPStatus.
    #[must_use]
    pub fn omit_status(mut self, request: MessageType) -> Self {
        self.missing_status.insert(request);
        self
    }

    /// Send these tag reports, one per RO_ACCESS_REPORT, after START_ROSPEC.
    #[must_use]
    pub fn reports_after_start(mut self, reports: Vec<TagReportData>) -> Self {
        self.reports_after_start = reports;
        self
    }

    fn status_for(&self, request: MessageType, factory_reset: bool) -> Option<LlrpStatus> {
        if self.missing_status.contains(&request) {
            return None;
        }
        let failure = if factory_reset {
            self.factory_reset_failure
                .or_else(|| self.failures.get(&request).copied())
        } else {
            self.failures.get(&request).copied()
        };
        Some(match failure {
            Some(code) => LlrpStatus::failure(code, format!("{request} failed")),
            None => LlrpStatus::success(),
        })
    }

    /// Replies to one request.
    pub fn respond(&mut self, request: &Message) -> Vec<Message> {
        let Some(request_type) = request.message_type() else {
            return Vec::new();
        };
        if request_type.response_type().is_none() || self.ignored.contains(&request_type) {
            return Vec::new();
        }
        if self.error_messages.contains(&request_type) {
            return vec![Message::ErrorMessage {
                status: Some(LlrpStatus::failure(
                    StatusCode::UNSUPPORTED_MESSAGE,
                    format!("{request_type} not supported"),
                )),
            }];
        }

        let factory_reset = matches!(
            request,
            Message::SetReaderConfig {
                reset_to_factory_default: true,
                ..
            }
        );
        let status = self.status_for(request_type, factory_reset);
        let response = match request_type {
            MessageType::GetReaderCapabilities => {
                Message::GetReaderCapabilitiesResponse(ReaderCapabilities {
                    status,
                    ..self.capabilities.clone()
                })
            }
            MessageType::GetReaderConfig => Message::GetReaderConfigResponse {
                status,
                antenna_configurations: self.antenna_configurations.clone(),
            },
            MessageType::SetReaderConfig => Message::SetReaderConfigResponse { status },
            MessageType::CloseConnection => Message::CloseConnectionResponse { status },
            MessageType::AddRoSpec => Message::AddRoSpecResponse { status },
            MessageType::DeleteRoSpec => Message::DeleteRoSpecResponse { status },
            MessageType::StartRoSpec => Message::StartRoSpecResponse { status },
            MessageType::StopRoSpec => Message::StopRoSpecResponse { status },
            MessageType::EnableRoSpec => Message::EnableRoSpecResponse { status },
            MessageType::DisableRoSpec => Message::DisableRoSpecResponse { status },
            _ => return Vec::new(),
        };

        let started = request_type == MessageType::StartRoSpec
            && response.status().is_some_and(LlrpStatus::is_success);
        let mut replies = vec![response];
        if started {
            replies.extend(
                self.reports_after_start
                    .drain(..)
                    .map(|report| Message::RoAccessReport {
                        tag_reports: vec![report],
                    }),
            );
        }
        replies
    }

    pub fn into_responder(mut self) -> Responder {
        Box::new(move |envelope: &Envelope| self.respond(&envelope.message))
    }
}

/// Connector that hands out one scripted in-memory connection.
pub struct MockConnector {
    handle: MockHandle,
    transport: Mutex<Option<MockTransport>>,
    greeting: Option<Message>,
    refuse: bool,
    connect_delay: Duration,
}

impl MockConnector {
    pub fn new(mut script: ScriptedReader) -> Self {
        let (transport, handle) = MockTransport::new();
        let greeting = script.greeting.take();
        handle.set_responder(script.into_responder());
        Self {
            handle,
            transport: Mutex::new(Some(transport)),
            greeting,
            refuse: false,
            connect_delay: Duration::ZERO,
        }
    }

    /// A connector whose connection attempts all fail.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(ScriptedReader::new())
        }
    }

    /// Delay each connection attempt by `delay`.
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, endpoint: &str, timeout: Duration) -> ReaderResult<MockTransport> {
        if !self.connect_delay.is_zero() {
            if self.connect_delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ReaderError::timeout(format!("connect to {endpoint}"), timeout));
            }
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.refuse {
            return Err(ReaderError::transport(format!(
                "connect to {endpoint}: connection refused"
            )));
        }
        let transport = self
            .transport
            .lock()
            .take()
            .ok_or_else(|| ReaderError::transport("mock reader already connected"))?;
        if let Some(greeting) = &self.greeting {
            self.handle.push(greeting.clone());
        }
        Ok(transport)
    }
}
