//! Reader session controller.
//!
//! One controller drives one reader from connect to teardown:
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingConnectionNotice -> Scrubbing
//!   -> QueryingCapabilities -> Configuring -> Arming -> Enabling -> Starting
//!   -> Monitoring -> Closing -> Disconnected
//! ```
//!
//! Every handshake step either succeeds or fails the whole session. There are
//! no retries here; whoever owns the controller decides whether to build a
//! new one.

use tracing::{debug, error, info, warn};
use trackside_config::ReaderSettings;
use trackside_core::{
    CapabilityReport, PowerLevel, PresentationEvent, PresentationSink, ReaderEventSink,
    StopSignal, device_clock_now_us,
};
use trackside_errors::{ErrorSeverity, ReaderError, ReaderResult};
use trackside_link::{Connector, ReaderLink};
use trackside_llrp_protocol::{
    AntennaConfiguration, CapabilitiesRequest, ConfigRequest, Envelope, Message, RfTransmitter,
    RoSpec, StatusCode, TransmitPowerEntry,
};

use crate::simulate::Simulator;
use crate::state::SessionState;
use crate::stream::{StreamStats, TagEventStream};

/// ROSpec id meaning "every ROSpec" in DELETE_ROSPEC.
const ALL_RO_SPECS: u32 = 0;

/// Antenna id meaning "every antenna" in reader configuration.
const ALL_ANTENNAS: u16 = 0;

/// Check the status a reader returned for `operation`.
///
/// An ERROR_MESSAGE in place of the expected response counts as a failed
/// status.
///
/// # Errors
///
/// Returns [`ReaderError::Protocol`] if the response has no status and
/// [`ReaderError::DeviceStatus`] if the status is not success.
pub fn check_status(operation: &str, response: &Message) -> ReaderResult<()> {
    let status = response.status().ok_or_else(|| {
        ReaderError::protocol(format!(
            "{} answering {operation} carries no LLRPStatus",
            response.name()
        ))
    })?;
    let is_error_message = matches!(response, Message::ErrorMessage { .. });
    if status.is_success() && !is_error_message {
        return Ok(());
    }
    Err(ReaderError::device_status(
        operation,
        status.code.0,
        Some(status.error_description.clone()),
    ))
}

/// Drives one reader through its handshake and report loop.
pub struct ReaderSessionController<C: Connector> {
    settings: ReaderSettings,
    connector: C,
    link: Option<ReaderLink<C::Transport>>,
    state: SessionState,
    visited: Vec<SessionState>,
    notice_accepted: bool,
    power_table: Vec<TransmitPowerEntry>,
    power_index: Option<u16>,
    capabilities: Option<CapabilityReport>,
    stream: TagEventStream,
    presentation: PresentationSink,
}

impl<C: Connector> ReaderSessionController<C> {
    pub fn new(
        settings: ReaderSettings,
        connector: C,
        events: ReaderEventSink,
        presentation: PresentationSink,
    ) -> Self {
        let stream = TagEventStream::new(settings.reader_id.clone(), events, presentation.clone());
        Self {
            settings,
            connector,
            link: None,
            state: SessionState::Disconnected,
            visited: Vec::new(),
            notice_accepted: false,
            power_table: Vec::new(),
            power_index: None,
            capabilities: None,
            stream,
            presentation,
        }
    }

    pub fn reader_id(&self) -> &str {
        &self.settings.reader_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn states_visited(&self) -> &[SessionState] {
        &self.visited
    }

    pub fn capabilities(&self) -> Option<&CapabilityReport> {
        self.capabilities.as_ref()
    }

    /// Transmit power table index applied during configuration.
    pub fn power_index(&self) -> Option<u16> {
        self.power_index
    }

    pub fn stream_stats(&self) -> StreamStats {
        self.stream.stats()
    }

    fn transition(&mut self, next: SessionState) {
        debug!(reader_id = %self.settings.reader_id, from = %self.state, to = %next, "Session state change");
        self.state = next;
        self.visited.push(next);
        self.presentation.emit(PresentationEvent::ReaderStatus {
            reader_id: self.settings.reader_id.clone(),
            state: next.to_string(),
            capabilities: self.capabilities.clone(),
        });
    }

    fn log(&self, severity: ErrorSeverity, text: impl Into<String>) {
        self.presentation.log(severity, &self.settings.reader_id, text);
    }

    fn link_mut(&mut self) -> ReaderResult<&mut ReaderLink<C::Transport>> {
        self.link
            .as_mut()
            .ok_or_else(|| ReaderError::transport("reader is not connected"))
    }

    /// Send `request`, wait for its response and require a success status.
    async fn transact_and_check(&mut self, request: Message) -> ReaderResult<Message> {
        let operation = request.name();
        let timeout = self.settings.transact_timeout();
        let response = self.link_mut()?.transact(&request, timeout).await?.message;
        if let Err(e) = check_status(&operation, &response) {
            if let ReaderError::DeviceStatus { description, .. } = &e {
                debug!(
                    reader_id = %self.settings.reader_id,
                    %operation,
                    description = description.as_deref().unwrap_or(""),
                    "Request refused"
                );
            }
            return Err(e);
        }
        Ok(response)
    }

    /// Run the handshake up to and including entering `Monitoring`.
    ///
    /// On failure the session is left in `Failed`, one diagnostic line has
    /// been published and the connection has been released.
    ///
    /// # Errors
    ///
    /// Returns the first error any handshake step hit.
    pub async fn connect(&mut self) -> ReaderResult<()> {
        match self.handshake().await {
            Ok(()) => {
                self.transition(SessionState::Monitoring);
                info!(reader_id = %self.settings.reader_id, "Reader armed and reporting");
                self.log(ErrorSeverity::Info, "reader armed and reporting");
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                self.release().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> ReaderResult<()> {
        self.transition(SessionState::Connecting);
        self.open().await?;

        self.transition(SessionState::AwaitingConnectionNotice);
        self.await_connection_notice().await?;
        self.notice_accepted = true;

        self.transition(SessionState::Scrubbing);
        self.scrub().await?;

        self.transition(SessionState::QueryingCapabilities);
        self.query_capabilities().await?;

        self.transition(SessionState::Configuring);
        self.configure().await?;

        let ro_spec_id = self.settings.ro_spec_id;
        self.transition(SessionState::Arming);
        let ro_spec = RoSpec::builder(ro_spec_id).build();
        self.transact_and_check(Message::AddRoSpec { ro_spec }).await?;

        self.transition(SessionState::Enabling);
        self.transact_and_check(Message::EnableRoSpec { ro_spec_id })
            .await?;

        self.transition(SessionState::Starting);
        self.transact_and_check(Message::StartRoSpec { ro_spec_id })
            .await?;
        Ok(())
    }

    async fn open(&mut self) -> ReaderResult<()> {
        let endpoint = self.settings.endpoint().ok_or_else(|| {
            ReaderError::config(format!(
                "reader {} has no address configured",
                self.settings.reader_id
            ))
        })?;
        info!(reader_id = %self.settings.reader_id, %endpoint, "Connecting to reader");
        let transport = self
            .connector
            .connect(&endpoint, self.settings.connect_timeout())
            .await?;
        self.link = Some(ReaderLink::new(self.settings.reader_id.clone(), transport));
        Ok(())
    }

    async fn await_connection_notice(&mut self) -> ReaderResult<()> {
        let timeout = self.settings.connection_notice_timeout();
        let envelope = self
            .link_mut()?
            .receive(timeout)
            .await?
            .ok_or_else(|| ReaderError::timeout("connection notice", timeout))?;
        let data = match envelope.message {
            Message::ReaderEventNotification { data } => data,
            other => {
                return Err(ReaderError::protocol(format!(
                    "expected READER_EVENT_NOTIFICATION as first message, got {}",
                    other.name()
                )));
            }
        };
        match data.connection_attempt {
            Some(status) if status.is_success() => {
                debug!(reader_id = %self.settings.reader_id, "Connection notice accepted");
                Ok(())
            }
            Some(status) => Err(ReaderError::device_status(
                "connection attempt",
                status.to_u16(),
                Some(format!("{status:?}")),
            )),
            None => Err(ReaderError::protocol(
                "connection notice carries no ConnectionAttemptEvent",
            )),
        }
    }

    /// Factory reset (optional) then delete every ROSpec (mandatory).
    async fn scrub(&mut self) -> ReaderResult<()> {
        let reset = Message::SetReaderConfig {
            reset_to_factory_default: true,
            antenna_configurations: Vec::new(),
        };
        match self.transact_and_check(reset).await {
            Ok(_) => {}
            Err(e) if e.status_code().is_some_and(|c| StatusCode(c).is_unsupported()) => {
                info!(reader_id = %self.settings.reader_id, "Factory reset not supported, continuing");
            }
            Err(e) => return Err(e),
        }
        self.transact_and_check(Message::DeleteRoSpec {
            ro_spec_id: ALL_RO_SPECS,
        })
        .await?;
        Ok(())
    }

    async fn query_capabilities(&mut self) -> ReaderResult<()> {
        let response = self
            .transact_and_check(Message::GetReaderCapabilities {
                requested_data: CapabilitiesRequest::All,
            })
            .await?;
        let caps = match response {
            Message::GetReaderCapabilitiesResponse(caps) => caps,
            other => {
                return Err(ReaderError::protocol(format!(
                    "unexpected {} answering GET_READER_CAPABILITIES",
                    other.name()
                )));
            }
        };
        let general = caps
            .general
            .ok_or_else(|| ReaderError::protocol("GeneralDeviceCapabilities missing"))?;
        let regulatory = caps
            .regulatory
            .ok_or_else(|| ReaderError::protocol("RegulatoryCapabilities missing"))?;
        if regulatory.transmit_power_table.is_empty() {
            return Err(ReaderError::protocol("reader reports no transmit power levels"));
        }
        if let Some(required) = self.settings.required_manufacturer {
            if general.manufacturer != required {
                return Err(ReaderError::config(format!(
                    "reader manufacturer {} is not the required {required}",
                    general.manufacturer
                )));
            }
        }

        let report = CapabilityReport {
            manufacturer: general.manufacturer,
            model: general.model,
            firmware_version: general.firmware_version,
            max_antennas: general.max_antennas,
            transmit_power_table: regulatory
                .transmit_power_table
                .iter()
                .map(|entry| PowerLevel {
                    index: entry.index,
                    dbm: entry.dbm(),
                })
                .collect(),
        };
        info!(
            reader_id = %self.settings.reader_id,
            manufacturer = report.manufacturer,
            model = report.model,
            firmware = %report.firmware_version,
            power_levels = report.transmit_power_table.len(),
            "Reader capabilities"
        );
        self.power_table = regulatory.transmit_power_table;
        self.capabilities = Some(report);
        Ok(())
    }

    /// Pick the power index: the configured one if the reader offers it,
    /// otherwise the lowest power level.
    fn select_power_index(&self) -> ReaderResult<u16> {
        match self.settings.transmit_power_index {
            Some(index) if self.power_table.iter().any(|e| e.index == index) => Ok(index),
            Some(index) => Err(ReaderError::config(format!(
                "transmit power index {index} is not offered by the reader (1..={})",
                self.power_table.len()
            ))),
            None => self
                .power_table
                .iter()
                .min_by_key(|e| e.power_centi_dbm)
                .map(|e| e.index)
                .ok_or_else(|| ReaderError::protocol("reader reports no transmit power levels")),
        }
    }

    async fn configure(&mut self) -> ReaderResult<()> {
        let power_index = self.select_power_index()?;

        let response = self
            .transact_and_check(Message::GetReaderConfig {
                antenna_id: ALL_ANTENNAS,
                requested_data: ConfigRequest::All,
            })
            .await?;
        let antenna_configurations = match response {
            Message::GetReaderConfigResponse {
                antenna_configurations,
                ..
            } => antenna_configurations,
            other => {
                return Err(ReaderError::protocol(format!(
                    "unexpected {} answering GET_READER_CONFIG",
                    other.name()
                )));
            }
        };
        let current = antenna_configurations
            .iter()
            .find_map(|a| a.rf_transmitter)
            .ok_or_else(|| ReaderError::protocol("reader configuration has no RFTransmitter"))?;

        let update = Message::SetReaderConfig {
            reset_to_factory_default: false,
            antenna_configurations: vec![AntennaConfiguration {
                antenna_id: ALL_ANTENNAS,
                rf_transmitter: Some(RfTransmitter {
                    hop_table_id: current.hop_table_id,
                    channel_index: current.channel_index,
                    transmit_power: power_index,
                }),
            }],
        };
        self.transact_and_check(update).await?;
        info!(
            reader_id = %self.settings.reader_id,
            power_index,
            hop_table = current.hop_table_id,
            channel = current.channel_index,
            "Antenna power configured"
        );
        self.power_index = Some(power_index);
        Ok(())
    }

    fn fail(&mut self, error: &ReaderError) {
        error!(
            reader_id = %self.settings.reader_id,
            state = %self.state,
            %error,
            "Reader session failed"
        );
        self.log(
            error.severity(),
            format!("{} failed: {error}", self.state),
        );
        self.transition(SessionState::Failed);
    }

    /// Best-effort scrub, then close the transport. Never fails.
    async fn release(&mut self) {
        if self.notice_accepted && self.link.is_some() {
            if let Err(e) = self.scrub().await {
                debug!(reader_id = %self.settings.reader_id, error = %e, "Teardown scrub failed");
            }
        }
        self.notice_accepted = false;
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.close().await {
                debug!(reader_id = %self.settings.reader_id, error = %e, "Transport close failed");
            }
        }
    }

    /// Leave the reader in a clean state and disconnect.
    ///
    /// Safe to call from any state. A failed session stays `Failed`.
    pub async fn close(&mut self) {
        match self.state {
            SessionState::Failed => {
                self.release().await;
                return;
            }
            SessionState::Disconnected if self.link.is_none() => return,
            _ => {}
        }
        self.transition(SessionState::Closing);
        self.release().await;
        self.transition(SessionState::Disconnected);
        info!(reader_id = %self.settings.reader_id, "Reader session closed");
    }

    /// Handle one message received while monitoring.
    async fn dispatch(&mut self, envelope: Envelope) -> ReaderResult<()> {
        match envelope.message {
            Message::RoAccessReport { tag_reports } => {
                self.stream.on_tag_report(&tag_reports);
            }
            Message::ReaderEventNotification { data } => self.stream.on_reader_event(&data),
            Message::Keepalive => {
                self.link_mut()?.send(&Message::KeepaliveAck).await?;
            }
            other => {
                warn!(
                    reader_id = %self.settings.reader_id,
                    message = %other.name(),
                    "Unexpected message while monitoring"
                );
            }
        }
        Ok(())
    }

    /// Consume reports until `stop` is set or the connection is lost.
    ///
    /// Receive timeouts and per-message problems are not errors here; only a
    /// transport failure ends the loop early, leaving the session `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended monitoring.
    pub async fn monitor(&mut self, stop: &StopSignal) -> ReaderResult<()> {
        if self.state != SessionState::Monitoring {
            return Err(ReaderError::protocol(format!(
                "cannot monitor while {}",
                self.state
            )));
        }
        let timeout = self.settings.receive_timeout();
        while !stop.is_stopped() {
            let received = {
                let link = self.link_mut()?;
                tokio::select! {
                    biased;
                    () = stop.stopped() => break,
                    received = link.receive(timeout) => received,
                }
            };
            let outcome = match received {
                Ok(None) => continue,
                Ok(Some(envelope)) => self.dispatch(envelope).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {}
                Err(e) if e.is_fatal_in_monitoring() => {
                    self.fail(&e);
                    self.release().await;
                    return Err(e);
                }
                Err(e) => {
                    warn!(reader_id = %self.settings.reader_id, error = %e, "Ignoring bad message");
                    self.log(ErrorSeverity::Warning, format!("ignored message: {e}"));
                }
            }
        }
        debug!(reader_id = %self.settings.reader_id, "Stop requested, leaving report loop");
        Ok(())
    }

    /// Run the session until `stop` is set: handshake, monitor, close.
    ///
    /// In simulate mode the handshake is skipped and synthetic sightings are
    /// produced instead.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the session.
    pub async fn run(&mut self, stop: &StopSignal) -> ReaderResult<()> {
        self.settings
            .validate()
            .map_err(|e| ReaderError::config(e.to_string()))?;
        if self.settings.simulate {
            self.run_simulated(stop).await;
            return Ok(());
        }
        if stop.is_stopped() {
            return Ok(());
        }

        let handshake = tokio::select! {
            biased;
            () = stop.stopped() => None,
            result = self.connect() => Some(result),
        };
        match handshake {
            None => {
                info!(reader_id = %self.settings.reader_id, "Stop requested during handshake");
                self.close().await;
                return Ok(());
            }
            Some(result) => result?,
        }

        self.monitor(stop).await?;
        self.close().await;
        Ok(())
    }

    async fn run_simulated(&mut self, stop: &StopSignal) {
        info!(reader_id = %self.settings.reader_id, "Simulating reader traffic");
        self.log(ErrorSeverity::Info, "simulate mode: no reader connection");
        let mut simulator = Simulator::new(&self.settings.simulation);
        self.transition(SessionState::Monitoring);
        while !stop.is_stopped() {
            let record = simulator.next_record(device_clock_now_us());
            self.stream.on_tag_report(std::slice::from_ref(&record));
            let pause = simulator.next_interval();
            tokio::select! {
                biased;
                () = stop.stopped() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }
        self.close().await;
    }
}
