//! Session controller tests against a scripted in-memory reader.

use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use trackside_config::ReaderSettings;
use trackside_core::{EventSink, PresentationEvent, ReaderEvent, StopSignal};
use trackside_errors::ReaderError;
use trackside_link::mock::{MockConnector, MockHandle, ScriptedReader};
use trackside_link::{FrameTransport, TcpConnector, TcpTransport};
use trackside_llrp_protocol::{
    AntennaConfiguration, AntennaEvent, AntennaEventType, ConnectionAttemptStatus, Envelope, Epc,
    EventTimestamp, MAX_FRAME_BYTES, Message, MessageType, ReaderEventNotificationData,
    RfTransmitter, StatusCode, TagReportData,
};
use trackside_reader::{ReaderSessionController, SessionState};

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Harness {
    session: ReaderSessionController<MockConnector>,
    handle: MockHandle,
    events: UnboundedReceiver<ReaderEvent>,
    presentation: UnboundedReceiver<PresentationEvent>,
}

fn settings() -> Result<ReaderSettings, Box<dyn std::error::Error>> {
    Ok(ReaderSettings::builder("finish-line")
        .address("10.0.0.5")
        .build()?)
}

fn harness_with(settings: ReaderSettings, connector: MockConnector) -> Harness {
    let handle = connector.handle();
    let (events_tx, events) = EventSink::channel();
    let (presentation_tx, presentation) = EventSink::channel();
    Harness {
        session: ReaderSessionController::new(settings, connector, events_tx, presentation_tx),
        handle,
        events,
        presentation,
    }
}

fn harness(script: ScriptedReader) -> Result<Harness, Box<dyn std::error::Error>> {
    Ok(harness_with(settings()?, MockConnector::new(script)))
}

fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn stop_after(stop: &StopSignal, delay: Duration) {
    let stop = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        stop.stop();
    });
}

fn tag(last: u8) -> Epc {
    Epc::from_bytes(&[0x20, 0x16, 0x00, 0x00, 0x00, last])
}

#[tokio::test(start_paused = true)]
async fn test_handshake_visits_states_in_order() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    h.session.connect().await?;

    assert_eq!(h.session.states_visited(), &SessionState::HANDSHAKE[..]);
    assert_eq!(h.session.state(), SessionState::Monitoring);
    assert_eq!(
        h.handle.sent_types(),
        vec![
            MessageType::SetReaderConfig,
            MessageType::DeleteRoSpec,
            MessageType::GetReaderCapabilities,
            MessageType::GetReaderConfig,
            MessageType::SetReaderConfig,
            MessageType::AddRoSpec,
            MessageType::EnableRoSpec,
            MessageType::StartRoSpec,
        ]
    );

    let sent = h.handle.sent();
    let ids: Vec<u32> = sent.iter().map(|e| e.message_id).collect();
    assert!(ids.windows(2).all(|w| w.first() < w.get(1)));
    assert!(sent.iter().any(|e| e.message == Message::DeleteRoSpec { ro_spec_id: 0 }));
    assert!(sent.iter().any(|e| e.message == Message::StartRoSpec { ro_spec_id: 123 }));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_configuring_keeps_hop_table_and_uses_lowest_power() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    h.session.connect().await?;

    assert_eq!(h.session.power_index(), Some(1));
    let update = h.handle.sent().into_iter().find_map(|e| match e.message {
        Message::SetReaderConfig {
            reset_to_factory_default: false,
            antenna_configurations,
        } => Some(antenna_configurations),
        _ => None,
    });
    assert_eq!(
        update,
        Some(vec![AntennaConfiguration {
            antenna_id: 0,
            rf_transmitter: Some(RfTransmitter {
                hop_table_id: ScriptedReader::HOP_TABLE_ID,
                channel_index: ScriptedReader::CHANNEL_INDEX,
                transmit_power: 1,
            }),
        }])
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_configured_power_index_is_applied() -> TestResult {
    let settings = ReaderSettings::builder("finish-line")
        .address("10.0.0.5")
        .transmit_power_index(40)
        .build()?;
    let mut h = harness_with(settings, MockConnector::new(ScriptedReader::new()));
    h.session.connect().await?;
    assert_eq!(h.session.power_index(), Some(40));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_power_index_is_config_error() -> TestResult {
    let settings = ReaderSettings::builder("finish-line")
        .address("10.0.0.5")
        .transmit_power_index(200)
        .build()?;
    let mut h = harness_with(settings, MockConnector::new(ScriptedReader::new()));
    let result = h.session.connect().await;

    assert!(matches!(result, Err(ReaderError::Config(_))));
    assert_eq!(h.session.state(), SessionState::Failed);
    let types = h.handle.sent_types();
    assert!(!types.contains(&MessageType::GetReaderConfig));
    assert!(!types.contains(&MessageType::AddRoSpec));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failure_at_each_step_stops_the_handshake() -> TestResult {
    let cases = [
        (
            ScriptedReader::new().fail(MessageType::DeleteRoSpec, StatusCode::DEVICE_ERROR),
            SessionState::Scrubbing,
            MessageType::GetReaderCapabilities,
        ),
        (
            ScriptedReader::new().without_capabilities(),
            SessionState::QueryingCapabilities,
            MessageType::GetReaderConfig,
        ),
        (
            ScriptedReader::new().fail(MessageType::GetReaderConfig, StatusCode::FIELD_ERROR),
            SessionState::Configuring,
            MessageType::AddRoSpec,
        ),
        (
            ScriptedReader::new()
                .fail_factory_reset(StatusCode::UNSUPPORTED_MESSAGE)
                .fail(MessageType::SetReaderConfig, StatusCode::FIELD_ERROR),
            SessionState::Configuring,
            MessageType::AddRoSpec,
        ),
        (
            ScriptedReader::new().fail(MessageType::AddRoSpec, StatusCode::FIELD_ERROR),
            SessionState::Arming,
            MessageType::EnableRoSpec,
        ),
        (
            ScriptedReader::new().fail(MessageType::EnableRoSpec, StatusCode::DEVICE_ERROR),
            SessionState::Enabling,
            MessageType::StartRoSpec,
        ),
        (
            ScriptedReader::new().fail(MessageType::StartRoSpec, StatusCode::DEVICE_ERROR),
            SessionState::Starting,
            MessageType::StopRoSpec,
        ),
    ];

    for (script, failing_state, never_sent) in cases {
        let mut h = harness(script)?;
        let result = h.session.connect().await;
        assert!(result.is_err(), "{failing_state} should fail");

        let step = SessionState::HANDSHAKE
            .iter()
            .position(|s| *s == failing_state)
            .ok_or("state not in handshake")?;
        let mut expected = SessionState::HANDSHAKE
            .get(..=step)
            .ok_or("bad step")?
            .to_vec();
        expected.push(SessionState::Failed);
        assert_eq!(h.session.states_visited(), &expected[..], "{failing_state}");
        assert!(
            !h.handle.sent_types().contains(&never_sent),
            "{failing_state} sent {never_sent}"
        );
        assert!(h.handle.is_closed());
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_handshake_scrubs_after_accepted_notice() -> TestResult {
    let mut h = harness(ScriptedReader::new().fail(MessageType::AddRoSpec, StatusCode::FIELD_ERROR))?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::DeviceStatus { code: 101, .. })));

    let types = h.handle.sent_types();
    assert_eq!(
        types.get(types.len().saturating_sub(2)..),
        Some(&[MessageType::SetReaderConfig, MessageType::DeleteRoSpec][..])
    );

    h.session.close().await;
    assert_eq!(h.session.state(), SessionState::Failed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_one_diagnostic_line_per_failure() -> TestResult {
    let mut h = harness(ScriptedReader::new().fail(MessageType::EnableRoSpec, StatusCode::DEVICE_ERROR))?;
    let result = h.session.connect().await;
    assert!(result.is_err());

    let failures: Vec<String> = drain(&mut h.presentation)
        .into_iter()
        .filter_map(|event| match event {
            PresentationEvent::Log { text, .. } if text.contains("failed") => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures.iter().all(|t| t.starts_with("enabling failed")));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_connection_notice_times_out() -> TestResult {
    let mut h = harness(ScriptedReader::new().without_greeting())?;
    let started = tokio::time::Instant::now();
    let result = h.session.connect().await;

    assert!(matches!(result, Err(ReaderError::Timeout { .. })));
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    assert_eq!(
        h.session.states_visited(),
        &[
            SessionState::Connecting,
            SessionState::AwaitingConnectionNotice,
            SessionState::Failed
        ]
    );
    assert!(h.handle.sent().is_empty());
    assert!(h.handle.is_closed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_bad_connection_notices_are_fatal() -> TestResult {
    let refused = ScriptedReader::new()
        .connection_status(ConnectionAttemptStatus::FailedReaderInitiatedConnectionExists);
    let mut h = harness(refused)?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::DeviceStatus { code: 1, .. })));

    let mut h = harness(ScriptedReader::new().greeting(Message::Keepalive))?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::Protocol(_))));

    let no_attempt = ScriptedReader::new().greeting(Message::ReaderEventNotification {
        data: ReaderEventNotificationData {
            timestamp: Some(EventTimestamp::Utc(1)),
            ..ReaderEventNotificationData::default()
        },
    });
    let mut h = harness(no_attempt)?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::Protocol(_))));
    assert!(h.handle.sent().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_fails_in_connecting() -> TestResult {
    let mut h = harness_with(settings()?, MockConnector::refusing());
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::Transport(_))));
    assert_eq!(
        h.session.states_visited(),
        &[SessionState::Connecting, SessionState::Failed]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_factory_reset_is_optional_only_when_unsupported() -> TestResult {
    for code in [
        StatusCode::UNSUPPORTED_MESSAGE,
        StatusCode::UNSUPPORTED_PARAMETER,
        StatusCode::UNSUPPORTED_FIELD,
    ] {
        let mut h = harness(ScriptedReader::new().fail_factory_reset(code))?;
        h.session.connect().await?;
        assert_eq!(h.session.state(), SessionState::Monitoring);
    }

    let mut h = harness(ScriptedReader::new().fail_factory_reset(StatusCode::DEVICE_ERROR))?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::DeviceStatus { code: 401, .. })));
    assert!(!h.handle.sent_types().contains(&MessageType::GetReaderCapabilities));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_silent_reader_times_out_transact() -> TestResult {
    let mut h = harness(ScriptedReader::new().ignore(MessageType::EnableRoSpec))?;
    let result = h.session.connect().await;
    assert!(matches!(
        result,
        Err(ReaderError::Timeout { ref operation, timeout_ms: 3000 }) if operation == "ENABLE_ROSPEC"
    ));
    assert_eq!(h.session.state(), SessionState::Failed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_response_without_status_is_protocol_error() -> TestResult {
    let mut h = harness(ScriptedReader::new().omit_status(MessageType::AddRoSpec))?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::Protocol(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_error_message_fails_the_step() -> TestResult {
    let mut h = harness(ScriptedReader::new().reply_with_error_message(MessageType::AddRoSpec))?;
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::DeviceStatus { code: 109, .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manufacturer_gate() -> TestResult {
    let settings = ReaderSettings::builder("finish-line")
        .address("10.0.0.5")
        .required_manufacturer(25882)
        .build()?;
    let mut h = harness_with(settings.clone(), MockConnector::new(ScriptedReader::new()));
    h.session.connect().await?;

    let mut h = harness_with(settings, MockConnector::new(ScriptedReader::new().manufacturer(1)));
    let result = h.session.connect().await;
    assert!(matches!(result, Err(ReaderError::Config(_))));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_capabilities_are_published() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    h.session.connect().await?;

    let published = drain(&mut h.presentation)
        .into_iter()
        .find_map(|event| match event {
            PresentationEvent::ReaderStatus {
                state,
                capabilities: Some(caps),
                ..
            } if state == "configuring" => Some(caps),
            _ => None,
        })
        .ok_or("no capability report")?;
    assert_eq!(published.manufacturer, 25882);
    assert_eq!(
        published.transmit_power_table.len(),
        usize::from(ScriptedReader::POWER_LEVELS)
    );
    assert_eq!(published.transmit_power_table.first().map(|p| p.index), Some(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_report_loop_emits_sightings_and_survives_noise() -> TestResult {
    let reports = vec![
        TagReportData::sighting(tag(5), 2, 1_000_000),
        TagReportData {
            antenna_id: None,
            ..TagReportData::sighting(tag(6), 1, 1_500_000)
        },
        TagReportData::sighting(tag(7), 1, 2_000_000),
    ];
    let mut h = harness(ScriptedReader::new().reports_after_start(reports))?;
    h.session.connect().await?;

    h.handle.push(Message::Keepalive);
    h.handle.push(Message::ReaderEventNotification {
        data: ReaderEventNotificationData {
            timestamp: Some(EventTimestamp::Utc(3)),
            antenna_event: Some(AntennaEvent {
                event_type: AntennaEventType::Disconnected,
                antenna_id: 4,
            }),
            ..ReaderEventNotificationData::default()
        },
    });
    h.handle.push(Message::Unknown {
        message_type: 1023,
        payload: vec![1, 2, 3],
    });
    h.handle.push_raw(vec![0x04, 0x3d, 0, 0, 0, 11, 0, 0, 0, 9, 0xfe]);
    h.handle.push(Message::RoAccessReport {
        tag_reports: vec![TagReportData::sighting(tag(5), 3, 9_000_000)],
    });

    let stop = StopSignal::new();
    stop_after(&stop, Duration::from_secs(2));
    h.session.monitor(&stop).await?;

    let sightings: Vec<(String, u16, u64)> = drain(&mut h.events)
        .into_iter()
        .filter_map(|event| match event {
            ReaderEvent::Sighting(s) => Some((s.tag_id, s.antenna_id, s.device_timestamp_us)),
            _ => None,
        })
        .collect();
    assert_eq!(
        sightings,
        vec![
            ("201600000005".to_string(), 2, 1_000_000),
            ("201600000007".to_string(), 1, 2_000_000),
            ("201600000005".to_string(), 3, 9_000_000),
        ]
    );
    let stats = h.session.stream_stats();
    assert_eq!(stats.dropped_records, 1);
    assert_eq!(stats.reader_events, 1);
    assert!(h.handle.sent_types().contains(&MessageType::KeepaliveAck));
    assert_eq!(h.session.state(), SessionState::Monitoring);

    h.session.close().await;
    assert_eq!(h.session.state(), SessionState::Disconnected);
    let types = h.handle.sent_types();
    assert_eq!(
        types.get(types.len().saturating_sub(2)..),
        Some(&[MessageType::SetReaderConfig, MessageType::DeleteRoSpec][..])
    );
    assert!(h.handle.is_closed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connection_loss_while_monitoring_fails_session() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    h.session.connect().await?;
    h.handle.disconnect();

    let stop = StopSignal::new();
    let result = h.session.monitor(&stop).await;
    assert!(matches!(result, Err(ReaderError::Transport(_))));
    assert_eq!(h.session.state(), SessionState::Failed);
    Ok(())
}

/// A reader on a real socket that completes the handshake, then sends a
/// frame with an unparseable header followed by a valid keepalive.
async fn garbled_reader(
    listener: TcpListener,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (socket, _) = listener.accept().await?;
    let mut transport = TcpTransport::new(socket, MAX_FRAME_BYTES);
    let mut script = ScriptedReader::new();
    let notice = Message::ReaderEventNotification {
        data: ReaderEventNotificationData::connection_attempt(
            ConnectionAttemptStatus::Success,
            1_700_000_000_000_000,
        ),
    };
    transport.write_frame(&notice.encode(0)?).await?;
    let mut garbled = false;
    loop {
        let request = match transport.read_frame().await {
            Ok(frame) => Envelope::decode(&frame)?,
            Err(_) => return Ok(()),
        };
        for reply in script.respond(&request.message) {
            transport
                .write_frame(&reply.encode(request.message_id)?)
                .await?;
        }
        if !garbled && request.message.message_type() == Some(MessageType::StartRoSpec) {
            garbled = true;
            transport
                .write_frame(&[0x00, 0x3e, 0, 0, 0, 10, 0, 0, 0, 1])
                .await?;
            transport.write_frame(&Message::Keepalive.encode(2)?).await?;
        }
    }
}

#[tokio::test]
async fn test_lost_framing_over_tcp_fails_session() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let reader = tokio::spawn(garbled_reader(listener));

    let settings = ReaderSettings::builder("finish-line").address(addr).build()?;
    let (events_tx, _events) = EventSink::channel();
    let (presentation_tx, mut presentation) = EventSink::channel();
    let mut session =
        ReaderSessionController::new(settings, TcpConnector::default(), events_tx, presentation_tx);
    session.connect().await?;
    assert_eq!(session.state(), SessionState::Monitoring);

    let stop = StopSignal::new();
    let result = tokio::time::timeout(Duration::from_secs(5), session.monitor(&stop)).await?;
    assert!(matches!(result, Err(ReaderError::Transport(_))));
    assert_eq!(session.state(), SessionState::Failed);

    let ignored = drain(&mut presentation)
        .into_iter()
        .filter(|event| {
            matches!(event, PresentationEvent::Log { text, .. } if text.starts_with("ignored message"))
        })
        .count();
    assert_eq!(ignored, 0);
    reader.abort();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_observed_within_one_receive_timeout() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    h.session.connect().await?;
    let stop = StopSignal::new();
    stop.stop();
    let started = tokio::time::Instant::now();
    h.session.monitor(&stop).await?;
    assert!(started.elapsed() <= Duration::from_millis(500));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_goes_through_closing_to_disconnected() -> TestResult {
    let mut h = harness(ScriptedReader::new())?;
    let stop = StopSignal::new();
    stop_after(&stop, Duration::from_secs(5));
    h.session.run(&stop).await?;

    let mut expected = SessionState::HANDSHAKE.to_vec();
    expected.extend([SessionState::Closing, SessionState::Disconnected]);
    assert_eq!(h.session.states_visited(), &expected[..]);
    assert!(h.handle.is_closed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_handshake_closes_without_scrub() -> TestResult {
    let mut h = harness(ScriptedReader::new().without_greeting())?;
    let stop = StopSignal::new();
    stop_after(&stop, Duration::from_secs(1));
    h.session.run(&stop).await?;

    assert_eq!(
        h.session.states_visited(),
        &[
            SessionState::Connecting,
            SessionState::AwaitingConnectionNotice,
            SessionState::Closing,
            SessionState::Disconnected
        ]
    );
    assert!(h.handle.sent().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_simulate_mode_never_connects() -> TestResult {
    let mut settings = ReaderSettings::builder("practice").simulate(true).build()?;
    settings.simulation.seed = Some(3);
    let mut h = harness_with(settings, MockConnector::refusing());
    let stop = StopSignal::new();
    stop_after(&stop, Duration::from_secs(10));
    h.session.run(&stop).await?;

    assert_eq!(
        h.session.states_visited(),
        &[
            SessionState::Monitoring,
            SessionState::Closing,
            SessionState::Disconnected
        ]
    );
    let sightings: Vec<ReaderEvent> = drain(&mut h.events);
    assert!(sightings.len() >= 10);
    assert!(sightings.iter().all(|event| matches!(
        event,
        ReaderEvent::Sighting(s) if s.tag_id.starts_with("2016000000") && (1..=3).contains(&s.antenna_id)
    )));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_simulate_with_address_is_rejected() -> TestResult {
    let settings = ReaderSettings {
        reader_id: "practice".to_string(),
        simulate: true,
        address: Some("10.0.0.5".to_string()),
        ..ReaderSettings::default()
    };
    let mut h = harness_with(settings, MockConnector::new(ScriptedReader::new()));
    let result = h.session.run(&StopSignal::new()).await;
    assert!(matches!(result, Err(ReaderError::Config(_))));
    assert!(h.session.states_visited().is_empty());
    Ok(())
}
