//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use serde_json::{Value, json};
use trackside_core::{CapabilityReport, LapEvent, PresentationEvent};
use trackside_errors::ErrorSeverity;
use trackside_laps::Standing;
use trackside_llrp_protocol::{Envelope, Message, TagReportData};

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn severity_label(severity: ErrorSeverity) -> ColoredString {
    let label = format!("[{severity}]");
    match severity {
        ErrorSeverity::Info => label.normal(),
        ErrorSeverity::Warning => label.yellow(),
        ErrorSeverity::Error => label.red(),
        ErrorSeverity::Critical => label.red().bold(),
    }
}

fn format_lap(lap: &LapEvent) -> String {
    if lap.lap_secs > 0.0 {
        format!(
            "{} lap {}: {:.3}s",
            lap.rider_name.bold(),
            lap.lap_count,
            lap.lap_secs
        )
    } else {
        format!("{} ({}) timing started", lap.rider_name.bold(), lap.tag_id.dimmed())
    }
}

fn format_capabilities(caps: &CapabilityReport) -> String {
    let power = match (caps.transmit_power_table.first(), caps.transmit_power_table.last()) {
        (Some(low), Some(high)) => format!(
            "{} power levels {:.2}..{:.2} dBm",
            caps.transmit_power_table.len(),
            low.dbm,
            high.dbm
        ),
        _ => "no power levels".to_string(),
    };
    format!(
        "manufacturer {} model {} firmware {}, {} antennas, {}",
        caps.manufacturer, caps.model, caps.firmware_version, caps.max_antennas, power
    )
}

/// One console line for a presentation event.
pub fn format_event(event: &PresentationEvent) -> String {
    match event {
        PresentationEvent::Log {
            severity,
            source,
            text,
        } => format!("{} {}: {}", severity_label(*severity), source, text),
        PresentationEvent::Lap(lap) => format_lap(lap),
        PresentationEvent::ReaderStatus {
            reader_id,
            state,
            capabilities,
        } => match capabilities {
            Some(caps) => format!("{reader_id}: {} ({})", state.cyan(), format_capabilities(caps)),
            None => format!("{reader_id}: {}", state.cyan()),
        },
    }
}

/// A presentation event as one JSON object.
pub fn event_json(event: &PresentationEvent) -> Value {
    match event {
        PresentationEvent::Log {
            severity,
            source,
            text,
        } => json!({
            "event": "log",
            "severity": severity.to_string(),
            "source": source,
            "text": text,
        }),
        PresentationEvent::Lap(lap) => json!({
            "event": "lap",
            "rider": lap.rider_name,
            "tag_id": lap.tag_id,
            "device_timestamp_us": lap.device_timestamp_us,
            "lap_secs": lap.lap_secs,
            "lap_count": lap.lap_count,
        }),
        PresentationEvent::ReaderStatus {
            reader_id,
            state,
            capabilities,
        } => json!({
            "event": "reader_status",
            "reader_id": reader_id,
            "state": state,
            "capabilities": capabilities.as_ref().map(|caps| json!({
                "manufacturer": caps.manufacturer,
                "model": caps.model,
                "firmware_version": caps.firmware_version,
                "max_antennas": caps.max_antennas,
                "power_levels": caps.transmit_power_table.len(),
            })),
        }),
    }
}

fn format_secs(secs: Option<f64>) -> String {
    secs.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"))
}

/// Print the final standings
pub fn print_leaderboard(standings: &[Standing], json: bool) {
    if json {
        let rows: Vec<Value> = standings
            .iter()
            .map(|s| {
                json!({
                    "position": s.position,
                    "tag_id": s.tag_id,
                    "name": s.name,
                    "lap_count": s.lap_count,
                    "best_lap_secs": s.best_lap_secs,
                    "average_lap_secs": s.average_lap_secs,
                })
            })
            .collect();
        println!("{}", json!({ "success": true, "leaderboard": rows }));
        return;
    }

    if standings.is_empty() {
        println!("{}", "No riders on track".yellow());
        return;
    }
    println!("{}", "Leaderboard:".bold());
    println!(
        "  {:>3}  {:<24} {:>5} {:>10} {:>10}",
        "#", "Rider", "Laps", "Best", "Average"
    );
    for s in standings {
        println!(
            "  {:>3}  {:<24} {:>5} {:>10} {:>10}",
            s.position,
            s.name,
            s.lap_count,
            format_secs(s.best_lap_secs),
            format_secs(s.average_lap_secs)
        );
    }
}

fn tag_line(record: &TagReportData) -> String {
    let epc = record
        .epc
        .as_ref()
        .map_or_else(|| "<no epc>".to_string(), |e| e.to_hex());
    let antenna = record
        .antenna_id
        .map_or_else(|| "-".to_string(), |a| a.to_string());
    let seen = record
        .first_seen_utc
        .or(record.first_seen_uptime)
        .map_or_else(|| "-".to_string(), |t| t.to_string());
    format!("epc {epc} antenna {antenna} first_seen_us {seen}")
}

/// Human-readable description of a decoded frame
pub fn format_decoded(envelope: &Envelope) -> Vec<String> {
    let message = &envelope.message;
    let mut lines = vec![format!(
        "{} (type {}, id {}, {:?})",
        message.name(),
        message.type_code(),
        envelope.message_id,
        message.kind()
    )];
    if let Some(status) = message.status() {
        if status.error_description.is_empty() {
            lines.push(format!("  status: {}", status.code));
        } else {
            lines.push(format!(
                "  status: {} ({})",
                status.code, status.error_description
            ));
        }
    }
    match message {
        Message::RoAccessReport { tag_reports } => {
            lines.extend(tag_reports.iter().map(|r| format!("  {}", tag_line(r))));
        }
        Message::ReaderEventNotification { data } => {
            lines.push(format!("  {data:?}"));
        }
        Message::Unknown { payload, .. } => {
            lines.push(format!("  payload: {}", hex::encode(payload)));
        }
        _ => {}
    }
    lines
}

/// JSON description of a decoded frame
pub fn decoded_json(envelope: &Envelope) -> Value {
    let message = &envelope.message;
    let tags: Vec<Value> = match message {
        Message::RoAccessReport { tag_reports } => tag_reports
            .iter()
            .map(|r| {
                json!({
                    "epc": r.epc.as_ref().map(|e| e.to_hex()),
                    "antenna_id": r.antenna_id,
                    "first_seen_utc": r.first_seen_utc,
                    "first_seen_uptime": r.first_seen_uptime,
                })
            })
            .collect(),
        _ => Vec::new(),
    };
    json!({
        "success": true,
        "message_id": envelope.message_id,
        "type": message.name(),
        "type_code": message.type_code(),
        "kind": format!("{:?}", message.kind()),
        "status": message.status().map(|s| json!({
            "code": s.code.0,
            "description": s.error_description,
        })),
        "tag_reports": tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackside_core::PowerLevel;
    use trackside_llrp_protocol::{Epc, LlrpStatus, StatusCode};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_lap_lines() {
        plain();
        let mut lap = LapEvent {
            rider_name: "Ana".to_string(),
            tag_id: "ab12".to_string(),
            device_timestamp_us: 0,
            lap_secs: 0.0,
            lap_count: 0,
        };
        assert_eq!(format_event(&PresentationEvent::Lap(lap.clone())), "Ana (ab12) timing started");
        lap.lap_secs = 15.25;
        lap.lap_count = 2;
        assert_eq!(format_event(&PresentationEvent::Lap(lap)), "Ana lap 2: 15.250s");
    }

    #[test]
    fn test_status_line_with_capabilities() {
        plain();
        let event = PresentationEvent::ReaderStatus {
            reader_id: "gate".to_string(),
            state: "configuring".to_string(),
            capabilities: Some(CapabilityReport {
                manufacturer: 25882,
                model: 2,
                firmware_version: "5.14".to_string(),
                max_antennas: 4,
                transmit_power_table: vec![
                    PowerLevel { index: 1, dbm: 10.0 },
                    PowerLevel { index: 2, dbm: 10.25 },
                ],
            }),
        };
        assert_eq!(
            format_event(&event),
            "gate: configuring (manufacturer 25882 model 2 firmware 5.14, 4 antennas, 2 power levels 10.00..10.25 dBm)"
        );
    }

    #[test]
    fn test_log_json_carries_severity() {
        let event = PresentationEvent::Log {
            severity: ErrorSeverity::Warning,
            source: "gate".to_string(),
            text: "antenna 2 disconnected".to_string(),
        };
        let value = event_json(&event);
        assert_eq!(value["severity"], "WARN");
        assert_eq!(value["event"], "log");
    }

    #[test]
    fn test_decoded_report_lists_tags() {
        plain();
        let envelope = Envelope::new(
            9,
            Message::RoAccessReport {
                tag_reports: vec![TagReportData::sighting(
                    Epc::from_bytes(&[0x20, 0x16, 0, 0, 0, 7]),
                    2,
                    1_000,
                )],
            },
        );
        let lines = format_decoded(&envelope);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("RO_ACCESS_REPORT (type 61, id 9"));
        assert_eq!(lines[1], "  epc 201600000007 antenna 2 first_seen_us 1000");
    }

    #[test]
    fn test_decoded_status_json() {
        let envelope = Envelope::new(
            4,
            Message::ErrorMessage {
                status: Some(LlrpStatus::failure(
                    StatusCode::UNSUPPORTED_MESSAGE,
                    "nope",
                )),
            },
        );
        let value = decoded_json(&envelope);
        assert_eq!(value["type"], "ERROR_MESSAGE");
        assert_eq!(value["status"]["code"], 109);
        assert_eq!(value["status"]["description"], "nope");
    }
}
