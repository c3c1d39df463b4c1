//! Offline frame decoding

use anyhow::Result;
use trackside_llrp_protocol::Envelope;

use crate::error::CliError;
use crate::output;

/// Parse hex text into frame bytes. Whitespace, `:` and `-` separators and a
/// leading `0x` are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    hex::decode(&digits).map_err(|e| CliError::DecodeError(format!("invalid hex: {e}")))
}

/// Decode one frame and describe it.
pub fn decode_frame(text: &str) -> Result<Envelope, CliError> {
    let frame = parse_hex(text)?;
    Envelope::decode(&frame).map_err(|e| CliError::DecodeError(e.to_string()))
}

pub fn execute(frame: &str, json: bool) -> Result<()> {
    let envelope = decode_frame(frame)?;
    if json {
        let value = output::decoded_json(&envelope);
        println!("{}", serde_json::to_string_pretty(&value).map_err(CliError::from)?);
    } else {
        for line in output::format_decoded(&envelope) {
            println!("{line}");
        }
    }
    Ok(())
}
