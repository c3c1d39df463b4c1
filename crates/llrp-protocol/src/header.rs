//! Message header framing.

use crate::error::{LlrpError, LlrpResult};
use crate::types::LLRP_VERSION;

/// Bytes in every message header.
pub const HEADER_LEN: usize = 10;

/// Decoded message header.
///
/// Layout (big-endian): 3 reserved bits, 3 version bits and a 10 bit message
/// type packed into a u16, then a u32 total length including the header, then
/// a u32 message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u8,
    pub message_type: u16,
    pub length: u32,
    pub message_id: u32,
}

impl MessageHeader {
    pub fn new(message_type: u16, length: u32, message_id: u32) -> Self {
        Self {
            version: LLRP_VERSION,
            message_type,
            length,
            message_id,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let word = (u16::from(self.version & 0x07) << 10) | (self.message_type & 0x03ff);
        out[0..2].copy_from_slice(&word.to_be_bytes());
        out[2..6].copy_from_slice(&self.length.to_be_bytes());
        out[6..10].copy_from_slice(&self.message_id.to_be_bytes());
        out
    }

    /// Decode a header from the first [`HEADER_LEN`] bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> LlrpResult<Self> {
        let head: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(LlrpError::Truncated {
                context: "message header",
                needed: HEADER_LEN,
                available: bytes.len(),
            })?;
        let word = u16::from_be_bytes([head[0], head[1]]);
        let version = ((word >> 10) & 0x07) as u8;
        if !(1..=2).contains(&version) {
            return Err(LlrpError::UnsupportedVersion(version));
        }
        let length = u32::from_be_bytes([head[2], head[3], head[4], head[5]]);
        if (length as usize) < HEADER_LEN {
            return Err(LlrpError::InvalidLength {
                context: "message header",
                length: length as usize,
            });
        }
        Ok(Self {
            version,
            message_type: word & 0x03ff,
            length,
            message_id: u32::from_be_bytes([head[6], head[7], head[8], head[9]]),
        })
    }
}

/// Total length of the frame at the start of `buf`, once its header is
/// available.
///
/// Returns `Ok(None)` while fewer than [`HEADER_LEN`] bytes are buffered.
pub fn frame_length(buf: &[u8], max_frame: usize) -> LlrpResult<Option<usize>> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let header = MessageHeader::decode(buf)?;
    let length = header.length as usize;
    if length > max_frame {
        return Err(LlrpError::FrameTooLarge {
            length,
            max: max_frame,
        });
    }
    Ok(Some(length))
}
