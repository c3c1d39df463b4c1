//! Big-endian field cursor and parameter framing.

use crate::error::{LlrpError, LlrpResult};
use crate::types::tv_type;

/// One parameter as found on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawParam<'a> {
    Tlv { param_type: u16, body: &'a [u8] },
    Tv { tv: u8, value: &'a [u8] },
}

/// Read cursor over a message or parameter body.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8], context: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            context,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, n: usize) -> LlrpResult<&'a [u8]> {
        let truncated = LlrpError::Truncated {
            context: self.context,
            needed: n,
            available: self.remaining(),
        };
        let end = self.pos.checked_add(n).ok_or(truncated.clone())?;
        let slice = self.buf.get(self.pos..end).ok_or(truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> LlrpResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> LlrpResult<u8> {
        Ok(u8::from_be_bytes(self.array()?))
    }

    pub(crate) fn i8(&mut self) -> LlrpResult<i8> {
        Ok(i8::from_be_bytes(self.array()?))
    }

    pub(crate) fn u16(&mut self) -> LlrpResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i16(&mut self) -> LlrpResult<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> LlrpResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> LlrpResult<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// `utf8v`: u16 byte count followed by the bytes.
    pub(crate) fn utf8v(&mut self) -> LlrpResult<String> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// `u16v`: u16 element count followed by the elements.
    pub(crate) fn u16v(&mut self) -> LlrpResult<Vec<u16>> {
        let count = self.u16()?;
        (0..count).map(|_| self.u16()).collect()
    }

    /// `u1v`: u16 bit count followed by the bits, padded to whole bytes.
    pub(crate) fn u1v(&mut self) -> LlrpResult<(u16, &'a [u8])> {
        let bits = self.u16()?;
        let bytes = usize::from(bits).div_ceil(8);
        Ok((bits, self.take(bytes)?))
    }

    /// Next TLV or TV parameter, or `None` once the body is exhausted.
    pub(crate) fn next_param(&mut self) -> LlrpResult<Option<RawParam<'a>>> {
        let Some(&first) = self.buf.get(self.pos) else {
            return Ok(None);
        };
        if first & 0x80 != 0 {
            let tv = first & 0x7f;
            let len = tv_type::value_len(tv).ok_or(LlrpError::UnknownTvType(tv))?;
            let raw = self.take(1 + len)?;
            let value = raw.get(1..).unwrap_or_default();
            return Ok(Some(RawParam::Tv { tv, value }));
        }
        let header = self.u16()?;
        let length = usize::from(self.u16()?);
        if length < 4 {
            return Err(LlrpError::InvalidLength {
                context: self.context,
                length,
            });
        }
        let body = self.take(length - 4)?;
        Ok(Some(RawParam::Tlv {
            param_type: header & 0x03ff,
            body,
        }))
    }
}

/// Write buffer with TLV length back-patching.
#[derive(Debug, Default)]
pub(crate) struct WireWriter {
    buf: Vec<u8>,
}

/// Position of an open TLV header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TlvMark(usize);

impl WireWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn put_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn put_utf8v(&mut self, field: &'static str, s: &str) -> LlrpResult<()> {
        let len = u16::try_from(s.len()).ok().ok_or(LlrpError::FieldOverflow {
            field,
            length: s.len(),
        })?;
        self.put_u16(len);
        self.put_bytes(s.as_bytes());
        Ok(())
    }

    pub(crate) fn put_u16v(&mut self, field: &'static str, values: &[u16]) -> LlrpResult<()> {
        let count = u16::try_from(values.len()).ok().ok_or(LlrpError::FieldOverflow {
            field,
            length: values.len(),
        })?;
        self.put_u16(count);
        for v in values {
            self.put_u16(*v);
        }
        Ok(())
    }

    pub(crate) fn put_u1v(&mut self, bits: u16, bytes: &[u8]) {
        self.put_u16(bits);
        self.put_bytes(bytes);
    }

    pub(crate) fn put_tv(&mut self, tv: u8) {
        self.put_u8(0x80 | tv);
    }

    pub(crate) fn begin_tlv(&mut self, param_type: u16) -> TlvMark {
        let mark = TlvMark(self.buf.len());
        self.put_u16(param_type & 0x03ff);
        self.put_u16(0);
        mark
    }

    pub(crate) fn end_tlv(&mut self, mark: TlvMark, field: &'static str) -> LlrpResult<()> {
        let total = self.buf.len() - mark.0;
        let len = u16::try_from(total).ok().ok_or(LlrpError::FieldOverflow {
            field,
            length: total,
        })?;
        if let Some(slot) = self.buf.get_mut(mark.0 + 2..mark.0 + 4) {
            slot.copy_from_slice(&len.to_be_bytes());
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
