//! Tag identity as carried in tag reports.

/// Electronic product code of a sighted tag.
///
/// Readers report 96-bit codes in the compact `EPC-96` form and anything else
/// in a variable length `EPCData` parameter. Both forms collapse to the same
/// canonical bytes, so a tag has a single identity whichever form it arrives
/// in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Epc {
    /// Compact 96-bit form
    Epc96([u8; 12]),
    /// Variable length form
    Data {
        /// Number of significant bits
        bit_len: u16,
        /// `bit_len` bits, padded to whole bytes
        bytes: Vec<u8>,
    },
}

impl Epc {
    /// Build the variable length form from whole bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bit_len = u16::try_from(bytes.len().saturating_mul(8)).unwrap_or(u16::MAX);
        Self::from_bits(bit_len, bytes)
    }

    /// Build the variable length form from the first `bit_len` bits of
    /// `bytes`. Pad bits in the last byte are cleared.
    pub fn from_bits(bit_len: u16, bytes: &[u8]) -> Self {
        let keep = usize::from(bit_len).div_ceil(8);
        let mut bytes: Vec<u8> = bytes.iter().take(keep).copied().collect();
        let pad = (8 - bit_len % 8) % 8;
        if bytes.len() == keep {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xffu8 << pad;
            }
        }
        Epc::Data { bit_len, bytes }
    }

    /// Canonical identity bytes.
    pub fn canonical_bytes(&self) -> &[u8] {
        match self {
            Epc::Epc96(bytes) => bytes,
            Epc::Data { bytes, .. } => bytes,
        }
    }

    /// Lowercase hex of the canonical bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.canonical_bytes())
    }

    pub fn bit_len(&self) -> u16 {
        match self {
            Epc::Epc96(_) => 96,
            Epc::Data { bit_len, .. } => *bit_len,
        }
    }
}

impl std::fmt::Display for Epc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
