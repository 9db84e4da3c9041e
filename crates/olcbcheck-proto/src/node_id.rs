//! 6-byte OpenLCB node identifier.

use std::{fmt, str::FromStr};

use crate::errors::{ProtocolError, Result};

/// Globally unique node identifier, big-endian on the wire.
///
/// AMD and AMR frames carry the node ID as their first 6 data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; 6]);

impl NodeId {
    /// Number of bytes in a node ID.
    pub const LEN: usize = 6;

    /// Create from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Read a node ID from the front of a frame payload.
    ///
    /// Bytes beyond the sixth are ignored.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bytes: [u8; 6] = data
            .get(..Self::LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(ProtocolError::NodeIdTooShort { actual: data.len() })?;
        Ok(Self(bytes))
    }

    /// Raw big-endian bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 6] {
        self.0
    }

    /// Node ID as a 48-bit integer.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        let mut wide = [0u8; 8];
        wide[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(wide)
    }
}

impl From<u64> for NodeId {
    /// Keeps the low 48 bits.
    fn from(value: u64) -> Self {
        let wide = value.to_be_bytes();
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&wide[2..]);
        Self(bytes)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}.{b:02X}.{c:02X}.{d:02X}.{e:02X}.{g:02X}")
    }
}

impl FromStr for NodeId {
    type Err = ProtocolError;

    /// Accepts dotted hex (`05.01.01.01.03.01`) or 12 plain hex digits with an
    /// optional `0x` prefix.
    fn from_str(text: &str) -> Result<Self> {
        let invalid = || ProtocolError::InvalidNodeId(text.to_string());
        let trimmed = text.trim();

        if trimmed.contains('.') {
            let parts: Vec<&str> = trimmed.split('.').collect();
            if parts.len() != Self::LEN {
                return Err(invalid());
            }
            let mut bytes = [0u8; 6];
            for (slot, part) in bytes.iter_mut().zip(parts) {
                if part.is_empty() || part.len() > 2 {
                    return Err(invalid());
                }
                *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
            }
            return Ok(Self(bytes));
        }

        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != Self::LEN * 2 {
            return Err(invalid());
        }
        let decoded = hex::decode(digits).map_err(|_| invalid())?;
        Self::from_slice(&decoded).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted_and_plain_forms() {
        let expected = NodeId::new([0x05, 0x01, 0x01, 0x01, 0x03, 0x01]);
        assert_eq!("05.01.01.01.03.01".parse::<NodeId>(), Ok(expected));
        assert_eq!("5.1.1.1.3.1".parse::<NodeId>(), Ok(expected));
        assert_eq!("050101010301".parse::<NodeId>(), Ok(expected));
        assert_eq!("0x050101010301".parse::<NodeId>(), Ok(expected));
    }

    #[test]
    fn parse_rejects_bad_text() {
        assert!("05.01.01.01.03".parse::<NodeId>().is_err());
        assert!("05.01.01.01.03.0G".parse::<NodeId>().is_err());
        assert!("05.01.01.01.03.100".parse::<NodeId>().is_err());
        assert!("0501010103".parse::<NodeId>().is_err());
        assert!("".parse::<NodeId>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let id = NodeId::from(0x0201_5700_049C_u64);
        assert_eq!(id.to_string(), "02.01.57.00.04.9C");
        assert_eq!(id.to_string().parse::<NodeId>(), Ok(id));
    }

    #[test]
    fn from_slice_needs_six_bytes() {
        assert_eq!(
            NodeId::from_slice(&[1, 2, 3, 4, 5]),
            Err(ProtocolError::NodeIdTooShort { actual: 5 })
        );

        // Trailing bytes are ignored
        let id = NodeId::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(id.to_bytes(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn u64_conversion_keeps_48_bits() {
        let id = NodeId::from(0xFFFF_0102_0304_0506_u64);
        assert_eq!(id.to_bytes(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(id.as_u64(), 0x0102_0304_0506);
    }
}
