//! 12-bit node alias.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Mask selecting the alias bits of a CAN header.
pub const ALIAS_MASK: u32 = 0x0000_0FFF;

/// A node alias as carried in the low 12 bits of every OpenLCB CAN header.
///
/// Alias 0 is reserved and never belongs to a real node. [`Alias::new`]
/// rejects it, but [`Alias::from_header`] does not: a misbehaving node can
/// still put 0 on the wire, and [`Alias::is_reserved`] lets the checker
/// report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alias(u16);

impl Alias {
    /// Reserved alias used as the source of the checker's own AME queries.
    pub const QUERY: Self = Self(0x001);

    /// Largest alias value.
    pub const MAX: u16 = 0xFFF;

    /// Create a checked alias (1..=0xFFF).
    pub fn new(raw: u16) -> Result<Self> {
        if raw == 0 || raw > Self::MAX {
            return Err(ProtocolError::InvalidAlias(raw));
        }
        Ok(Self(raw))
    }

    /// Alias carried in the low 12 bits of `header`.
    #[must_use]
    pub const fn from_header(header: u32) -> Self {
        Self((header & ALIAS_MASK) as u16)
    }

    /// Raw 12-bit value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// True for the reserved "no alias" value.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05X}", self.0)
    }
}
