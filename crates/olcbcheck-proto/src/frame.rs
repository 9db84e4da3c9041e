//! CAN frame model with alias-negotiation classification.
//!
//! # Header layout
//!
//! ```text
//!  28   27 ........ 24 23 ........ 12 11 ......... 0
//! ┌───┬──────────────┬───────────────┬──────────────┐
//! │ 1 │ frame type / │  variable     │ source alias │
//! │   │ CID sequence │  field        │              │
//! └───┴──────────────┴───────────────┴──────────────┘
//! ```
//!
//! Control frames (RID/AMD/AME/AMR) put `0x0700..=0x0703` in bits 12..27.
//! CID frames put the sequence number 7..4 in bits 24..26 and a 12-bit slice
//! of the sender's node ID in bits 12..23.

use std::fmt;

use crate::{
    alias::Alias,
    errors::{ProtocolError, Result},
    node_id::NodeId,
};

/// Bit 28: set on every OpenLCB frame (as opposed to other CAN traffic).
const OPENLCB_BIT: u32 = 0x1000_0000;

/// Mask selecting frame type + variable field (everything but the alias).
const CONTROL_MASK: u32 = 0xFFFF_F000;

/// Mask selecting the top byte, which identifies CID7.
const CID7_MASK: u32 = 0xFF00_0000;

const RID_PATTERN: u32 = 0x1070_0000;
const AMD_PATTERN: u32 = 0x1070_1000;
const AME_PATTERN: u32 = 0x1070_2000;
const AMR_PATTERN: u32 = 0x1070_3000;
const CID7_PATTERN: u32 = 0x1700_0000;

/// Alias-management control codes, as placed in header bits 12..27.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ControlFrame {
    /// Reserve ID: alias reservation confirmed
    Rid = 0x0700,
    /// Alias Map Definition: alias bound to a node ID
    Amd = 0x0701,
    /// Alias Map Enquiry: ask nodes to report their mappings
    Ame = 0x0702,
    /// Alias Map Reset: alias relinquished
    Amr = 0x0703,
}

impl ControlFrame {
    /// Raw control code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Coarse classification of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Check ID, any sequence number
    Cid,
    /// Reserve ID
    Rid,
    /// Alias Map Definition
    Amd,
    /// Alias Map Enquiry
    Ame,
    /// Alias Map Reset
    Amr,
    /// Anything else (OpenLCB messages, other control frames)
    Other,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cid => "CID",
            Self::Rid => "RID",
            Self::Amd => "AMD",
            Self::Ame => "AME",
            Self::Amr => "AMR",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// One CAN frame: 29-bit extended header and up to 8 data bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanFrame {
    header: u32,
    data: Vec<u8>,
}

impl CanFrame {
    /// Largest valid extended header.
    pub const MAX_HEADER: u32 = 0x1FFF_FFFF;

    /// Maximum data length of a classic CAN frame.
    pub const MAX_DATA: usize = 8;

    /// Create a frame from a raw header and payload.
    pub fn new(header: u32, data: &[u8]) -> Result<Self> {
        if header > Self::MAX_HEADER {
            return Err(ProtocolError::HeaderOutOfRange(header));
        }
        if data.len() > Self::MAX_DATA {
            return Err(ProtocolError::DataTooLong { len: data.len() });
        }
        Ok(Self { header, data: data.to_vec() })
    }

    /// Build a control frame sent from `alias`.
    pub fn control(kind: ControlFrame, alias: Alias, data: &[u8]) -> Result<Self> {
        Self::new(OPENLCB_BIT | (kind.code() << 12) | u32::from(alias.get()), data)
    }

    /// AMD frame binding `alias` to `node_id`.
    #[must_use]
    pub fn amd(alias: Alias, node_id: NodeId) -> Self {
        Self::control_unchecked(ControlFrame::Amd, alias, &node_id.to_bytes())
    }

    /// AMR frame releasing `alias` held by `node_id`.
    #[must_use]
    pub fn amr(alias: Alias, node_id: NodeId) -> Self {
        Self::control_unchecked(ControlFrame::Amr, alias, &node_id.to_bytes())
    }

    /// Global AME frame (no node ID filter) sent from `alias`.
    #[must_use]
    pub fn ame(alias: Alias) -> Self {
        Self::control_unchecked(ControlFrame::Ame, alias, &[])
    }

    /// RID frame from `alias`.
    #[must_use]
    pub fn rid(alias: Alias) -> Self {
        Self::control_unchecked(ControlFrame::Rid, alias, &[])
    }

    /// Build a CID frame with sequence number `sequence` (7 down to 4).
    ///
    /// Each sequence number carries a different 12-bit slice of the node ID:
    /// CID7 the most significant, CID4 the least.
    pub fn check_id(sequence: u8, node_id: NodeId, alias: Alias) -> Result<Self> {
        if !(4..=7).contains(&sequence) {
            return Err(ProtocolError::InvalidCidSequence(sequence));
        }
        Ok(Self::check_id_unchecked(sequence, node_id, alias))
    }

    /// CID7 frame, the opening probe of an alias reservation.
    #[must_use]
    pub fn cid7(node_id: NodeId, alias: Alias) -> Self {
        Self::check_id_unchecked(7, node_id, alias)
    }

    fn check_id_unchecked(sequence: u8, node_id: NodeId, alias: Alias) -> Self {
        let shift = u32::from(sequence - 4) * 12;
        let fragment = ((node_id.as_u64() >> shift) & 0xFFF) as u32;
        let header =
            OPENLCB_BIT | (u32::from(sequence) << 24) | (fragment << 12) | u32::from(alias.get());
        Self { header, data: Vec::new() }
    }

    // Header and payload come from typed values, so range checks cannot fail.
    fn control_unchecked(kind: ControlFrame, alias: Alias, data: &[u8]) -> Self {
        let header = OPENLCB_BIT | (kind.code() << 12) | u32::from(alias.get());
        Self { header, data: data.to_vec() }
    }

    /// Raw header.
    #[must_use]
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Source alias (low 12 bits of the header).
    #[must_use]
    pub fn alias(&self) -> Alias {
        Alias::from_header(self.header)
    }

    /// Node ID carried in the first 6 data bytes, if present.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        NodeId::from_slice(&self.data).ok()
    }

    /// Alias Map Definition.
    #[must_use]
    pub fn is_amd(&self) -> bool {
        self.header & CONTROL_MASK == AMD_PATTERN
    }

    /// Reserve ID.
    #[must_use]
    pub fn is_rid(&self) -> bool {
        self.header & CONTROL_MASK == RID_PATTERN
    }

    /// Alias Map Reset.
    #[must_use]
    pub fn is_amr(&self) -> bool {
        self.header & CONTROL_MASK == AMR_PATTERN
    }

    /// Alias Map Enquiry.
    #[must_use]
    pub fn is_ame(&self) -> bool {
        self.header & CONTROL_MASK == AME_PATTERN
    }

    /// CID7, the first frame of an alias reservation.
    #[must_use]
    pub fn is_cid(&self) -> bool {
        self.header & CID7_MASK == CID7_PATTERN
    }

    /// Any CID frame, sequence 7 down to 4.
    #[must_use]
    pub fn is_check_id(&self) -> bool {
        self.cid_sequence().is_some()
    }

    /// Sequence number of a CID frame.
    #[must_use]
    pub fn cid_sequence(&self) -> Option<u8> {
        if self.header & OPENLCB_BIT == 0 {
            return None;
        }
        let sequence = ((self.header >> 24) & 0x0F) as u8;
        (4..=7).contains(&sequence).then_some(sequence)
    }

    /// Classify the frame by header alone.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        if self.is_check_id() {
            FrameKind::Cid
        } else if self.is_rid() {
            FrameKind::Rid
        } else if self.is_amd() {
            FrameKind::Amd
        } else if self.is_ame() {
            FrameKind::Ame
        } else if self.is_amr() {
            FrameKind::Amr
        } else {
            FrameKind::Other
        }
    }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CanFrame({:#010X} [{}] {})",
            self.header,
            hex::encode_upper(&self.data),
            self.kind()
        )
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:08X} [{}]", self.kind(), self.header, hex::encode_upper(&self.data))
    }
}
