//! Error types for the OpenLCB wire model.
//!
//! All errors are structured and testable; none of them carry I/O state.

use thiserror::Error;

/// Errors raised while building or parsing frames and identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Frame construction
    /// Header does not fit in a 29-bit extended CAN identifier
    #[error("header {0:#010x} exceeds the 29-bit extended identifier range")]
    HeaderOutOfRange(u32),

    /// CAN frames carry at most 8 data bytes
    #[error("frame data too long: {len} bytes exceeds maximum 8")]
    DataTooLong {
        /// Actual data length
        len: usize,
    },

    /// CID sequence numbers run from 4 to 7
    #[error("invalid CID sequence number: {0}")]
    InvalidCidSequence(u8),

    // Identifiers
    /// Alias is zero (reserved) or wider than 12 bits
    #[error("invalid alias: {0:#x}")]
    InvalidAlias(u16),

    /// Fewer than 6 bytes available for a node ID
    #[error("node ID too short: expected 6 bytes, got {actual}")]
    NodeIdTooShort {
        /// Bytes available
        actual: usize,
    },

    /// Node ID text could not be parsed
    #[error("invalid node ID text: {0:?}")]
    InvalidNodeId(String),

    // GridConnect
    /// A `:X...N...;` frame that does not follow the GridConnect grammar
    #[error("malformed GridConnect frame: {0:?}")]
    MalformedGridConnect(String),
}

/// Convenient Result type alias for wire operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
