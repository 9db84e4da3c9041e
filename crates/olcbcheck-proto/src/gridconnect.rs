//! GridConnect ASCII framing.
//!
//! OpenLCB TCP hubs exchange CAN frames as text, one frame per
//! `:X<header>N<data>;` token:
//!
//! ```text
//! :X10701123N050101010301;
//!  │└──────┘│└──────────┘
//!  │ header │ data, two hex digits per byte
//!  extended  normal (non-RTR) frame
//! ```
//!
//! Hubs separate frames with newlines, but nothing requires it, and a TCP read
//! may end in the middle of a frame. [`GridConnectDecoder`] buffers partial
//! input and skips anything outside `:` ... `;`.

use bytes::{Buf, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    frame::CanFrame,
};

/// Longest valid token: `:X` + 8 header digits + `N` + 16 data digits + `;`.
const MAX_TOKEN: usize = 28;

/// Encode one frame, including the trailing newline hubs expect.
#[must_use]
pub fn encode(frame: &CanFrame) -> String {
    format!(":X{:08X}N{};\n", frame.header(), hex::encode_upper(frame.data()))
}

/// Parse one complete token such as `:X10701123N050101010301;`.
pub fn parse(token: &str) -> Result<CanFrame> {
    let malformed = || ProtocolError::MalformedGridConnect(token.to_string());

    let body = token
        .trim()
        .strip_prefix(':')
        .and_then(|rest| rest.strip_suffix(';'))
        .ok_or_else(malformed)?;
    let body = body.strip_prefix('X').or_else(|| body.strip_prefix('x')).ok_or_else(malformed)?;
    let (header_text, data_text) =
        body.split_once('N').or_else(|| body.split_once('n')).ok_or_else(malformed)?;

    if header_text.is_empty()
        || header_text.len() > 8
        || !header_text.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(malformed());
    }
    let header = u32::from_str_radix(header_text, 16).map_err(|_| malformed())?;
    let data = hex::decode(data_text).map_err(|_| malformed())?;

    CanFrame::new(header, &data).map_err(|_| malformed())
}

/// Incremental decoder for a GridConnect byte stream.
#[derive(Debug, Default)]
pub struct GridConnectDecoder {
    buffer: BytesMut,
}

impl GridConnectDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Next decoded frame.
    ///
    /// Returns `Ok(None)` when the buffer holds no complete token. A malformed
    /// token is consumed and reported, so the caller can log it and keep
    /// decoding.
    pub fn next_frame(&mut self) -> Result<Option<CanFrame>> {
        // Drop noise in front of the next token
        match self.buffer.iter().position(|&b| b == b':') {
            Some(start) => self.buffer.advance(start),
            None => {
                self.buffer.clear();
                return Ok(None);
            },
        }

        let Some(end) = self.buffer.iter().position(|&b| b == b';') else {
            if self.buffer.len() > MAX_TOKEN {
                let junk = self.buffer.split_to(self.buffer.len());
                return Err(ProtocolError::MalformedGridConnect(
                    String::from_utf8_lossy(&junk).into_owned(),
                ));
            }
            return Ok(None);
        };

        let token = self.buffer.split_to(end + 1);
        let text = std::str::from_utf8(&token).map_err(|_| {
            ProtocolError::MalformedGridConnect(String::from_utf8_lossy(&token).into_owned())
        })?;
        parse(text).map(Some)
    }
}
