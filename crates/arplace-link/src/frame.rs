//! Length-prefixed framing
//!
//! Every frame on the stream is `[HEADER][u32 LE length][payload]`, where the
//! payload's first byte is the message tag.

use crate::error::{LinkError, Result};
use crate::protocol::MessageTag;

/// Bytes preceding the payload: marker plus length
pub const FRAME_PREFIX_LEN: usize = 1 + 4;

/// Upper bound on a single payload
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Wrap a payload in a frame
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_PREFIX_LEN + payload.len());
    frame.push(MessageTag::Header as u8);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Accumulates stream reads and yields complete payloads.
///
/// Reads may split a frame anywhere; bytes are kept until the frame is whole.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete payload, `Ok(None)` if more bytes are needed.
    ///
    /// A bad marker or oversized length is fatal: the stream position is lost.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(&marker) = self.buf.first() else {
            return Ok(None);
        };
        if marker != MessageTag::Header as u8 {
            return Err(LinkError::BadMarker(marker));
        }
        if self.buf.len() < FRAME_PREFIX_LEN {
            return Ok(None);
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.buf[1..FRAME_PREFIX_LEN]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_LEN {
            return Err(LinkError::FrameTooLarge(len));
        }

        let end = FRAME_PREFIX_LEN + len;
        if self.buf.len() < end {
            return Ok(None);
        }

        let payload = self.buf[FRAME_PREFIX_LEN..end].to_vec();
        self.buf.drain(..end);
        Ok(Some(payload))
    }
}
