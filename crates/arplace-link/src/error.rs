//! Error types for the optimizer link

use thiserror::Error;

/// Errors raised while framing, decoding or transporting optimizer messages
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated payload: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("{0} unexpected trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("frame does not start with the header marker (got {0:#04x})")]
    BadMarker(u8),

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("identifier is not valid UTF-8")]
    InvalidId,

    #[error("negative count or length {0}")]
    NegativeCount(i32),

    #[error("frame length {0} exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("connection closed")]
    Closed,
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
