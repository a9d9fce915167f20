// Protocol-level error type.
//
// Splits failures into the two cases callers must handle differently: a
// transport failure (`Io`), after which the stream is unusable, and a payload
// that was framed correctly but did not decode (`Decode`), after which the
// stream is still aligned on a frame boundary and reading can continue.
// `Encode` and `TooLarge` are raised before anything is written, so they say
// nothing about the health of the stream either.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("message too large: {len} bytes (max {max})", max = crate::MAX_MESSAGE_SIZE)]
    TooLarge { len: usize },
}

impl ProtocolError {
    /// True if the stream can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::Decode(_))
    }

    /// True if the underlying stream failed. Only these errors justify
    /// dropping the peer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}
