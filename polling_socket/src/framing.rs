use bytes::Bytes;
use serde_json::Value;

use crate::{buffer::RingBuffer, constants::FRAME_TERMINATOR, error::ClientError};

/// Splits terminator-delimited frames out of a receive buffer.
///
/// A frame is a run of bytes up to and including one terminator byte. The
/// extractor never yields a partial frame: while no terminator is present in
/// the buffer, the bytes stay put until more data arrives.
#[derive(Debug, Clone, Copy)]
pub struct FrameExtractor {
    terminator: u8,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::with_terminator(FRAME_TERMINATOR)
    }

    pub fn with_terminator(terminator: u8) -> Self {
        Self { terminator }
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Extract the next complete frame, terminator included, consuming it
    /// from the buffer.
    pub fn next_frame(&self, buf: &mut RingBuffer) -> Option<Bytes> {
        let end = buf.find(self.terminator)?;
        let mut frame = vec![0u8; end + 1];
        let copied = buf.peek(&mut frame);
        debug_assert_eq!(copied, frame.len());
        buf.consume_prefix(frame.len());
        Some(Bytes::from(frame))
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one extracted frame as a JSON document.
///
/// The trailing terminator byte is stripped before parsing.
pub fn decode_document(frame: &[u8]) -> Result<Value, ClientError> {
    let text = frame.strip_suffix(&[FRAME_TERMINATOR]).unwrap_or(frame);
    Ok(serde_json::from_slice(text)?)
}
