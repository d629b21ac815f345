//! Incremental segmentation of a streamed reply into speakable chunks.

/// Token texts that close a speakable segment.
pub const SEGMENT_TERMINATORS: [&str; 3] = [".", "?", "!"];

/// Accumulates streamed tokens and decides when a chunk is ready for speech.
///
/// A flush happens only when a token is *exactly* one of the terminator
/// strings; punctuation embedded in a longer token (`"great!"`) does not
/// count. With tokenizers that never emit bare punctuation the whole reply is
/// spoken in one piece at stream end.
#[derive(Debug, Default)]
pub struct SegmentBuffer {
    pending: String,
}

impl SegmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one token. Returns the finished segment when the token closes
    /// it, clearing the buffer so no text is ever spoken twice.
    pub fn push(&mut self, token: &str) -> Option<String> {
        self.pending.push_str(token);
        if SEGMENT_TERMINATORS.contains(&token) {
            return Some(std::mem::take(&mut self.pending));
        }
        None
    }

    /// Final flush at stream end; `None` when nothing is pending.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}
