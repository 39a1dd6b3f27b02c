//! Output buffer with tail-only prompt search.
//!
//! Device prompts only ever appear at the end of the output, so only the
//! last `search_depth` bytes are scanned. For large tables (a full MAC
//! table on a stacked switch) this keeps prompt detection cheap.

use bytes::BytesMut;
use memchr::memrchr;
use regex::bytes::Regex;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Longest escape sequence held back waiting for its terminator.
const MAX_PENDING_ESCAPE: usize = 64;

/// Accumulates ANSI-stripped shell output until a prompt is seen.
#[derive(Debug)]
pub struct PromptBuffer {
    buffer: BytesMut,
    /// Unterminated escape sequence from the end of the last chunk.
    pending: Vec<u8>,
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a buffer that searches the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            pending: Vec::new(),
            search_depth,
        }
    }

    /// Append raw channel data, stripping ANSI escape sequences.
    ///
    /// A sequence cut off at the end of `data` is held until the next chunk
    /// completes it.
    pub fn extend(&mut self, data: &[u8]) {
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.extend_from_slice(data);

        if let Some(start) = unterminated_escape(&chunk) {
            self.pending = chunk.split_off(start);
        }
        let cleaned = strip_ansi_escapes::strip(&chunk);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Absolute end offset of the first match of `pattern` in the tail.
    pub fn find_in_tail(&self, pattern: &Regex) -> Option<usize> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern
            .find(&self.buffer[start..])
            .map(|m| start + m.end())
    }

    /// Remove and return everything up to `end`, keeping the rest buffered.
    pub fn split_through(&mut self, end: usize) -> Vec<u8> {
        self.buffer.split_to(end.min(self.buffer.len())).to_vec()
    }

    /// Drop all buffered data.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Offset of a trailing escape sequence that has not been terminated yet.
fn unterminated_escape(data: &[u8]) -> Option<usize> {
    let start = memrchr(ESC, data)?;
    let tail = &data[start + 1..];
    if tail.len() >= MAX_PENDING_ESCAPE {
        return None;
    }
    let complete = match tail.split_first() {
        None => false,
        // CSI ends with a byte in 0x40..=0x7e.
        Some((b'[', params)) => params.iter().any(|b| (0x40..=0x7e).contains(b)),
        // OSC ends with BEL, or with `ESC \` which is a later escape.
        Some((b']', body)) => body.contains(&BEL),
        Some(_) => true,
    };
    (!complete).then_some(start)
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
