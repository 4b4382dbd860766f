//! Line assembly for byte-oriented links.

/// Longest line kept before the buffer gives up waiting for a terminator.
pub const DEFAULT_MAX_LINE: usize = 512;

/// Accumulates raw chunks and hands out complete `\n`-terminated lines.
///
/// A run of bytes longer than `max_len` without a terminator is released as
/// one oversized line so the caller can reject it instead of buffering forever.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_len.min(4096)),
            max_len: max_len.max(1),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Pop the next complete line, terminator included.
    pub fn pop_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(pos + 1);
            return Some(std::mem::replace(&mut self.pending, rest));
        }
        if self.pending.len() >= self.max_len {
            let rest = self.pending.split_off(self.max_len);
            return Some(std::mem::replace(&mut self.pending, rest));
        }
        None
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
