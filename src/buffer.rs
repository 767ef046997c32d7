//! Double buffer backing the connection read loop.
//!
//! The region is `2 * half` bytes long. Reads always target the `half`-byte
//! window starting at the cursor, so a read can never run past the end of the
//! allocation while the cursor stays within the first half. Once the cursor
//! reaches `half` it is recycled to zero and the region is reused.

/// Fixed-size read buffer split into two equal halves.
#[derive(Debug)]
pub struct DoubleBuffer {
    buf: Box<[u8]>,
    half: usize,
    offset: usize,
}

impl DoubleBuffer {
    /// Allocate a buffer whose halves each hold `half` bytes.
    ///
    /// `half` is clamped to at least one byte.
    #[must_use]
    pub fn new(half: usize) -> Self {
        let half = half.max(1);
        Self {
            buf: vec![0; half * 2].into_boxed_slice(),
            half,
            offset: 0,
        }
    }

    /// Capacity of one half in bytes.
    #[must_use]
    pub fn half_size(&self) -> usize { self.half }

    /// Current cursor position.
    #[must_use]
    pub fn offset(&self) -> usize { self.offset }

    /// Writable window `[offset, offset + half)` for the next read.
    pub fn read_window(&mut self) -> &mut [u8] {
        let start = self.offset;
        &mut self.buf[start..start + self.half]
    }

    /// Bytes `[offset, offset + avail)` that a read placed in the window.
    ///
    /// `avail` is clamped to the window length.
    #[must_use]
    pub fn pending(&self, avail: usize) -> &[u8] {
        let start = self.offset;
        let end = (start + avail.min(self.half)).min(self.buf.len());
        &self.buf[start..end]
    }

    /// Move the cursor past `n` bytes handed to the decoder.
    ///
    /// The cursor never moves beyond the end of the region.
    pub fn advance(&mut self, n: usize) { self.offset = (self.offset + n).min(self.buf.len()); }

    /// Reset the cursor to zero once it has reached the end of the first half.
    ///
    /// Returns `true` when the cursor was recycled.
    pub fn recycle(&mut self) -> bool {
        if self.offset >= self.half {
            self.offset = 0;
            true
        } else {
            false
        }
    }
}
