// SPDX-License-Identifier: MIT
//
// Output buffering.
//
// `OutputBuffer` accumulates all ANSI bytes of a frame in memory so the
// entire frame reaches the terminal in a single write. Emitting escapes and
// row text piecemeal lets the terminal paint half a frame, which shows up
// as flicker and a cursor jumping around the screen; one write per frame
// avoids both.

use std::io::{self, Write};

use crate::device::TerminalDevice;

/// A byte buffer that accumulates ANSI output for a single write.
///
/// Default capacity: 4 KB, enough for a full frame of tilde rows on a
/// large terminal without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 4096;

impl OutputBuffer {
    /// Create an empty buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append raw bytes.
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `n` copies of `byte`.
    #[inline]
    pub fn push_repeated(&mut self, byte: u8, n: usize) {
        self.buf.resize(self.buf.len() + n, byte);
    }

    /// Write accumulated output to the device in one call and clear the
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the device write fails.
    pub fn flush_to(&mut self, device: &mut impl TerminalDevice) -> io::Result<()> {
        if !self.buf.is_empty() {
            device.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing via flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
