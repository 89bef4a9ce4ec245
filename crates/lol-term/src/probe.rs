// SPDX-License-Identifier: MIT
//
// Window dimension probe.
//
// Two strategies, tried in order:
//
//   1. Kernel query (`ioctl(TIOCGWINSZ)`). Cheap and exact, but some
//      terminals and serial lines answer with zero columns or not at all.
//
//   2. Cursor report. Push the cursor into the bottom-right corner with
//      `ESC[999C ESC[999B` (both clamp at the screen edge), ask where it
//      ended up with `ESC[6n`, and parse the `ESC [ rows ; cols R` reply.
//      Needs raw mode: the reply arrives on the input stream and must not
//      be echoed or line-buffered.

use crate::ansi;
use crate::device::TerminalDevice;
use crate::error::{Error, Result};
use crate::output::OutputBuffer;
use crate::terminal::Size;

/// Capacity of the cursor-report reply buffer, terminator excluded.
const REPLY_CAPACITY: usize = 31;

/// Determine the terminal's size in character cells.
///
/// # Errors
///
/// [`Error::Probe`] if the kernel query fails or reports zero columns and
/// the cursor-report fallback cannot be written, read, or parsed.
pub fn window_size(device: &mut impl TerminalDevice) -> Result<Size> {
    match device.window_size() {
        Ok(size) if size.is_usable() => {
            tracing::debug!(rows = size.rows, cols = size.cols, "window size from kernel");
            return Ok(size);
        }
        Ok(size) => {
            tracing::debug!(rows = size.rows, cols = size.cols, "kernel size unusable, asking the terminal");
        }
        Err(e) => {
            tracing::debug!(error = %e, "window size query failed, asking the terminal");
        }
    }

    let size = cursor_report_size(device)?;
    tracing::debug!(rows = size.rows, cols = size.cols, "window size from cursor report");
    Ok(size)
}

/// Fallback: measure the screen by where a clamped cursor move lands.
fn cursor_report_size(device: &mut impl TerminalDevice) -> Result<Size> {
    let mut out = OutputBuffer::new();
    ansi::cursor_to_bottom_right(&mut out).map_err(Error::Probe)?;
    ansi::request_cursor_position(&mut out).map_err(Error::Probe)?;
    out.flush_to(device).map_err(Error::Probe)?;

    let reply = read_cursor_report(device)?;
    parse_cursor_report(&reply).ok_or_else(|| Error::probe("malformed cursor position report"))
}

/// Collect the reply up to (not including) the terminating `R`.
///
/// Stops early on a read timeout or once the buffer is full; whatever was
/// collected is handed to the parser, which rejects partial replies.
fn read_cursor_report(device: &mut impl TerminalDevice) -> Result<Vec<u8>> {
    let mut reply = Vec::with_capacity(REPLY_CAPACITY);
    while reply.len() < REPLY_CAPACITY {
        match device.read_byte() {
            Ok(Some(b'R') | None) => break,
            Ok(Some(b)) => reply.push(b),
            Err(e) => return Err(Error::Probe(e)),
        }
    }
    Ok(reply)
}

/// Parse a cursor position report body: `ESC [ rows ; cols`.
///
/// The trailing `R` must already be stripped. Both numbers must be plain
/// decimal and at least one.
#[must_use]
pub fn parse_cursor_report(reply: &[u8]) -> Option<Size> {
    let body = reply.strip_prefix(b"\x1b[")?;
    let body = std::str::from_utf8(body).ok()?;
    let (rows, cols) = body.split_once(';')?;
    let rows = parse_dimension(rows)?;
    let cols = parse_dimension(cols)?;
    Some(Size::new(rows, cols))
}

fn parse_dimension(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>().ok().filter(|&n| n > 0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
