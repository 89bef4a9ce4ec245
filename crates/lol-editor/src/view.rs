//! View — the screen rows of a frame.
//!
//! With no document loaded, every row is an empty-line marker (`~`), except
//! the welcome banner a third of the way down and a one-line hint just
//! below it. Both are centered on the screen:
//!
//! ```text
//! ~
//! ~
//! ~       LOL Improved -- version : 0.0.1
//! ~            press Ctrl-Q to quit
//! ~
//! ```
//!
//! Rows are cleared to end-of-line after drawing and separated by `\r\n`
//! (raw mode turns off output post-processing, so a bare `\n` would not
//! return the carriage). There is no separator after the last row: that
//! would scroll the screen up by one.
//!
//! Widths are in bytes. The banner and hint are ASCII, so a byte is a cell.

use lol_term::output::OutputBuffer;
use lol_term::terminal::Size;

/// The welcome banner.
pub const BANNER: &str = concat!("LOL Improved -- version : ", env!("CARGO_PKG_VERSION"));

/// The line under the banner. Names the quit key, the one command the
/// editor has.
pub const HINT: &str = "press Ctrl-Q to quit";

/// Row the banner is drawn on.
#[inline]
#[must_use]
pub const fn banner_row(size: Size) -> u16 {
    size.rows / 3
}

/// Append every screen row to `out`.
pub fn draw_rows(out: &mut OutputBuffer, size: Size) {
    let banner = banner_row(size);
    for y in 0..size.rows {
        if y == banner {
            centered_line(out, BANNER.as_bytes(), size.cols);
        } else if y == banner + 1 {
            centered_line(out, HINT.as_bytes(), size.cols);
        } else {
            out.push_bytes(b"~");
        }

        out.push_bytes(b"\x1b[K");
        if y + 1 < size.rows {
            out.push_bytes(b"\r\n");
        }
    }
}

/// Append `text` centered in `cols` columns.
///
/// The text is cut to `cols` bytes. The left padding is
/// `(cols - len) / 2`; when it is non-zero, its first column carries the
/// row's `~` marker and the rest are spaces.
pub fn centered_line(out: &mut OutputBuffer, text: &[u8], cols: u16) {
    let cols = usize::from(cols);
    let text = &text[..text.len().min(cols)];
    let padding = (cols - text.len()) / 2;
    if padding > 0 {
        out.push_bytes(b"~");
        out.push_repeated(b' ', padding - 1);
    }
    out.push_bytes(text);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
