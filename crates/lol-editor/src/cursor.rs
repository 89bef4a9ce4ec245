//! Cursor — the on-screen position and its viewport-bounded movement.
//!
//! There is no document behind the screen yet, so the cursor moves over the
//! visible cells only. Every movement clamps at the viewport edges: the
//! cursor can never leave `0..cols` × `0..rows`, and there is nothing to
//! scroll into.
//!
//! All coordinates are **0-indexed**. The conversion to the terminal's
//! 1-indexed CUP coordinates happens in `lol_term::ansi`.

use lol_term::input::Key;
use lol_term::terminal::Size;

/// The cursor's cell on screen.
///
/// Lightweight value type. Does not own the screen size; the size is passed
/// to movement methods as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    x: u16,
    y: u16,
}

impl Cursor {
    /// A cursor in the top-left cell.
    #[must_use]
    pub const fn new() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Column, 0-indexed.
    #[inline]
    #[must_use]
    pub const fn x(self) -> u16 {
        self.x
    }

    /// Row, 0-indexed.
    #[inline]
    #[must_use]
    pub const fn y(self) -> u16 {
        self.y
    }

    /// `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn position(self) -> (u16, u16) {
        (self.x, self.y)
    }

    /// Apply a movement key within a screen of `size`.
    ///
    /// - Arrows move one cell, stopping at the edges.
    /// - `PageUp` / `PageDown` repeat the single-row move `rows` times.
    /// - `Home` jumps to column 0, `End` to the last column.
    ///
    /// Any other key leaves the cursor where it is.
    pub fn move_cursor(&mut self, key: Key, size: Size) {
        match key {
            Key::ArrowLeft | Key::ArrowRight | Key::ArrowUp | Key::ArrowDown => {
                self.step(key, size);
            }
            Key::PageUp | Key::PageDown => {
                let dir = if key == Key::PageUp {
                    Key::ArrowUp
                } else {
                    Key::ArrowDown
                };
                for _ in 0..size.rows {
                    self.step(dir, size);
                }
            }
            Key::Home => self.x = 0,
            Key::End => self.x = size.cols.saturating_sub(1),
            _ => return,
        }
        tracing::trace!(?key, x = self.x, y = self.y, "cursor moved");
    }

    /// Pull the cursor back inside a (possibly smaller) screen.
    pub fn clamp_to(&mut self, size: Size) {
        self.x = self.x.min(size.cols.saturating_sub(1));
        self.y = self.y.min(size.rows.saturating_sub(1));
    }

    fn step(&mut self, key: Key, size: Size) {
        match key {
            Key::ArrowLeft => self.x = self.x.saturating_sub(1),
            Key::ArrowRight if self.x + 1 < size.cols => self.x += 1,
            Key::ArrowUp => self.y = self.y.saturating_sub(1),
            Key::ArrowDown if self.y + 1 < size.rows => self.y += 1,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
