//! # lol-editor — Editor core for lol
//!
//! The parts of the editor that sit above the terminal engine:
//!
//! - **[`cursor`]** — `Cursor` (x, y), moved by keys and clamped to the screen
//! - **[`view`]** — the screen rows of a frame: `~` markers and the banner
//! - **[`options`]** — validated run-time options
//!
//! Rendering, key decoding, and raw-mode handling live in `lol-term`.

pub mod cursor;
pub mod options;
pub mod view;
