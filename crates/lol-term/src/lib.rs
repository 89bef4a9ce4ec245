// SPDX-License-Identifier: MIT
//
// lol-term — Terminal engine for lol.
//
// Raw termios control with guaranteed restore, a byte-level key decoder
// for VT100 cursor and editing keys, a window-size probe with an
// escape-sequence fallback, and single-write frame output. Everything talks
// to the terminal through one small device trait, so the whole engine runs
// against a scripted device in tests.
//
// This crate intentionally avoids external TUI frameworks in favor of
// direct terminal control via ANSI escape sequences and raw termios.

#[cfg(not(unix))]
compile_error!("lol-term drives a POSIX terminal through termios and needs a Unix target");

pub mod ansi;
pub mod device;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod probe;
pub mod terminal;

pub use error::{Error, Result};
