// SPDX-License-Identifier: MIT
//
// Key decoder.
//
// Turns the raw byte stream from the terminal into one logical key at a
// time. Ordinary bytes pass straight through as `Key::Char`; an ESC byte
// starts a short lookahead that recognizes the cursor and editing keys
// VT100-style terminals send:
//
//   ESC [ A/B/C/D        arrows
//   ESC [ H / ESC [ F    Home / End
//   ESC O H / ESC O F    Home / End (SS3 form)
//   ESC [ 1..8 ~         Home, Delete, End, PageUp, PageDown
//
// # Escape vs escape-sequence ambiguity
//
// A bare ESC byte could be the Escape key or the start of a sequence. Raw
// mode sets a read timeout, so after ESC we read at most three more bytes
// and give up on the first read that comes back empty: a truncated or
// unknown sequence is simply `Key::Escape`. The lookahead never reads past
// the longest sequence we recognize.
//
// The byte-to-key mapping (`decode_escape`) is pure; `read_key` only feeds
// it bytes until it answers.

use crate::device::TerminalDevice;
use crate::error::{Error, Result};

/// The escape-introducer byte.
const ESC: u8 = 0x1b;

/// Longest sequence body after ESC that we recognize (`[ 5 ~`).
const MAX_SEQUENCE: usize = 3;

// ─── Key ────────────────────────────────────────────────────────────────────

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A literal byte: printable character or control code.
    Char(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    /// A lone Escape press, or a sequence we could not decode.
    Escape,
}

impl Key {
    /// The control-key code for `c` (`Ctrl-Q` is `Key::ctrl(b'q')`).
    #[inline]
    #[must_use]
    pub const fn ctrl(c: u8) -> Self {
        Self::Char(c & 0x1f)
    }
}

// ─── Decoding ───────────────────────────────────────────────────────────────

/// Outcome of looking at the bytes after an ESC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// The bytes so far resolve to this key.
    Key(Key),
    /// A longer sequence is still possible; read another byte.
    NeedMore,
}

/// Map the bytes that followed an ESC to a key.
///
/// `seq` excludes the ESC itself. Returns [`Decoded::NeedMore`] only for
/// prefixes of a recognized sequence, so at most [`MAX_SEQUENCE`] bytes are
/// ever requested.
#[must_use]
pub const fn decode_escape(seq: &[u8]) -> Decoded {
    let key = match *seq {
        [] | [_] | [b'[', b'0'..=b'9'] => return Decoded::NeedMore,
        [b'[', digit, b'~'] => match digit {
            b'1' | b'7' => Key::Home,
            b'3' => Key::Delete,
            b'4' | b'8' => Key::End,
            b'5' => Key::PageUp,
            b'6' => Key::PageDown,
            _ => Key::Escape,
        },
        [b'[', letter] => match letter {
            b'A' => Key::ArrowUp,
            b'B' => Key::ArrowDown,
            b'C' => Key::ArrowRight,
            b'D' => Key::ArrowLeft,
            b'H' => Key::Home,
            b'F' => Key::End,
            _ => Key::Escape,
        },
        [b'O', b'H'] => Key::Home,
        [b'O', b'F'] => Key::End,
        _ => Key::Escape,
    };
    Decoded::Key(key)
}

/// Block until one key has been decoded.
///
/// Read timeouts before the first byte are retried silently. Inside an
/// escape sequence, a read that produces no byte ends the sequence as
/// [`Key::Escape`]; a hard error there is left for the next call to hit.
///
/// # Errors
///
/// [`Error::Read`] if reading the first byte fails.
pub fn read_key(device: &mut impl TerminalDevice) -> Result<Key> {
    let byte = loop {
        match device.read_byte() {
            Ok(Some(b)) => break b,
            Ok(None) => {}
            Err(e) => return Err(Error::Read(e)),
        }
    };

    let key = if byte == ESC {
        read_escape(device)
    } else {
        Key::Char(byte)
    };

    tracing::trace!(?key, "key decoded");
    Ok(key)
}

/// Read the rest of an escape sequence, one byte at a time.
fn read_escape(device: &mut impl TerminalDevice) -> Key {
    let mut seq = [0u8; MAX_SEQUENCE];
    let mut len = 0;

    while len < MAX_SEQUENCE {
        match device.read_byte() {
            Ok(Some(b)) => {
                seq[len] = b;
                len += 1;
            }
            Ok(None) | Err(_) => return Key::Escape,
        }
        match decode_escape(&seq[..len]) {
            Decoded::Key(Key::Escape) => {
                tracing::debug!(seq = ?&seq[..len], "unrecognized escape sequence");
                return Key::Escape;
            }
            Decoded::Key(key) => return key,
            Decoded::NeedMore => {}
        }
    }

    Key::Escape
}

// ─── Tests ───────────────────────────────────────────────────────────────────
