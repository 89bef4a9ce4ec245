// SPDX-License-Identifier: MIT
//
// Error kinds for terminal control.
//
// Every variant is fatal to the session: the caller clears the screen,
// restores the original terminal attributes, reports the error once, and
// exits. A read that times out with no byte is not an error: the device
// reports it as `Ok(None)` and the key decoder loops.

use std::io;

/// A fatal terminal-control failure, carrying the underlying OS error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The current terminal attributes could not be read (`tcgetattr`).
    #[error("tcgetattr: {0}")]
    TerminalQuery(#[source] io::Error),

    /// Terminal attributes could not be applied (`tcsetattr`).
    #[error("tcsetattr: {0}")]
    TerminalConfig(#[source] io::Error),

    /// Neither the kernel query nor the cursor-report fallback produced
    /// a usable window size.
    #[error("get window size: {0}")]
    Probe(#[source] io::Error),

    /// Reading a byte from the terminal failed for a reason other than
    /// the raw-mode read timeout.
    #[error("read: {0}")]
    Read(#[source] io::Error),

    /// Writing to the terminal failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),
}

impl Error {
    /// Build a [`Probe`](Self::Probe) error from a plain message.
    pub(crate) fn probe(msg: &str) -> Self {
        Self::Probe(io::Error::new(io::ErrorKind::InvalidData, msg.to_owned()))
    }

    /// The underlying OS error.
    #[must_use]
    pub const fn io(&self) -> &io::Error {
        match self {
            Self::TerminalQuery(e)
            | Self::TerminalConfig(e)
            | Self::Probe(e)
            | Self::Read(e)
            | Self::Write(e) => e,
        }
    }
}

/// Result alias for terminal-control operations.
pub type Result<T> = std::result::Result<T, Error>;

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_call() {
        let err = Error::TerminalQuery(io::Error::from_raw_os_error(libc::ENOTTY));
        let msg = err.to_string();
        assert!(msg.starts_with("tcgetattr: "), "{msg}");
    }

    #[test]
    fn probe_message_is_preserved() {
        let err = Error::probe("malformed cursor report");
        assert_eq!(err.to_string(), "get window size: malformed cursor report");
        assert_eq!(err.io().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn source_is_the_io_error() {
        use std::error::Error as _;
        let err = Error::Write(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "gone");
    }
}
