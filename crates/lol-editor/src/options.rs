//! Editor options.
//!
//! Run-time settings the binary collects from its command line. Values are
//! validated here, once, so the rest of the editor can take them as given.
//!
//! | Option         | Type | Default | Range  |
//! |----------------|------|---------|--------|
//! | `read_timeout` | u8   | 1       | 1–255  |
//!
//! `read_timeout` is the raw-mode `VTIME` in tenths of a second: how long a
//! terminal read waits before coming back empty. It also bounds how long a
//! lone Escape press takes to be recognized.

use lol_term::terminal::RawModeConfig;

/// An option value that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// `VTIME = 0` with `VMIN = 0` turns every read into a non-blocking
    /// poll, and the main loop would spin.
    #[error("read timeout must be at least 1 tenth of a second")]
    ZeroReadTimeout,
}

/// Validated editor options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    read_timeout: u8,
}

impl Options {
    /// Options with the given read timeout (tenths of a second).
    ///
    /// # Errors
    ///
    /// [`OptionsError::ZeroReadTimeout`] if `read_timeout` is 0.
    pub const fn new(read_timeout: u8) -> Result<Self, OptionsError> {
        if read_timeout == 0 {
            return Err(OptionsError::ZeroReadTimeout);
        }
        Ok(Self { read_timeout })
    }

    /// Read timeout in tenths of a second.
    #[inline]
    #[must_use]
    pub const fn read_timeout(&self) -> u8 {
        self.read_timeout
    }

    /// The raw-mode configuration these options describe.
    #[must_use]
    pub const fn raw_mode(&self) -> RawModeConfig {
        RawModeConfig::new(self.read_timeout)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            read_timeout: RawModeConfig::DEFAULT_READ_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
