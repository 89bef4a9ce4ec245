// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode and RAII cleanup.
//
// Safety: This module uses `unsafe` for `mem::zeroed` on `termios` and for
// the `cfget*speed` readers. Both are plain-data POSIX interfaces; each
// unsafe block is a single call.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. `Terminal::enable_raw_mode`
// snapshots the original termios, arms the restore (the RAII drop plus the
// device's panic hook), and only then applies the derived raw settings.
// From that point on every exit path puts the snapshot back exactly once:
// an explicit `disable_raw_mode`, the drop of the handle, or the panic hook.
//
// The read timeout lives in the termios itself (VMIN = 0, VTIME = tenths of
// a second), so a blocked `read()` returns empty-handed after the timeout.
// The key decoder relies on that to tell a lone Escape press from the start
// of an escape sequence without a second thread or a poll loop.

use std::fmt;

use crate::device::TerminalDevice;
use crate::error::{Error, Result};
use crate::input::{self, Key};
use crate::probe;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Build a size from rows and columns.
    #[inline]
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { cols, rows }
    }

    /// Whether both dimensions are at least one cell.
    #[inline]
    #[must_use]
    pub const fn is_usable(self) -> bool {
        self.cols > 0 && self.rows > 0
    }
}

// ─── TerminalAttributes ─────────────────────────────────────────────────────

/// Snapshot of a terminal's termios configuration.
///
/// Captured once before raw mode is entered and written back verbatim when
/// it is left. Two snapshots compare equal when every flag word, every
/// control character, and both line speeds match.
#[derive(Clone, Copy)]
pub struct TerminalAttributes {
    termios: libc::termios,
}

impl TerminalAttributes {
    /// Wrap a termios value.
    #[inline]
    #[must_use]
    pub const fn from_termios(termios: libc::termios) -> Self {
        Self { termios }
    }

    /// The wrapped termios value, for handing to `tcsetattr`.
    #[inline]
    #[must_use]
    pub const fn as_termios(&self) -> &libc::termios {
        &self.termios
    }

    /// A typical cooked-mode configuration: canonical input, echo, signal
    /// keys, CR→NL translation, XON/XOFF, output post-processing, and a
    /// blocking single-byte read.
    #[must_use]
    pub fn cooked() -> Self {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        termios.c_iflag = libc::BRKINT | libc::ICRNL | libc::IXON | libc::INPCK | libc::ISTRIP;
        termios.c_oflag = libc::OPOST | libc::ONLCR;
        termios.c_cflag = libc::CS7 | libc::CREAD;
        termios.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN;
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        Self { termios }
    }

    /// Whether typed characters are echoed back.
    #[inline]
    #[must_use]
    pub const fn echo(&self) -> bool {
        self.termios.c_lflag & libc::ECHO != 0
    }

    /// Whether input is line-buffered (canonical mode).
    #[inline]
    #[must_use]
    pub const fn canonical(&self) -> bool {
        self.termios.c_lflag & libc::ICANON != 0
    }

    /// Whether Ctrl-C / Ctrl-Z generate signals.
    #[inline]
    #[must_use]
    pub const fn signals(&self) -> bool {
        self.termios.c_lflag & libc::ISIG != 0
    }

    /// `VMIN`: minimum number of bytes a `read()` waits for.
    #[inline]
    #[must_use]
    pub const fn min_bytes(&self) -> u8 {
        self.termios.c_cc[libc::VMIN]
    }

    /// `VTIME`: read timeout in tenths of a second.
    #[inline]
    #[must_use]
    pub const fn read_timeout(&self) -> u8 {
        self.termios.c_cc[libc::VTIME]
    }

    fn speeds(&self) -> (libc::speed_t, libc::speed_t) {
        unsafe {
            (
                libc::cfgetispeed(&raw const self.termios),
                libc::cfgetospeed(&raw const self.termios),
            )
        }
    }
}

impl PartialEq for TerminalAttributes {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.termios, &other.termios);
        a.c_iflag == b.c_iflag
            && a.c_oflag == b.c_oflag
            && a.c_cflag == b.c_cflag
            && a.c_lflag == b.c_lflag
            && a.c_cc == b.c_cc
            && self.speeds() == other.speeds()
    }
}

impl Eq for TerminalAttributes {}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.termios;
        f.debug_struct("TerminalAttributes")
            .field("iflag", &format_args!("{:#x}", t.c_iflag))
            .field("oflag", &format_args!("{:#x}", t.c_oflag))
            .field("cflag", &format_args!("{:#x}", t.c_cflag))
            .field("lflag", &format_args!("{:#x}", t.c_lflag))
            .field("vmin", &self.min_bytes())
            .field("vtime", &self.read_timeout())
            .finish_non_exhaustive()
    }
}

// ─── RawModeConfig ──────────────────────────────────────────────────────────

/// How raw mode is derived from the original attributes.
///
/// Only the read timeout is tunable; every other raw-mode setting is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawModeConfig {
    /// `VTIME` in tenths of a second. `read()` returns empty-handed after
    /// this long with no input.
    pub read_timeout: u8,
}

impl RawModeConfig {
    /// Default read timeout: one tenth of a second.
    pub const DEFAULT_READ_TIMEOUT: u8 = 1;

    /// Config with the given read timeout (tenths of a second).
    #[inline]
    #[must_use]
    pub const fn new(read_timeout: u8) -> Self {
        Self { read_timeout }
    }

    /// Derive the raw attributes from `original`.
    ///
    /// Turns off echo, canonical mode, extended input processing, and
    /// signal keys; stops break from raising SIGINT, CR→NL translation,
    /// parity checks, 8th-bit stripping, and XON/XOFF; disables output
    /// post-processing; selects 8-bit characters. `read()` returns as soon
    /// as one byte is available or after the timeout with zero bytes.
    #[must_use]
    pub fn apply(&self, original: &TerminalAttributes) -> TerminalAttributes {
        let mut raw = original.termios;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = self.read_timeout;
        TerminalAttributes::from_termios(raw)
    }
}

impl Default for RawModeConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_READ_TIMEOUT)
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// Call [`enable_raw_mode`](Self::enable_raw_mode) to switch to raw input.
/// The original attributes are restored by
/// [`disable_raw_mode`](Self::disable_raw_mode) or automatically when the
/// handle is dropped, whichever comes first, and never twice.
///
/// # Example
///
/// ```no_run
/// use lol_term::device::StdioDevice;
/// use lol_term::terminal::{RawModeConfig, Terminal};
///
/// let mut term = Terminal::new(StdioDevice::new(), RawModeConfig::default());
/// term.enable_raw_mode()?;
/// let key = term.read_key()?;
/// // Terminal is restored automatically on drop.
/// # Ok::<(), lol_term::Error>(())
/// ```
pub struct Terminal<D: TerminalDevice> {
    device: D,
    config: RawModeConfig,

    /// Original attributes saved before entering raw mode. `Some` while the
    /// restore is still owed.
    original: Option<TerminalAttributes>,
}

impl<D: TerminalDevice> Terminal<D> {
    /// Wrap a device. Does **not** enter raw mode.
    #[must_use]
    pub fn new(device: D, config: RawModeConfig) -> Self {
        Self {
            device,
            config,
            original: None,
        }
    }

    /// Enter raw mode.
    ///
    /// Captures the current attributes, arms the restore, then applies the
    /// derived raw attributes. If applying fails the restore stays armed, so
    /// leaving still writes the snapshot back. Idempotent: calling it while
    /// already raw is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalQuery`] if the current attributes cannot be read,
    /// [`Error::TerminalConfig`] if the raw attributes cannot be applied.
    pub fn enable_raw_mode(&mut self) -> Result<()> {
        if self.original.is_some() {
            return Ok(());
        }

        let original = self.device.get_attributes().map_err(Error::TerminalQuery)?;
        self.original = Some(original);
        self.device.arm_restore(&original);

        let raw = self.config.apply(&original);
        self.device
            .set_attributes(&raw)
            .map_err(Error::TerminalConfig)?;

        tracing::debug!(
            echo = raw.echo(),
            canonical = raw.canonical(),
            signals = raw.signals(),
            vmin = raw.min_bytes(),
            vtime = raw.read_timeout(),
            "raw mode enabled"
        );
        Ok(())
    }

    /// Leave raw mode, writing the original attributes back.
    ///
    /// Idempotent and safe without a prior
    /// [`enable_raw_mode`](Self::enable_raw_mode): with nothing to restore
    /// it does nothing. The restore is attempted at most once, and skipped
    /// when the device's panic hook has already written the snapshot back.
    ///
    /// # Errors
    ///
    /// [`Error::TerminalConfig`] if the original attributes cannot be applied.
    pub fn disable_raw_mode(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };

        if self.device.restore_taken() {
            self.device.disarm_restore();
            tracing::debug!("original attributes already restored by the panic hook");
            return Ok(());
        }

        self.device
            .set_attributes(&original)
            .map_err(Error::TerminalConfig)?;
        self.device.disarm_restore();

        tracing::debug!("raw mode disabled, original attributes restored");
        Ok(())
    }

    /// Determine the window size. See [`probe::window_size`].
    ///
    /// # Errors
    ///
    /// [`Error::Probe`] if both strategies fail.
    pub fn window_size(&mut self) -> Result<Size> {
        probe::window_size(&mut self.device)
    }

    /// Block until one key is decoded. See [`input::read_key`].
    ///
    /// # Errors
    ///
    /// [`Error::Read`] if the device read fails.
    pub fn read_key(&mut self) -> Result<Key> {
        input::read_key(&mut self.device)
    }

    /// Write bytes to the terminal in full.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] if the device write fails.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.device.write_all(bytes).map_err(Error::Write)
    }
}

impl<D: TerminalDevice> Drop for Terminal<D> {
    fn drop(&mut self) {
        if let Err(e) = self.disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal on drop");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
