// SPDX-License-Identifier: MIT
//
// Terminal device — the byte-level seam between the engine and the tty.
//
// Safety: `StdioDevice` necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), and raw fd reads/writes. These are the
// standard POSIX interfaces for terminal control; there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// Everything above this module (raw mode, key decoding, the window probe,
// frame output) talks to the terminal only through `TerminalDevice`. The
// real implementation reads stdin and writes stdout; the scripted one
// replays canned input and records what was applied and written, so the
// whole engine can be exercised without a tty.
//
// The panic hook deserves special mention: it bypasses Rust's stdout lock
// entirely, writing a pre-built restore sequence directly to fd 1. This
// prevents deadlock if the panic happened while holding the stdout lock
// (common during frame output). One raw write, screen cleared and cursor
// shown, termios restored, then the original panic handler prints its
// message to a working terminal.

use std::io;
use std::sync::{Mutex, Once};

use crate::terminal::{Size, TerminalAttributes};

// ─── TerminalDevice ─────────────────────────────────────────────────────────

/// Byte-level access to a terminal.
pub trait TerminalDevice {
    /// Read the current terminal attributes (`tcgetattr`).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the query fails (e.g. not a tty).
    fn get_attributes(&mut self) -> io::Result<TerminalAttributes>;

    /// Apply terminal attributes (`tcsetattr` with `TCSAFLUSH`).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the attributes cannot be applied.
    fn set_attributes(&mut self, attrs: &TerminalAttributes) -> io::Result<()>;

    /// Ask the kernel for the window size (`ioctl(TIOCGWINSZ)`).
    ///
    /// The returned size may contain zeros; callers validate it.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the query is unsupported or fails.
    fn window_size(&mut self) -> io::Result<Size>;

    /// Read one byte.
    ///
    /// `Ok(None)` means the raw-mode read timeout expired with no input.
    ///
    /// # Errors
    ///
    /// Returns the OS error for any failure other than a timeout.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write all of `bytes`, retrying short writes until done.
    ///
    /// # Errors
    ///
    /// Returns the OS error if writing fails.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Called once `original` has been captured and before raw attributes
    /// are applied. Devices that can restore on abnormal exit arm that here.
    fn arm_restore(&mut self, _original: &TerminalAttributes) {}

    /// Called after the original attributes were written back.
    fn disarm_restore(&mut self) {}

    /// Whether the armed restore has already run outside the terminal
    /// handle (the panic hook), so writing the snapshot again is redundant.
    fn restore_taken(&mut self) -> bool {
        false
    }
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Terminal`](crate::terminal::Terminal) owns its own copy, but the
/// panic hook can't access it. This global backup (a [`Mutex`], not
/// `static mut`) lets the hook restore the attributes without the struct.
static TERMIOS_BACKUP: Mutex<Option<TerminalAttributes>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
fn restore_termios_from_backup() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.take() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original.as_termios());
            }
        }
    }
}

/// Emergency restore sequence: clear screen, cursor home, show cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, no way to read the error message.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            restore_termios_from_backup();
            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
///
/// Only does anything while a backup is armed, so a panic outside raw mode
/// leaves the screen alone.
fn emergency_restore() {
    let armed = TERMIOS_BACKUP.lock().map(|g| g.is_some()).unwrap_or(false);
    if !armed {
        return;
    }
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }
}

// ─── StdioDevice ────────────────────────────────────────────────────────────

/// The process's controlling terminal: attributes and input on stdin,
/// output and window size on stdout.
#[derive(Debug, Default)]
pub struct StdioDevice {
    armed: bool,
}

impl StdioDevice {
    /// Handle to stdin/stdout.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: false }
    }
}

/// Write all of `bytes` to `fd` with `write(2)`, bypassing std's
/// line-buffered stdout so a frame is not split at its last newline.
fn write_fd(fd: libc::c_int, bytes: &[u8]) -> io::Result<()> {
    write_all_with(bytes, |chunk| {
        let n = unsafe { libc::write(fd, chunk.as_ptr().cast::<libc::c_void>(), chunk.len()) };
        usize::try_from(n).map_err(|_| io::Error::last_os_error())
    })
}

/// Drive `write` until `bytes` is consumed, resuming after short writes
/// and `EINTR`.
fn write_all_with(
    mut bytes: &[u8],
    mut write: impl FnMut(&[u8]) -> io::Result<usize>,
) -> io::Result<()> {
    while !bytes.is_empty() {
        match write(bytes) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl TerminalDevice for StdioDevice {
    fn get_attributes(&mut self) -> io::Result<TerminalAttributes> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(TerminalAttributes::from_termios(termios))
    }

    fn set_attributes(&mut self, attrs: &TerminalAttributes) -> io::Result<()> {
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, attrs.as_termios()) } != 0
        {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn window_size(&mut self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Size::new(ws.ws_row, ws.ws_col))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            // VMIN = 0: zero bytes means VTIME expired.
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(err),
                }
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_fd(libc::STDOUT_FILENO, bytes)
    }

    fn arm_restore(&mut self, original: &TerminalAttributes) {
        install_panic_hook();
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(*original);
        }
        self.armed = true;
    }

    fn disarm_restore(&mut self) {
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        self.armed = false;
    }

    fn restore_taken(&mut self) -> bool {
        // The hook consumes the backup when it restores.
        self.armed && TERMIOS_BACKUP.lock().is_ok_and(|g| g.is_none())
    }
}

// ─── ScriptedDevice ─────────────────────────────────────────────────────────

#[cfg(any(test, feature = "test-helpers"))]
pub use scripted::{Failure, ScriptHandle, ScriptedDevice};

#[cfg(any(test, feature = "test-helpers"))]
mod scripted {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    use super::TerminalDevice;
    use crate::terminal::{Size, TerminalAttributes};

    /// A device operation that can be told to fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Failure {
        /// `get_attributes` fails with `ENOTTY`.
        GetAttributes,
        /// Every `set_attributes` fails with `EIO`.
        SetAttributes,
        /// `window_size` fails with `ENOTTY`.
        WindowQuery,
        /// Every `write_all` fails with `EIO`.
        Write,
        /// Every `read_byte` fails with `EIO`.
        Read,
    }

    #[derive(Debug)]
    struct State {
        current: TerminalAttributes,
        applied: Vec<TerminalAttributes>,
        input: VecDeque<Option<u8>>,
        output: Vec<u8>,
        window: Size,
        failures: Vec<Failure>,
        armed: bool,
        backup: Option<TerminalAttributes>,
        reads: usize,
    }

    /// In-memory terminal that replays scripted input.
    ///
    /// Starts in [`TerminalAttributes::cooked`] with a 24×80 window. Input
    /// is a queue of bytes and timeouts; once it runs dry every read fails
    /// with `UnexpectedEof`, so a test that reads too far errors instead of
    /// hanging.
    #[derive(Debug)]
    pub struct ScriptedDevice {
        state: Rc<RefCell<State>>,
    }

    /// Shared view of a [`ScriptedDevice`]'s recorded activity. Stays valid
    /// after the device has been moved into (and dropped with) a terminal.
    #[derive(Debug, Clone)]
    pub struct ScriptHandle {
        state: Rc<RefCell<State>>,
    }

    impl ScriptedDevice {
        /// A cooked 24×80 terminal with no input.
        #[must_use]
        pub fn new() -> Self {
            Self {
                state: Rc::new(RefCell::new(State {
                    current: TerminalAttributes::cooked(),
                    applied: Vec::new(),
                    input: VecDeque::new(),
                    output: Vec::new(),
                    window: Size::new(24, 80),
                    failures: Vec::new(),
                    armed: false,
                    backup: None,
                    reads: 0,
                })),
            }
        }

        /// Report `size` from the kernel window query.
        #[must_use]
        pub fn with_window(self, size: Size) -> Self {
            self.state.borrow_mut().window = size;
            self
        }

        /// Queue input bytes.
        #[must_use]
        pub fn with_input(self, bytes: &[u8]) -> Self {
            self.state
                .borrow_mut()
                .input
                .extend(bytes.iter().copied().map(Some));
            self
        }

        /// Queue one read timeout (a read that returns no byte).
        #[must_use]
        pub fn with_timeout(self) -> Self {
            self.state.borrow_mut().input.push_back(None);
            self
        }

        /// Make an operation fail.
        #[must_use]
        pub fn failing(self, failure: Failure) -> Self {
            self.state.borrow_mut().failures.push(failure);
            self
        }

        /// A handle for inspecting the device after it has been moved.
        #[must_use]
        pub fn handle(&self) -> ScriptHandle {
            ScriptHandle {
                state: Rc::clone(&self.state),
            }
        }

        fn fails(&self, failure: Failure) -> bool {
            self.state.borrow().failures.contains(&failure)
        }
    }

    impl Default for ScriptedDevice {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ScriptHandle {
        /// Every attribute set applied, in order.
        #[must_use]
        pub fn applied(&self) -> Vec<TerminalAttributes> {
            self.state.borrow().applied.clone()
        }

        /// The attributes the terminal is in now.
        #[must_use]
        pub fn current(&self) -> TerminalAttributes {
            self.state.borrow().current
        }

        /// Everything written so far.
        #[must_use]
        pub fn output(&self) -> Vec<u8> {
            self.state.borrow().output.clone()
        }

        /// Everything written so far, lossily decoded for assertions.
        #[must_use]
        pub fn output_string(&self) -> String {
            String::from_utf8_lossy(&self.state.borrow().output).into_owned()
        }

        /// Whether the restore hook is currently armed.
        #[must_use]
        pub fn restore_armed(&self) -> bool {
            self.state.borrow().armed
        }

        /// Do what the panic hook does: write the armed snapshot back and
        /// consume it. Returns `false` if nothing was armed.
        pub fn run_panic_restore(&self) -> bool {
            let mut state = self.state.borrow_mut();
            let Some(original) = state.backup.take() else {
                return false;
            };
            state.current = original;
            state.applied.push(original);
            true
        }

        /// Queued input entries (bytes and timeouts) not yet read.
        #[must_use]
        pub fn pending_input(&self) -> usize {
            self.state.borrow().input.len()
        }

        /// Number of `read_byte` calls made, including timeouts.
        #[must_use]
        pub fn reads(&self) -> usize {
            self.state.borrow().reads
        }
    }

    fn os_error(code: i32) -> io::Error {
        io::Error::from_raw_os_error(code)
    }

    impl TerminalDevice for ScriptedDevice {
        fn get_attributes(&mut self) -> io::Result<TerminalAttributes> {
            if self.fails(Failure::GetAttributes) {
                return Err(os_error(libc::ENOTTY));
            }
            Ok(self.state.borrow().current)
        }

        fn set_attributes(&mut self, attrs: &TerminalAttributes) -> io::Result<()> {
            if self.fails(Failure::SetAttributes) {
                return Err(os_error(libc::EIO));
            }
            let mut state = self.state.borrow_mut();
            state.current = *attrs;
            state.applied.push(*attrs);
            Ok(())
        }

        fn window_size(&mut self) -> io::Result<Size> {
            if self.fails(Failure::WindowQuery) {
                return Err(os_error(libc::ENOTTY));
            }
            Ok(self.state.borrow().window)
        }

        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            if self.fails(Failure::Read) {
                return Err(os_error(libc::EIO));
            }
            let mut state = self.state.borrow_mut();
            state.reads += 1;
            state.input.pop_front().ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "scripted input exhausted")
            })
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fails(Failure::Write) {
                return Err(os_error(libc::EIO));
            }
            self.state.borrow_mut().output.extend_from_slice(bytes);
            Ok(())
        }

        fn arm_restore(&mut self, original: &TerminalAttributes) {
            let mut state = self.state.borrow_mut();
            state.armed = true;
            state.backup = Some(*original);
        }

        fn disarm_restore(&mut self) {
            let mut state = self.state.borrow_mut();
            state.armed = false;
            state.backup = None;
        }

        fn restore_taken(&mut self) -> bool {
            let state = self.state.borrow();
            state.armed && state.backup.is_none()
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
