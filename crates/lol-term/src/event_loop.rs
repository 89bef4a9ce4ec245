// SPDX-License-Identifier: MIT
//
// Event loop — the heartbeat of the terminal application.
//
// This is the module that wires everything together. One session walks
// three phases:
//
//   Init         enter raw mode, probe the window size, hand it to the app
//   Running      paint a frame → block for one key → let the app act on it
//   Terminating  clear the screen on the way out, restore the terminal
//
// Any failure in Init or Running jumps straight to Terminating. The
// restore happens before `run` returns, on every path, so the caller can
// print its error message to a terminal that echoes again.
//
// # Frames
//
// Each frame is composed into a fresh `OutputBuffer`: hide the cursor,
// home it, let the app paint its rows, park the cursor where the app wants
// it, show it again. The whole buffer goes out in one write, so the
// terminal never displays half a frame or a cursor sweeping across the
// screen while rows are drawn. There is no diffing: every frame repaints
// every row.
//
// # Input
//
// Single-threaded and synchronous. The only blocking point is the raw-mode
// read inside the key decoder, bounded by the VTIME timeout; timeouts with
// no input just loop back into the read without repainting.

use std::io;

use crate::ansi;
use crate::device::{StdioDevice, TerminalDevice};
use crate::error::{Error, Result};
use crate::input::Key;
use crate::output::OutputBuffer;
use crate::terminal::{RawModeConfig, Size, Terminal};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Clear the screen and exit the event loop cleanly.
    Quit,
}

/// Application interface for the event loop.
///
/// The event loop calls [`on_resize`](App::on_resize) once the window size
/// is known, then alternates [`paint`](App::paint) /
/// [`cursor`](App::cursor) and [`on_key`](App::on_key) until the app
/// returns [`Action::Quit`].
pub trait App {
    /// Handle one decoded key.
    ///
    /// Return [`Action::Quit`] to exit the event loop.
    fn on_key(&mut self, _key: Key) -> Action {
        Action::Continue
    }

    /// Receive the window size. Called once, before the first frame.
    fn on_resize(&mut self, _size: Size) {}

    /// Append the screen rows to the frame.
    ///
    /// The cursor is hidden and at the home position when this is called;
    /// the event loop positions and shows it afterwards.
    fn paint(&mut self, out: &mut OutputBuffer);

    /// Where the terminal cursor goes after painting, as 0-indexed `(x, y)`.
    fn cursor(&self) -> (u16, u16) {
        (0, 0)
    }
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Lifecycle phase of an [`EventLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Entering raw mode and probing the window.
    Init,
    /// Painting frames and handling keys.
    Running,
    /// Restoring the terminal. Also the phase after `run` returns.
    Terminating,
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// Owns the terminal. Call [`run`](Self::run) to enter the loop; it
/// returns when the application signals [`Action::Quit`] or a fatal error
/// occurs, with the terminal restored in both cases.
///
/// # Example
///
/// ```no_run
/// use lol_term::event_loop::{Action, App, EventLoop};
/// use lol_term::input::Key;
/// use lol_term::output::OutputBuffer;
/// use lol_term::terminal::RawModeConfig;
///
/// struct MyApp;
///
/// impl App for MyApp {
///     fn on_key(&mut self, key: Key) -> Action {
///         if key == Key::ctrl(b'q') {
///             return Action::Quit;
///         }
///         Action::Continue
///     }
///
///     fn paint(&mut self, out: &mut OutputBuffer) {
///         out.push_bytes(b"~");
///     }
/// }
///
/// let mut event_loop = EventLoop::new(RawModeConfig::default());
/// event_loop.run(&mut MyApp)?;
/// # Ok::<(), lol_term::Error>(())
/// ```
pub struct EventLoop<D: TerminalDevice = StdioDevice> {
    terminal: Terminal<D>,
    phase: Phase,
}

impl EventLoop<StdioDevice> {
    /// Event loop on the process's own terminal.
    #[must_use]
    pub fn new(config: RawModeConfig) -> Self {
        Self::with_device(StdioDevice::new(), config)
    }
}

impl<D: TerminalDevice> EventLoop<D> {
    /// Event loop on an arbitrary device.
    #[must_use]
    pub fn with_device(device: D, config: RawModeConfig) -> Self {
        Self {
            terminal: Terminal::new(device, config),
            phase: Phase::Init,
        }
    }

    /// The current lifecycle phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the session until the application returns [`Action::Quit`].
    ///
    /// On a fatal error the screen is cleared (best effort) before the
    /// terminal is restored; the error is returned afterwards so it can be
    /// reported to a working terminal.
    ///
    /// # Errors
    ///
    /// The first fatal error: raw mode ([`Error::TerminalQuery`],
    /// [`Error::TerminalConfig`]), window probe ([`Error::Probe`]), or
    /// device I/O ([`Error::Read`], [`Error::Write`]). A failed restore
    /// after an otherwise clean run is [`Error::TerminalConfig`].
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        self.phase = Phase::Init;
        let result = self.run_inner(app);
        self.phase = Phase::Terminating;
        tracing::debug!(phase = ?self.phase(), clean = result.is_ok(), "session ending");

        if result.is_err() {
            if let Err(e) = self.clear_screen() {
                tracing::warn!(error = %e, "could not clear the screen after a fatal error");
            }
        }

        let restored = self.terminal.disable_raw_mode();
        result.and(restored)
    }

    /// Init and Running, separated so Terminating runs regardless of outcome.
    fn run_inner(&mut self, app: &mut impl App) -> Result<()> {
        self.terminal.enable_raw_mode()?;
        let size = self.terminal.window_size()?;
        app.on_resize(size);

        self.phase = Phase::Running;
        tracing::debug!(rows = size.rows, cols = size.cols, "session running");

        loop {
            self.render(app)?;
            let key = self.terminal.read_key()?;
            if app.on_key(key) == Action::Quit {
                tracing::debug!("quit requested");
                return self.clear_screen();
            }
        }
    }

    /// Compose one frame and write it in a single call.
    ///
    /// # Errors
    ///
    /// [`Error::Write`] if the device write fails.
    pub fn render(&mut self, app: &mut impl App) -> Result<()> {
        let mut out = OutputBuffer::new();
        compose_frame(&mut out, app).map_err(Error::Write)?;
        self.terminal.write_all(out.as_bytes())
    }

    /// Clear the screen and home the cursor.
    fn clear_screen(&mut self) -> Result<()> {
        let mut out = OutputBuffer::new();
        ansi::clear_screen(&mut out).map_err(Error::Write)?;
        ansi::cursor_home(&mut out).map_err(Error::Write)?;
        self.terminal.write_all(out.as_bytes())
    }
}

/// Append one full frame for `app` to `out`.
fn compose_frame(out: &mut OutputBuffer, app: &mut impl App) -> io::Result<()> {
    ansi::cursor_hide(out)?;
    ansi::cursor_home(out)?;
    app.paint(out);
    let (x, y) = app.cursor();
    ansi::cursor_to(out, x, y)?;
    ansi::cursor_show(out)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Failure, ScriptedDevice};
    use crate::terminal::TerminalAttributes;
    use pretty_assertions::assert_eq;

    /// Paints `rows` tildes, quits on `q`, records what it saw.
    struct Recorder {
        size: Option<Size>,
        keys: Vec<Key>,
        cursor: (u16, u16),
    }

    impl Recorder {
        const fn new() -> Self {
            Self {
                size: None,
                keys: Vec::new(),
                cursor: (0, 0),
            }
        }
    }

    impl App for Recorder {
        fn on_key(&mut self, key: Key) -> Action {
            self.keys.push(key);
            if key == Key::Char(b'q') {
                Action::Quit
            } else {
                Action::Continue
            }
        }

        fn on_resize(&mut self, size: Size) {
            self.size = Some(size);
        }

        fn paint(&mut self, out: &mut OutputBuffer) {
            out.push_bytes(b"~");
        }

        fn cursor(&self) -> (u16, u16) {
            self.cursor
        }
    }

    fn event_loop(device: ScriptedDevice) -> EventLoop<ScriptedDevice> {
        EventLoop::with_device(device, RawModeConfig::default())
    }

    // ── Action ──────────────────────────────────────────────────

    #[test]
    fn action_equality() {
        assert_eq!(Action::Continue, Action::Continue);
        assert_ne!(Action::Continue, Action::Quit);
    }

    // ── App trait defaults ─────────────────────────────────────

    struct MinimalApp;
    impl App for MinimalApp {
        fn paint(&mut self, _out: &mut OutputBuffer) {}
    }

    #[test]
    fn app_default_on_key_continues() {
        assert_eq!(MinimalApp.on_key(Key::Escape), Action::Continue);
    }

    #[test]
    fn app_default_cursor_is_origin() {
        assert_eq!(MinimalApp.cursor(), (0, 0));
    }

    // ── Frames ─────────────────────────────────────────────────

    #[test]
    fn frame_sequence() {
        let mut out = OutputBuffer::new();
        let mut app = Recorder::new();
        compose_frame(&mut out, &mut app).unwrap();
        assert_eq!(
            String::from_utf8_lossy(out.as_bytes()),
            "\x1b[?25l\x1b[H~\x1b[1;1H\x1b[?25h"
        );
    }

    #[test]
    fn frame_positions_cursor_one_indexed() {
        let mut out = OutputBuffer::new();
        let mut app = Recorder::new();
        app.cursor = (10, 5);
        compose_frame(&mut out, &mut app).unwrap();
        assert!(out.as_bytes().ends_with(b"\x1b[6;11H\x1b[?25h"));
    }

    #[test]
    fn render_is_one_write() {
        let device = ScriptedDevice::new();
        let handle = device.handle();
        let mut el = event_loop(device);
        el.render(&mut Recorder::new()).unwrap();
        assert_eq!(handle.output_string(), "\x1b[?25l\x1b[H~\x1b[1;1H\x1b[?25h");
    }

    // ── Session ────────────────────────────────────────────────

    #[test]
    fn quit_clears_screen_and_restores() {
        let device = ScriptedDevice::new().with_input(b"aq");
        let handle = device.handle();
        let mut el = event_loop(device);
        let mut app = Recorder::new();

        el.run(&mut app).unwrap();

        assert_eq!(el.phase(), Phase::Terminating);
        assert_eq!(app.keys, vec![Key::Char(b'a'), Key::Char(b'q')]);
        assert_eq!(app.size, Some(Size::new(24, 80)));
        assert!(handle.output_string().ends_with("\x1b[2J\x1b[H"));
        assert_eq!(handle.current(), TerminalAttributes::cooked());
        assert_eq!(handle.applied().len(), 2);
    }

    #[test]
    fn one_frame_per_key() {
        let device = ScriptedDevice::new().with_input(b"abq");
        let handle = device.handle();
        let mut el = event_loop(device);
        el.run(&mut Recorder::new()).unwrap();
        assert_eq!(handle.output_string().matches("\x1b[?25l").count(), 3);
    }

    #[test]
    fn timeouts_do_not_repaint() {
        let device = ScriptedDevice::new()
            .with_timeout()
            .with_timeout()
            .with_input(b"q");
        let handle = device.handle();
        let mut el = event_loop(device);
        el.run(&mut Recorder::new()).unwrap();
        assert_eq!(handle.output_string().matches("\x1b[?25l").count(), 1);
    }

    #[test]
    fn probe_failure_restores_exactly_once() {
        let device = ScriptedDevice::new()
            .failing(Failure::WindowQuery)
            .with_timeout();
        let handle = device.handle();
        let mut el = event_loop(device);

        let err = el.run(&mut Recorder::new()).unwrap_err();
        assert!(matches!(err, Error::Probe(_)));

        let applied = handle.applied();
        assert_eq!(applied.len(), 2, "raw mode, then one restore");
        assert_eq!(applied[1], TerminalAttributes::cooked());
        assert_eq!(handle.current(), TerminalAttributes::cooked());
        assert!(!handle.restore_armed());

        drop(el);
        assert_eq!(handle.applied().len(), 2);
    }

    #[test]
    fn probe_failure_clears_screen_before_restoring() {
        let device = ScriptedDevice::new()
            .failing(Failure::WindowQuery)
            .with_timeout();
        let handle = device.handle();
        let mut el = event_loop(device);
        let _ = el.run(&mut Recorder::new());
        assert!(handle.output_string().ends_with("\x1b[6n\x1b[2J\x1b[H"));
    }

    #[test]
    fn query_failure_never_touches_attributes() {
        let device = ScriptedDevice::new().failing(Failure::GetAttributes);
        let handle = device.handle();
        let mut el = event_loop(device);
        let err = el.run(&mut Recorder::new()).unwrap_err();
        assert!(matches!(err, Error::TerminalQuery(_)));
        assert!(handle.applied().is_empty());
    }

    #[test]
    fn read_failure_is_fatal_and_restores() {
        let device = ScriptedDevice::new().failing(Failure::Read);
        let handle = device.handle();
        let mut el = event_loop(device);
        let err = el.run(&mut Recorder::new()).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
        assert_eq!(handle.current(), TerminalAttributes::cooked());
    }

    #[test]
    fn write_failure_is_fatal_and_restores() {
        let device = ScriptedDevice::new().failing(Failure::Write).with_input(b"q");
        let handle = device.handle();
        let mut el = event_loop(device);
        let err = el.run(&mut Recorder::new()).unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert_eq!(handle.applied().len(), 2);
    }

    #[test]
    fn phase_starts_in_init() {
        let el = event_loop(ScriptedDevice::new());
        assert_eq!(el.phase(), Phase::Init);
    }
}
