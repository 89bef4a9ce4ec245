// SPDX-License-Identifier: MIT
//
// lol — LOL Improved, a tiny raw-mode terminal editor.
//
// This is the main binary that wires together the two crates:
//
//   lol-term   → raw mode, key decoding, window probe, event loop
//   lol-editor → cursor model, screen rows, options
//
// The Editor struct implements lol-term's App trait, connecting the event
// loop to the editor's state. Each keypress flows through:
//
//   stdin → read_key → on_key → cursor movement / quit
//   paint → view::draw_rows → output buffer → one write to the terminal
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ ~                            │
//   │ ~  LOL Improved -- version : │  ← row rows/3
//   │ ~     press Ctrl-Q to quit   │
//   │ ~                            │
//   └──────────────────────────────┘

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lol_editor::cursor::Cursor;
use lol_editor::options::Options;
use lol_editor::view;

use lol_term::device::TerminalDevice;
use lol_term::event_loop::{Action, App, EventLoop};
use lol_term::input::Key;
use lol_term::output::OutputBuffer;
use lol_term::terminal::Size;

// ─── Command line ───────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "lol", version, about = "LOL Improved — a tiny raw-mode terminal editor")]
struct Cli {
    /// How long a terminal read waits for a byte, in tenths of a second.
    #[arg(long, value_name = "TENTHS", default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=255))]
    read_timeout: u8,

    /// Write log output to this file. Nothing is logged without it.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `lol_term=trace`.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    log_level: String,
}

/// Install a file-backed subscriber when a log file was requested.
///
/// Stdout is the editor's screen, so there is no console fallback.
fn init_logging(cli: &Cli) -> std::io::Result<()> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The editor application state.
///
/// Holds the window size learned at startup and the cursor. There is no
/// text buffer; the screen shows empty-line markers and the banner.
#[derive(Debug)]
struct Editor {
    size: Size,
    cursor: Cursor,
}

impl Editor {
    const fn new() -> Self {
        Self {
            size: Size::new(0, 0),
            cursor: Cursor::new(),
        }
    }
}

impl App for Editor {
    fn on_key(&mut self, key: Key) -> Action {
        match key {
            k if k == Key::ctrl(b'q') => Action::Quit,
            Key::ArrowUp
            | Key::ArrowDown
            | Key::ArrowLeft
            | Key::ArrowRight
            | Key::PageUp
            | Key::PageDown
            | Key::Home
            | Key::End => {
                self.cursor.move_cursor(key, self.size);
                Action::Continue
            }
            // Delete, Escape, and plain characters have no editing
            // effect yet.
            _ => Action::Continue,
        }
    }

    fn on_resize(&mut self, size: Size) {
        self.size = size;
        self.cursor.clamp_to(size);
    }

    fn paint(&mut self, out: &mut OutputBuffer) {
        view::draw_rows(out, self.size);
    }

    fn cursor(&self) -> (u16, u16) {
        self.cursor.position()
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

/// Run one editing session and turn its outcome into an exit code.
///
/// The event loop has already restored the terminal when `run` returns, so
/// the error message lands on a sane screen.
fn session<D: TerminalDevice>(event_loop: &mut EventLoop<D>, editor: &mut Editor) -> ExitCode {
    match event_loop.run(editor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, os_error = ?e.io().raw_os_error(), "session aborted");
            eprintln!("lol: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("lol: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let options = match Options::new(cli.read_timeout) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("lol: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(read_timeout = options.read_timeout(), "starting");

    let mut event_loop = EventLoop::new(options.raw_mode());
    session(&mut event_loop, &mut Editor::new())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lol_term::device::{Failure, ScriptHandle, ScriptedDevice};
    use lol_term::terminal::{RawModeConfig, TerminalAttributes};
    use pretty_assertions::assert_eq;

    const CTRL_Q: u8 = 0x11;

    // ── Helpers ───────────────────────────────────────────────────────────

    /// Run a full session over `device` and return the exit code, the
    /// editor's final state, and the device handle.
    fn run_session(device: ScriptedDevice) -> (ExitCode, Editor, ScriptHandle) {
        let handle = device.handle();
        let mut editor = Editor::new();
        let mut event_loop = EventLoop::with_device(device, RawModeConfig::default());
        let code = session(&mut event_loop, &mut editor);
        (code, editor, handle)
    }

    fn editor_sized(rows: u16, cols: u16) -> Editor {
        let mut e = Editor::new();
        e.on_resize(Size::new(rows, cols));
        e
    }

    fn feed(e: &mut Editor, keys: &[Key]) {
        for &k in keys {
            assert_eq!(e.on_key(k), Action::Continue);
        }
    }

    // ── Command line ──────────────────────────────────────────────────────

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["lol"]).unwrap();
        assert_eq!(cli.read_timeout, 1);
        assert_eq!(cli.log_file, None);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn cli_accepts_timeout_and_log_file() {
        let cli = Cli::try_parse_from([
            "lol",
            "--read-timeout",
            "10",
            "--log-file",
            "/tmp/lol.log",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.read_timeout, 10);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/lol.log")));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn cli_rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["lol", "--read-timeout", "0"]).is_err());
    }

    #[test]
    fn cli_rejects_oversized_timeout() {
        assert!(Cli::try_parse_from(["lol", "--read-timeout", "256"]).is_err());
    }

    #[test]
    fn no_log_file_installs_nothing() {
        let cli = Cli::try_parse_from(["lol"]).unwrap();
        assert!(init_logging(&cli).is_ok());
    }

    // ── Key handling ──────────────────────────────────────────────────────

    #[test]
    fn ctrl_q_quits() {
        let mut e = editor_sized(24, 80);
        assert_eq!(e.on_key(Key::Char(CTRL_Q)), Action::Quit);
    }

    #[test]
    fn plain_q_does_not_quit() {
        let mut e = editor_sized(24, 80);
        assert_eq!(e.on_key(Key::Char(b'q')), Action::Continue);
    }

    #[test]
    fn arrows_move_cursor() {
        let mut e = editor_sized(24, 80);
        feed(&mut e, &[Key::ArrowDown, Key::ArrowDown, Key::ArrowRight]);
        assert_eq!(e.cursor(), (1, 2));
    }

    #[test]
    fn page_and_line_keys_move_cursor() {
        let mut e = editor_sized(24, 80);
        feed(&mut e, &[Key::PageDown, Key::End]);
        assert_eq!(e.cursor(), (79, 23));
        feed(&mut e, &[Key::Home, Key::PageUp]);
        assert_eq!(e.cursor(), (0, 0));
    }

    #[test]
    fn ignored_keys_leave_cursor_alone() {
        let mut e = editor_sized(24, 80);
        feed(&mut e, &[Key::ArrowRight]);
        feed(&mut e, &[Key::Delete, Key::Escape, Key::Char(b'x')]);
        assert_eq!(e.cursor(), (1, 0));
    }

    #[test]
    fn resize_clamps_cursor() {
        let mut e = editor_sized(24, 80);
        feed(&mut e, &[Key::PageDown, Key::End]);
        e.on_resize(Size::new(10, 20));
        assert_eq!(e.cursor(), (19, 9));
    }

    // ── Painting ──────────────────────────────────────────────────────────

    #[test]
    fn paint_draws_every_row() {
        let mut e = editor_sized(24, 80);
        let mut out = OutputBuffer::new();
        e.paint(&mut out);
        let text = String::from_utf8(out.as_bytes().to_vec()).unwrap();
        assert_eq!(text.split("\r\n").count(), 24);
        assert!(text.contains(view::BANNER));
    }

    // ── Sessions ──────────────────────────────────────────────────────────

    #[test]
    fn quit_exits_cleanly_and_restores() {
        let device = ScriptedDevice::new().with_input(&[CTRL_Q]);
        let (code, _, handle) = run_session(device);

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(handle.current(), TerminalAttributes::cooked());
        assert!(!handle.restore_armed());
        assert!(handle.output_string().ends_with("\x1b[2J\x1b[H"));
    }

    #[test]
    fn arrows_reposition_cursor_in_next_frame() {
        // Ten rights and five downs land on (10, 5): CUP row 6, column 11.
        let mut input = b"\x1b[C".repeat(10);
        input.extend(b"\x1b[B".repeat(5));
        input.push(CTRL_Q);
        let device = ScriptedDevice::new().with_input(&input);
        let (code, editor, handle) = run_session(device);

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(editor.cursor(), (10, 5));
        let out = handle.output_string();
        let last_frame = out.rsplit("\x1b[?25l").next().unwrap();
        assert!(last_frame.ends_with("\x1b[6;11H\x1b[?25h\x1b[2J\x1b[H"));
    }

    #[test]
    fn session_uses_probed_size() {
        let device = ScriptedDevice::new()
            .with_window(Size::new(5, 30))
            .with_input(&[CTRL_Q]);
        let (_, editor, _) = run_session(device);
        assert_eq!(editor.size, Size::new(5, 30));
    }

    #[test]
    fn probe_fallback_reads_cursor_report() {
        let device = ScriptedDevice::new()
            .failing(Failure::WindowQuery)
            .with_input(b"\x1b[40;100R")
            .with_input(&[CTRL_Q]);
        let (code, editor, handle) = run_session(device);

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(editor.size, Size::new(40, 100));
        assert!(handle.output_string().starts_with("\x1b[999C\x1b[999B\x1b[6n"));
    }

    #[test]
    fn probe_failure_exits_with_error_and_restores() {
        let device = ScriptedDevice::new()
            .failing(Failure::WindowQuery)
            .with_input(b"garbage")
            .with_timeout();
        let (code, _, handle) = run_session(device);

        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(handle.current(), TerminalAttributes::cooked());
        assert!(!handle.restore_armed());
    }

    #[test]
    fn attribute_query_failure_exits_with_error() {
        let device = ScriptedDevice::new().failing(Failure::GetAttributes);
        let (code, _, handle) = run_session(device);

        assert_eq!(code, ExitCode::FAILURE);
        assert!(handle.applied().is_empty());
    }

    #[test]
    fn read_failure_exits_with_error_and_restores() {
        let device = ScriptedDevice::new().failing(Failure::Read);
        let (code, _, handle) = run_session(device);

        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(handle.current(), TerminalAttributes::cooked());
    }
}
