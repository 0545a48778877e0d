// SPDX-License-Identifier: MIT
//
// escprobe — watch raw terminal input arrive.
//
// Switches the terminal to raw mode, turns on every common mouse-reporting
// protocol, and prints each escape sequence or run of plain text as it
// comes in, until Ctrl+C:
//
//   stdin → StdinReader → Utf8Decoder → Classifier → report line → stdout
//
// The crates:
//
//   escprobe-term  → raw mode, mouse capture, signal capture, stdin bytes
//   escprobe-input → decoding, classification, report formatting, read loop

mod config;

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::process;
use std::sync::Mutex;

use escprobe_input::session::{Exit, Session};
use escprobe_term::reader::StdinReader;
use escprobe_term::terminal::{self, Terminal};

use config::Config;

// ─── Logging ────────────────────────────────────────────────────────────────

/// Install the `tracing` subscriber when a log file is configured.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened for appending.
fn init_logging(config: &Config) -> io::Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

// ─── Capture ────────────────────────────────────────────────────────────────

/// Run one capture session with the terminal guarded.
///
/// The terminal is restored before this returns, on success and on error
/// alike; the handle's `Drop` covers early returns from `enter`.
fn capture<R, W, F>(
    term: &mut Terminal,
    source: &mut R,
    out: &mut W,
    pending_signal: F,
) -> io::Result<Exit>
where
    R: Read + ?Sized,
    W: Write,
    F: Fn() -> Option<i32>,
{
    term.enter(out)?;

    let exit = Session::new().run(source, out, pending_signal);
    let restored = term.leave(out);

    let exit = exit?;
    restored?;
    Ok(exit)
}

/// [`capture`] on the process's own terminal.
fn capture_stdin() -> io::Result<Exit> {
    let mut term = if terminal::is_tty() {
        Terminal::new()?
    } else {
        Terminal::without_raw_mode()
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    capture(
        &mut term,
        &mut StdinReader::new(),
        &mut out,
        terminal::pending_signal,
    )
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let config = Config::from_env();

    if let Err(e) = init_logging(&config) {
        eprintln!("escprobe: cannot open log file: {e}");
        process::exit(1);
    }

    terminal::install_signal_handlers();

    match capture_stdin() {
        Ok(Exit::Interrupt | Exit::EndOfInput) => {}
        Ok(Exit::Signal(sig)) => {
            tracing::info!(sig, "re-raising signal");
            terminal::reraise_signal(sig);
            process::exit(128 + sig);
        }
        Err(e) => {
            eprintln!("escprobe: {e}");
            process::exit(1);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DISABLE: &str = "\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l";

    /// A sink that refuses report lines but accepts everything else.
    struct RejectsReports {
        inner: Vec<u8>,
    }

    impl Write for RejectsReports {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.starts_with(b"Non-ANSI") {
                return Err(io::ErrorKind::BrokenPipe.into());
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn assert_restored_once(out: &[u8]) {
        let text = std::str::from_utf8(out).unwrap();
        assert!(text.ends_with(DISABLE), "not restored last: {text:?}");
        assert_eq!(text.matches(DISABLE).count(), 1);
    }

    #[test]
    fn ctrl_c_restores_terminal_once() {
        let mut term = Terminal::without_raw_mode();
        let mut source: &[u8] = b"ab\x03";
        let mut out = Vec::new();
        let exit = capture(&mut term, &mut source, &mut out, || None).unwrap();
        assert_eq!(exit, Exit::Interrupt);
        assert_restored_once(&out);
    }

    #[test]
    fn write_error_still_restores_terminal() {
        let mut term = Terminal::without_raw_mode();
        let mut source: &[u8] = b"x\n";
        let mut out = RejectsReports { inner: Vec::new() };
        let err = capture(&mut term, &mut source, &mut out, || None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_restored_once(&out.inner);

        // Drop after the failed session writes nothing more.
        drop(term);
        assert_restored_once(&out.inner);
    }

    #[test]
    fn pending_signal_restores_terminal_once() {
        let mut term = Terminal::without_raw_mode();
        let mut source: &[u8] = b"never read";
        let mut out = Vec::new();
        let exit = capture(&mut term, &mut source, &mut out, || Some(15)).unwrap();
        assert_eq!(exit, Exit::Signal(15));
        assert_restored_once(&out);
    }
}
