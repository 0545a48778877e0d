//! Capture session — the read loop.
//!
//! One byte per `read` call from any [`Read`] source, through the
//! [`Utf8Decoder`] into the [`Classifier`], with every report written to any
//! [`Write`] sink as one line and flushed immediately.
//!
//! The loop has a single suspension point, the blocking read. It ends when:
//!
//! - the classifier sees Ctrl+C → [`Exit::Interrupt`]
//! - the source reports end of input → [`Exit::EndOfInput`], after draining
//!   the buffer as a final text line
//! - a signal is pending → [`Exit::Signal`]
//!
//! Pending signals are checked before every read, so one that lands while a
//! byte is classified or a report is written is seen on the next iteration.
//! Interrupted reads loop back to that check.
//! Every other I/O error is returned to the caller.

use std::io::{self, Read, Write};

use tracing::{debug, info};

use crate::classify::{Classifier, Report, Step};
use crate::utf8::Utf8Decoder;

/// First line of every session.
pub const PROMPT: &str = "Press keys or use mouse (Ctrl+C to exit):";

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Ctrl+C arrived in band.
    Interrupt,
    /// The source returned zero bytes.
    EndOfInput,
    /// A signal arrived out of band.
    Signal(i32),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Decoder and classifier state for one capture session.
#[derive(Debug, Default)]
pub struct Session {
    decoder: Utf8Decoder,
    classifier: Classifier,
    /// Number of report lines written so far.
    reports: usize,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            classifier: Classifier::new(),
            reports: 0,
        }
    }

    /// Print the prompt, then read and classify until the session ends.
    ///
    /// `pending_signal` is consulted before every read and after every
    /// interrupted one.
    ///
    /// # Errors
    ///
    /// Returns the first read or write error other than an interrupted
    /// read.
    pub fn run<R, W, F>(
        &mut self,
        source: &mut R,
        out: &mut W,
        pending_signal: F,
    ) -> io::Result<Exit>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        F: Fn() -> Option<i32>,
    {
        writeln!(out, "{PROMPT}")?;
        out.flush()?;
        info!("session started");

        let exit = self.read_loop(source, out, pending_signal)?;

        info!(?exit, reports = self.reports, "session ended");
        Ok(exit)
    }

    fn read_loop<R, W, F>(
        &mut self,
        source: &mut R,
        out: &mut W,
        pending_signal: F,
    ) -> io::Result<Exit>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        F: Fn() -> Option<i32>,
    {
        let mut byte = [0u8; 1];
        let mut chars = Vec::with_capacity(2);

        loop {
            if let Some(sig) = pending_signal() {
                return Ok(Exit::Signal(sig));
            }

            match source.read(&mut byte) {
                Ok(0) => {
                    self.finish(out)?;
                    return Ok(Exit::EndOfInput);
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            chars.clear();
            self.decoder.push(byte[0], &mut chars);
            for &ch in &chars {
                match self.classifier.push(ch) {
                    Step::Pending => {}
                    Step::Reported(reports) => self.write_reports(out, &reports)?,
                    Step::Interrupt => return Ok(Exit::Interrupt),
                }
            }
        }
    }

    /// Drain a partial character and the buffer at end of input.
    fn finish<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        if let Some(ch) = self.decoder.flush() {
            if let Step::Reported(reports) = self.classifier.push(ch) {
                self.write_reports(out, &reports)?;
            }
        }
        if let Some(report) = self.classifier.finish() {
            self.write_reports(out, &[report])?;
        }
        Ok(())
    }

    fn write_reports<W>(&mut self, out: &mut W, reports: &[Report]) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        for report in reports {
            debug!(%report, "report");
            writeln!(out, "{report}")?;
            self.reports += 1;
        }
        out.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
