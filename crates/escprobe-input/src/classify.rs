//! Input classifier — escape sequences versus plain text.
//!
//! Characters are appended to a short buffer. After every append the whole
//! buffer is rescanned for an escape sequence:
//!
//! ```text
//! ESC ( [@-Z\-_]                      two-character escape (ESC O, ESC \, …)
//!     | '[' [0-?]* [ -/]* [@-~] )     CSI: params, intermediates, final
//! ```
//!
//! # Per-character rules, in priority order
//!
//! 1. Buffer contains a match → report every non-overlapping match, clear
//!    the buffer. Characters outside the matches are dropped.
//! 2. Character is `0x03` (Ctrl+C) → [`Step::Interrupt`].
//! 3. Character is `\n` or `\r` → report the text before it (if any), clear.
//! 4. Buffer exceeds [`OVERFLOW_LEN`] characters → report it, clear.
//! 5. Otherwise keep accumulating.
//!
//! The order matters: a completed escape sequence wins over every other rule
//! in the same step.
//!
//! # Split sequences
//!
//! A CSI sequence still missing its final byte when the buffer reaches the
//! overflow length is flushed as text, and its tail arrives as more text.
//! Long SGR mouse reports with large coordinates can hit this. The behavior
//! is kept as is; such flushes are logged at `debug` level.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The escape sequence grammar matched against the buffer.
pub const ESCAPE_PATTERN: &str = r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])";

/// A buffer longer than this many characters is flushed as text.
pub const OVERFLOW_LEN: usize = 20;

/// The in-band interrupt character (Ctrl+C with `ISIG` off).
pub const INTERRUPT: char = '\x03';

/// ASCII ESC, the first character of every escape sequence.
const ESC: char = '\x1b';

static ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ESCAPE_PATTERN).expect("escape pattern is valid"));

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One classified piece of input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    /// A complete escape sequence, ESC included.
    Escape(String),
    /// Text flushed by a line terminator, overflow, or end of input.
    Text(String),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escape(s) => write!(f, "ANSI sequence: {}", crate::quote::quote(s)),
            Self::Text(s) => write!(f, "Non-ANSI input: {}", crate::quote::quote(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// What pushing one character produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Nothing to report yet.
    Pending,
    /// One or more reports; the buffer is now empty.
    Reported(Vec<Report>),
    /// Ctrl+C: the session should end.
    Interrupt,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Buffer-and-rescan classifier.
#[derive(Debug)]
pub struct Classifier {
    buffer: String,
    /// Character count of `buffer`.
    len: usize,
}

impl Classifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(64),
            len: 0,
        }
    }

    /// Append one character and apply the classification rules.
    pub fn push(&mut self, ch: char) -> Step {
        trace!(ch = ?ch, "input");
        self.buffer.push(ch);
        self.len += 1;

        if ESCAPE.is_match(&self.buffer) {
            let reports = ESCAPE
                .find_iter(&self.buffer)
                .map(|m| Report::Escape(m.as_str().to_owned()))
                .collect();
            self.clear();
            return Step::Reported(reports);
        }

        if ch == INTERRUPT {
            return Step::Interrupt;
        }

        if ch == '\n' || ch == '\r' {
            self.buffer.pop();
            self.len -= 1;
            let line = self.take();
            return match line {
                Some(text) => Step::Reported(vec![Report::Text(text)]),
                None => Step::Pending,
            };
        }

        if self.len > OVERFLOW_LEN {
            if self.buffer.contains(ESC) {
                debug!(buffer = ?self.buffer, "overflow flush may split an escape sequence");
            }
            return self
                .take()
                .map_or(Step::Pending, |text| Step::Reported(vec![Report::Text(text)]));
        }

        Step::Pending
    }

    /// Drain whatever is buffered as a final text report.
    pub fn finish(&mut self) -> Option<Report> {
        self.take().map(Report::Text)
    }

    fn take(&mut self) -> Option<String> {
        self.len = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.len = 0;
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
