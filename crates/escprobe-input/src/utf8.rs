//! Incremental UTF-8 decoding, one byte at a time.
//!
//! The classifier counts and matches *characters*, but the terminal hands us
//! bytes. [`Utf8Decoder`] holds the lead byte and continuation bytes of a
//! partial character until it is complete.
//!
//! Malformed input never stalls the stream: an invalid lead byte, a missing
//! continuation byte, or an overlong/surrogate encoding each produce one
//! U+FFFD, and a byte that broke a sequence is re-read as a fresh lead.

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Streaming byte → `char` decoder.
#[derive(Debug)]
pub struct Utf8Decoder {
    /// Bytes of the character being assembled (at most 4).
    pending: Vec<u8>,
    /// Total length of that character, taken from its lead byte.
    expected: usize,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(4),
            expected: 0,
        }
    }

    /// Feed one byte and collect every character it completes.
    ///
    /// Usually yields zero or one character. Yields two when a byte
    /// interrupts a partial sequence: the replacement for the abandoned
    /// sequence, then (if the byte is ASCII) the byte itself.
    pub fn push(&mut self, byte: u8, out: &mut Vec<char>) {
        if self.pending.is_empty() {
            self.start(byte, out);
            return;
        }

        if byte & 0xC0 != 0x80 {
            // Not a continuation byte: the partial character is lost.
            self.reset();
            out.push(char::REPLACEMENT_CHARACTER);
            self.start(byte, out);
            return;
        }

        self.pending.push(byte);
        if self.pending.len() == self.expected {
            let ch = std::str::from_utf8(&self.pending)
                .ok()
                .and_then(|s| s.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            self.reset();
            out.push(ch);
        }
    }

    /// Abandon any partial character, returning U+FFFD if there was one.
    pub fn flush(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            None
        } else {
            self.reset();
            Some(char::REPLACEMENT_CHARACTER)
        }
    }

    fn start(&mut self, byte: u8, out: &mut Vec<char>) {
        match char_len(byte) {
            0 => out.push(char::REPLACEMENT_CHARACTER),
            1 => out.push(char::from(byte)),
            n => {
                self.pending.push(byte);
                self.expected = n;
            }
        }
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.expected = 0;
    }
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encoded length implied by a lead byte, 0 if it cannot start a character.
const fn char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
