//! Quoted, escaped rendering of captured input.
//!
//! Report lines must show control bytes without the terminal acting on them,
//! so everything unprintable is spelled out:
//!
//! | Input            | Rendered          |
//! |------------------|-------------------|
//! | `\`              | `\\`              |
//! | the quote char   | `\'` or `\"`      |
//! | tab, LF, CR      | `\t`, `\n`, `\r`  |
//! | other controls   | `\x1b`, `\x7f`, … |
//!
//! The text is wrapped in single quotes, or double quotes when it contains a
//! single quote and no double quote. `ESC [ < 0 ; 1 0 ; 2 0 M` renders as
//! `'\x1b[<0;10;20M'`.

use std::fmt::Write;

/// Render `text` as a quoted literal with control characters escaped.
#[must_use]
pub fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => push_hex_escape(&mut out, c),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Append `\xNN`. Control characters (C0, DEL, C1) all fit in one byte.
fn push_hex_escape(out: &mut String, ch: char) {
    // Writing into a String cannot fail.
    let _ = write!(out, "\\x{:02x}", u32::from(ch));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text() {
        assert_eq!(quote("ABC"), "'ABC'");
    }

    #[test]
    fn empty_text() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn escape_byte_is_hex() {
        assert_eq!(quote("\x1b[<0;10;20M"), "'\\x1b[<0;10;20M'");
    }

    #[test]
    fn short_escapes() {
        assert_eq!(quote("a\tb\nc\r"), "'a\\tb\\nc\\r'");
    }

    #[test]
    fn ctrl_c_and_del() {
        assert_eq!(quote("\x03\x7f"), "'\\x03\\x7f'");
    }

    #[test]
    fn backslash_is_doubled() {
        assert_eq!(quote("\\"), "'\\\\'");
    }

    #[test]
    fn single_quote_switches_delimiter() {
        assert_eq!(quote("it's"), "\"it's\"");
    }

    #[test]
    fn both_quotes_escape_single() {
        assert_eq!(quote("'\""), "'\\'\"'");
    }

    #[test]
    fn c1_control_is_hex() {
        assert_eq!(quote("\u{9b}"), "'\\x9b'");
    }

    #[test]
    fn highest_control_is_one_byte_escape() {
        assert_eq!(quote("\u{9f}"), "'\\x9f'");
    }

    #[test]
    fn format_characters_are_not_escaped() {
        // Only Cc is escaped; zero-width and bidi marks pass through.
        assert_eq!(quote("a\u{200b}\u{200e}"), "'a\u{200b}\u{200e}'");
    }

    #[test]
    fn printable_unicode_is_kept() {
        assert_eq!(quote("é€\u{FFFD}"), "'é€\u{FFFD}'");
    }
}
