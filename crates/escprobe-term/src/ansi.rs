// SPDX-License-Identifier: MIT
//
// Mouse-reporting mode sequences.
//
// Pure functions that write DEC private mode set/reset sequences to any
// `impl Write`. No state, no decisions about when to emit — that's the
// `Terminal`'s job. This module only knows which modes we toggle and how
// they are encoded on the wire.
//
// Enable and disable walk the same table in the same order, so the four
// modes always come back off in exactly the order they went on.
use std::io::{self, Write};

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// A DEC private mode that controls mouse reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Report button press and release events (DEC 1000).
    Click,
    /// Report motion while a button is held (DEC 1002).
    Drag,
    /// urxvt-style decimal coordinates (DEC 1015).
    Urxvt,
    /// SGR-style coordinates with distinct press/release finals (DEC 1006).
    Sgr,
}

impl MouseMode {
    /// The DEC private mode number.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Click => 1000,
            Self::Drag => 1002,
            Self::Urxvt => 1015,
            Self::Sgr => 1006,
        }
    }
}

/// Every mode the probe turns on, in emission order.
pub const MOUSE_MODES: [MouseMode; 4] = [
    MouseMode::Click,
    MouseMode::Drag,
    MouseMode::Urxvt,
    MouseMode::Sgr,
];

/// Set a single DEC private mode (`CSI ? n h`).
#[inline]
pub fn set_mode(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    write!(w, "\x1b[?{}h", mode.code())
}

/// Reset a single DEC private mode (`CSI ? n l`).
#[inline]
pub fn reset_mode(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    write!(w, "\x1b[?{}l", mode.code())
}

/// Enable click, drag, urxvt and SGR mouse reporting.
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    for mode in MOUSE_MODES {
        set_mode(w, mode)?;
    }
    Ok(())
}

/// Disable the modes turned on by [`enable_mouse`], in the same order.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    for mode in MOUSE_MODES {
        reset_mode(w, mode)?;
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Single modes ────────────────────────────────────────────────────

    #[test]
    fn mode_codes() {
        assert_eq!(MouseMode::Click.code(), 1000);
        assert_eq!(MouseMode::Drag.code(), 1002);
        assert_eq!(MouseMode::Urxvt.code(), 1015);
        assert_eq!(MouseMode::Sgr.code(), 1006);
    }

    #[test]
    fn set_mode_sequence() {
        assert_eq!(emit(|w| set_mode(w, MouseMode::Sgr)), "\x1b[?1006h");
    }

    #[test]
    fn reset_mode_sequence() {
        assert_eq!(emit(|w| reset_mode(w, MouseMode::Urxvt)), "\x1b[?1015l");
    }

    // ── Mouse capture ───────────────────────────────────────────────────

    #[test]
    fn enable_mouse_writes_all_modes_in_order() {
        assert_eq!(
            emit(|w| enable_mouse(w)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h"
        );
    }

    #[test]
    fn disable_mouse_mirrors_enable_order() {
        assert_eq!(
            emit(|w| disable_mouse(w)),
            "\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l"
        );
    }

    #[test]
    fn enable_and_disable_are_the_same_length() {
        assert_eq!(emit(|w| enable_mouse(w)).len(), emit(|w| disable_mouse(w)).len());
    }
}
