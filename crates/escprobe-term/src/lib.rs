// SPDX-License-Identifier: MIT
//
// escprobe-term — terminal control for escprobe.
//
// Direct termios and ANSI control with no TUI framework in between:
// enter raw mode, turn on every mouse-reporting protocol we want to
// observe, hand out an unbuffered stdin byte source, and put the terminal
// back exactly once however the process leaves.

pub mod ansi;
pub mod reader;
pub mod terminal;
