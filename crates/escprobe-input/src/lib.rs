//! # escprobe-input — Input classification for escprobe
//!
//! - **[`utf8`]** — incremental byte → `char` decoder
//! - **[`classify`]** — the buffer-and-rescan classifier that splits input
//!   into escape sequences and plain text
//! - **[`quote`]** — escaped, quoted rendering used in report lines
//! - **[`session`]** — the read loop tying a byte source to a report sink

pub mod classify;
pub mod quote;
pub mod session;
pub mod utf8;
