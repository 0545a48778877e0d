// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Unbuffered stdin — one `read(2)` per call, straight from fd 0.
//
// `std::io::Stdin` wraps the descriptor in a `BufReader` and retries
// reads that fail with `EINTR`. Neither fits here: buffering would
// hide how bytes arrive, and retrying would swallow the interruption a
// signal handler uses to pull the read loop out of a blocking read.
// `StdinReader` goes to the descriptor directly and reports `EINTR` as
// `io::ErrorKind::Interrupted`, leaving the retry decision to the caller.

use std::io::{self, Read};

/// Raw, unbuffered reader over the process's standard input.
///
/// # Example
///
/// ```no_run
/// use std::io::Read;
/// use escprobe_term::reader::StdinReader;
///
/// let mut stdin = StdinReader::new();
/// let mut byte = [0u8; 1];
/// if stdin.read(&mut byte)? == 1 {
///     println!("got {:#04x}", byte[0]);
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct StdinReader {
    _private: (),
}

impl StdinReader {
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl Read for StdinReader {
    /// Blocks until at least one byte is available (raw mode uses
    /// `VMIN=1, VTIME=0`), end of input, or a signal interrupts the call.
    #[cfg(unix)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                buf.as_mut_ptr().cast::<libc::c_void>(),
                buf.len(),
            )
        };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    /// Non-unix fallback through the standard handle.
    ///
    /// Buffered and retries on interruption, but functional.
    #[cfg(not(unix))]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }
}
