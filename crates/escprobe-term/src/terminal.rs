// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, mouse capture, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), isatty, sigaction, and raw fd writes. These are the standard
// POSIX interfaces for terminal control — there is no safe alternative.
// Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. `Terminal::enter` snapshots
// termios, switches stdin to raw mode, and turns on mouse reporting;
// `Terminal::leave` undoes both. Restoration happens exactly once per
// session, whichever way the session ends:
//
//   - normal return / in-band Ctrl+C → caller calls `leave` (or drops)
//   - `?` propagating an I/O error    → `Drop` calls `leave`
//   - out-of-band signal               → handler records it, the blocked
//                                        read fails with EINTR, the loop
//                                        returns, `Drop` calls `leave`
//   - panic during a session           → panic hook writes the restore
//                                        bytes straight to fd 1 and marks
//                                        the live sessions restored, so the
//                                        unwinding `Drop` does nothing
//
// Output post-processing (OPOST) stays on: report lines end in a plain
// `\n` and must still return the carriage.

use std::io::{self, Write};
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use tracing::{info, warn};

use crate::ansi;

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Terminal`] struct owns its own copy, but the panic hook can't
/// access it. This global backup — behind a [`Mutex`], not `static mut` —
/// lets the hook restore cooked mode without the struct.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Who restores the terminal: the session's own `leave`, or the panic hook.
///
/// `enter` registers a session and remembers the current restore epoch.
/// The panic hook restores only while at least one session is live, then
/// bumps the epoch and forgets the live sessions. `leave` restores only if
/// the epoch is unchanged since its `enter`, so every session is restored
/// exactly once, and a panic outside any session restores nothing.
#[derive(Debug)]
struct RestoreLedger {
    /// Sessions between `enter` and `leave`.
    live: AtomicUsize,
    /// Number of restores performed by the panic hook.
    epoch: AtomicU64,
}

impl RestoreLedger {
    const fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    /// Register a session; returns the epoch to hand back to [`leave`](Self::leave).
    fn enter(&self) -> u64 {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.epoch.load(Ordering::SeqCst)
    }

    /// Unregister a session. `true` if the caller still has to restore.
    fn leave(&self, entered: u64) -> bool {
        if self.epoch.load(Ordering::SeqCst) != entered {
            return false;
        }
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        true
    }

    /// Claim the restore for the panic hook. `true` if a session was live.
    fn claim_for_panic(&self) -> bool {
        if self.live.swap(0, Ordering::SeqCst) == 0 {
            return false;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        true
    }
}

static RESTORE_LEDGER: RestoreLedger = RestoreLedger::new();

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
        if let Some(original) = guard.take() {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw const original);
            }
        }
    }
}

/// Mouse-disable sequence for emergency use, identical to
/// [`ansi::disable_mouse`] output.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Only acts while a session is live. Writes [`EMERGENCY_RESTORE`] directly to fd 1 (bypassing Rust's stdout
/// lock to avoid deadlock), restores termios, then delegates to the
/// original panic handler so the message lands on a working terminal.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if RESTORE_LEDGER.claim_for_panic() {
                emergency_restore();

                #[cfg(unix)]
                restore_termios_from_backup();
            }

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Signals ────────────────────────────────────────────────────────────────

/// Signal number recorded by the handler, 0 when none is pending.
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Signals that end a session out of band.
///
/// Raw mode clears `ISIG`, so the keyboard never generates these; they
/// arrive from `kill`, a closing terminal, or a parent process.
#[cfg(unix)]
pub const CAPTURED_SIGNALS: [libc::c_int; 4] =
    [libc::SIGINT, libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT];

/// Install handlers for [`CAPTURED_SIGNALS`].
///
/// The handler only stores the signal number — writing to an atomic is
/// async-signal-safe. `SA_RESTART` is *not* set: a blocked
/// `read()` on stdin must fail with `EINTR` so the read loop can return
/// and let the terminal guard clean up.
#[cfg(unix)]
pub fn install_signal_handlers() {
    for sig in CAPTURED_SIGNALS {
        unsafe {
            let mut sa: libc::sigaction = std::mem::zeroed();
            sa.sa_sigaction = capture_signal as *const () as usize;
            sa.sa_flags = 0;
            libc::sigemptyset(&raw mut sa.sa_mask);
            libc::sigaction(sig, &raw const sa, std::ptr::null_mut());
        }
    }
}

#[cfg(not(unix))]
pub fn install_signal_handlers() {}

#[cfg(unix)]
extern "C" fn capture_signal(sig: libc::c_int) {
    PENDING_SIGNAL.store(sig, Ordering::SeqCst);
}

/// The signal recorded since the handlers were installed, if any.
#[must_use]
pub fn pending_signal() -> Option<i32> {
    match PENDING_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Re-deliver `sig` with its default disposition.
///
/// Called after the terminal has been restored, so the process dies the
/// way it would have without our handler. Returns only if the default
/// action does not terminate (the caller should then exit on its own).
#[cfg(unix)]
pub fn reraise_signal(sig: i32) {
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

#[cfg(not(unix))]
pub fn reraise_signal(_sig: i32) {}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// Call [`enter`](Self::enter) to switch stdin to raw mode and turn on
/// mouse reporting. The terminal is restored by [`leave`](Self::leave) or,
/// failing that, when the handle is dropped — even on panic.
///
/// # Example
///
/// ```no_run
/// use escprobe_term::terminal::Terminal;
///
/// let mut out = std::io::stdout();
/// let mut term = Terminal::new()?;
/// term.enter(&mut out)?;
/// // ... read and classify input ...
/// term.leave(&mut out)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Whether `enter` switches stdin to raw mode.
    raw_mode: bool,

    /// Whether mouse capture is on and raw mode may be engaged.
    active: bool,

    /// Restore epoch recorded by `enter`.
    epoch: u64,
}

impl Terminal {
    /// Create an inactive terminal handle.
    ///
    /// # Errors
    ///
    /// Currently infallible, but returns `Result` for forward compatibility
    /// (e.g., Windows console API initialization).
    pub const fn new() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            original_termios: None,
            raw_mode: true,
            active: false,
            epoch: 0,
        })
    }

    /// Create a handle that only toggles mouse capture.
    ///
    /// Stdin keeps whatever mode it is in. Used when stdin is not a
    /// terminal, where there are no termios settings to change.
    #[must_use]
    pub const fn without_raw_mode() -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            raw_mode: false,
            active: false,
            epoch: 0,
        }
    }

    /// Start a capture session.
    ///
    /// Enables raw mode (only when stdin is a TTY), then writes the four
    /// mouse-enable sequences to `w` and flushes. Idempotent: calling
    /// `enter()` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the termios calls or the write fail. If raw mode
    /// was engaged before the write failed, the handle stays active so that
    /// dropping it still restores the terminal.
    pub fn enter(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();

        self.enable_raw_mode()?;
        self.active = true;
        self.epoch = RESTORE_LEDGER.enter();

        ansi::enable_mouse(w)?;
        w.flush()?;

        info!(raw = self.is_raw(), "terminal capture started");
        Ok(())
    }

    /// End the capture session and restore the terminal.
    ///
    /// Writes the mouse-disable sequences to `w`, then restores the saved
    /// termios. Both steps are attempted even if the first fails; the first
    /// error is returned. Idempotent: the restore runs at most once per
    /// `enter()`, and not at all if the panic hook already did it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` or the termios restore fails.
    pub fn leave(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        if !RESTORE_LEDGER.leave(self.epoch) {
            // Already restored by the panic hook.
            self.forget_raw_mode();
            return Ok(());
        }

        let written = ansi::disable_mouse(w).and_then(|()| w.flush());
        let restored = self.disable_raw_mode();

        info!("terminal capture ended");
        written.and(restored)
    }

    /// Whether stdin is currently switched to raw mode by this handle.
    #[cfg(unix)]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.original_termios.is_some()
    }

    #[cfg(not(unix))]
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        false
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if !self.raw_mode || !is_tty() {
            return Ok(());
        }

        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            // Save original for restore.
            self.original_termios = Some(termios);

            // Also save to global backup for the panic hook.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            // cfmakeraw minus OPOST: no line editing, no echo, no signal
            // keys, no CR/NL translation on input.
            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_lflag &=
                !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;

            // VMIN=1, VTIME=0: read() blocks until at least 1 byte available.
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(original) = self.original_termios.take() {
            use std::os::unix::io::AsRawFd;
            let fd = io::stdin().as_raw_fd();

            // Clear the global backup first; the panic hook must not
            // restore a second time.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            unsafe {
                if libc::tcsetattr(fd, libc::TCSADRAIN, &raw const original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Drop the termios snapshot without applying it.
    #[cfg(unix)]
    fn forget_raw_mode(&mut self) {
        self.original_termios = None;
    }

    #[cfg(not(unix))]
    fn forget_raw_mode(&mut self) {}
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.leave(&mut io::stdout()) {
                warn!(error = %e, "terminal restore on drop failed");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ENABLE: &str = "\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h";
    const DISABLE: &str = "\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l";

    fn text(buf: &[u8]) -> &str {
        std::str::from_utf8(buf).unwrap()
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_matches_disable_mouse() {
        let mut buf = Vec::new();
        ansi::disable_mouse(&mut buf).unwrap();
        assert_eq!(EMERGENCY_RESTORE, buf.as_slice());
    }

    // ── Restore ledger ──────────────────────────────────────────────

    #[test]
    fn session_restores_itself_without_panic() {
        let ledger = RestoreLedger::new();
        let epoch = ledger.enter();
        assert!(ledger.leave(epoch));
        assert_eq!(ledger.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panic_outside_session_restores_nothing() {
        let ledger = RestoreLedger::new();
        assert!(!ledger.claim_for_panic());

        let epoch = ledger.enter();
        assert!(ledger.leave(epoch));
        // A panic after the session ended must not write the restore again.
        assert!(!ledger.claim_for_panic());
    }

    #[test]
    fn panic_during_session_restores_once() {
        let ledger = RestoreLedger::new();
        let first = ledger.enter();
        let second = ledger.enter();
        assert!(ledger.claim_for_panic());
        assert!(!ledger.claim_for_panic());
        assert!(!ledger.leave(first));
        assert!(!ledger.leave(second));
    }

    #[test]
    fn sessions_after_a_panic_restore_normally() {
        let ledger = RestoreLedger::new();
        let epoch = ledger.enter();
        assert!(ledger.claim_for_panic());
        assert!(!ledger.leave(epoch));

        let epoch = ledger.enter();
        assert!(ledger.leave(epoch));
    }

    // ── Signals ─────────────────────────────────────────────────────

    #[test]
    fn no_signal_pending_by_default() {
        assert_eq!(pending_signal(), None);
    }

    #[cfg(unix)]
    #[test]
    fn captured_signals_cover_interrupt_and_terminate() {
        assert!(CAPTURED_SIGNALS.contains(&libc::SIGINT));
        assert!(CAPTURED_SIGNALS.contains(&libc::SIGTERM));
    }

    // ── Terminal struct ─────────────────────────────────────────────

    #[test]
    fn terminal_new_is_inactive() {
        let term = Terminal::new().unwrap();
        assert!(!term.active);
        assert!(!term.is_raw());
    }

    #[test]
    fn without_raw_mode_never_engages_raw() {
        let mut term = Terminal::without_raw_mode();
        term.enter(&mut Vec::new()).unwrap();
        assert!(!term.is_raw());
        term.leave(&mut Vec::new()).unwrap();
    }

    #[test]
    fn enter_writes_enable_sequences() {
        let mut term = Terminal::without_raw_mode();
        let mut out = Vec::new();
        term.enter(&mut out).unwrap();
        assert!(term.active);
        assert_eq!(text(&out), ENABLE);
        term.leave(&mut out).unwrap();
    }

    #[test]
    fn leave_writes_disable_sequences_once() {
        let mut term = Terminal::without_raw_mode();
        let mut out = Vec::new();
        term.enter(&mut Vec::new()).unwrap();
        term.leave(&mut out).unwrap();
        term.leave(&mut out).unwrap();
        assert!(!term.active);
        assert_eq!(text(&out), DISABLE);
    }

    #[test]
    fn double_enter_is_idempotent() {
        let mut term = Terminal::without_raw_mode();
        let mut out = Vec::new();
        term.enter(&mut out).unwrap();
        term.enter(&mut out).unwrap();
        assert_eq!(text(&out), ENABLE);
        term.leave(&mut Vec::new()).unwrap();
    }

    #[test]
    fn leave_without_enter_writes_nothing() {
        let mut term = Terminal::without_raw_mode();
        let mut out = Vec::new();
        term.leave(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn multiple_cycles() {
        let mut term = Terminal::without_raw_mode();
        let mut out = Vec::new();
        for _ in 0..3 {
            term.enter(&mut out).unwrap();
            term.leave(&mut out).unwrap();
        }
        assert_eq!(text(&out), format!("{ENABLE}{DISABLE}").repeat(3));
    }

    #[test]
    fn enter_after_failed_write_stays_active_for_drop() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut term = Terminal::without_raw_mode();
        assert!(term.enter(&mut Broken).is_err());
        assert!(term.active);

        let mut out = Vec::new();
        term.leave(&mut out).unwrap();
        assert_eq!(text(&out), DISABLE);
    }
}
