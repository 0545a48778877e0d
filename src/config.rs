// SPDX-License-Identifier: MIT
//
// Runtime configuration — environment only.
//
// escprobe takes no flags: everything on stdin is data. The only knobs are
// for logging, and both live in the environment:
//
//   ESCPROBE_LOG_FILE   path to append log lines to (unset: no logging)
//   ESCPROBE_LOG        max level: error | warn | info | debug | trace
//
// Logging never goes to stdout or stderr — both belong to the terminal
// under capture.

use std::env;
use std::path::PathBuf;

use tracing::Level;

/// Environment variable naming the log file.
pub const LOG_FILE_VAR: &str = "ESCPROBE_LOG_FILE";

/// Environment variable holding the maximum log level.
pub const LOG_LEVEL_VAR: &str = "ESCPROBE_LOG";

/// Level used when [`LOG_LEVEL_VAR`] is unset or unparsable.
pub const DEFAULT_LOG_LEVEL: Level = Level::INFO;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where log lines go; `None` disables logging entirely.
    pub log_file: Option<PathBuf>,
    /// Most verbose level recorded.
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key → value lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_file = lookup(LOG_FILE_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let log_level = lookup(LOG_LEVEL_VAR)
            .and_then(|level| level.trim().parse().ok())
            .unwrap_or(DEFAULT_LOG_LEVEL);

        Self {
            log_file,
            log_level,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
