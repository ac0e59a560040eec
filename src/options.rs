//! Engine options

use std::io::IsTerminal;

/// Environment variable that enables interactive inspection on failure.
pub const DEBUG_ENV: &str = "NESTEST_DEBUG";

/// Environment variable that suppresses automatic trace presentation.
pub const QUIET_ENV: &str = "NESTEST_QUIET";

/// Choices that affect how the engine operates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Hand each failure to the installed inspector and block until it
    /// returns, so the failure can be investigated interactively.
    pub debug: bool,
    /// Do not present failures as they happen, nor the summary after a run.
    pub quiet: bool,
}

impl Options {
    /// Options read from `NESTEST_DEBUG` / `NESTEST_QUIET`.
    ///
    /// Debugging stays off when stdin is not a terminal, since nobody would
    /// be there to resume the run.
    pub fn from_env() -> Self {
        let debug = env_flag(DEBUG_ENV) && std::io::stdin().is_terminal();
        Self {
            debug,
            quiet: env_flag(QUIET_ENV),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
