//! Run statistics, the report, and the presentation seams
//!
//! The engine only produces data. Rendering it (colour, diffs, YAML) and
//! investigating failures interactively belong to collaborators plugged in
//! through [`Presenter`] and [`Inspector`].

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::trace::{Failure, Trace};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counts of the major events in test execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Assertions that held.
    pub pass: u64,
    /// Assertions that did not hold.
    pub fail: u64,
    /// Errors and panics nobody caught.
    pub error: u64,
    /// Wall-clock time of the most recent run.
    #[serde(serialize_with = "as_seconds")]
    pub time: Duration,
}

impl Stats {
    /// Whether nothing failed and nothing raised.
    pub fn passed(&self) -> bool {
        self.fail == 0 && self.error == 0
    }

    /// Number of terminal assertion outcomes plus errors.
    pub fn total(&self) -> u64 {
        self.pass + self.fail + self.error
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overall = if self.passed() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{:<6}pass: {:<6}fail: {:<6}error: {:<6}time: {:.3}s",
            overall,
            self.pass,
            self.fail,
            self.error,
            self.time.as_secs_f64()
        )
    }
}

fn as_seconds<S: Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Snapshot of everything a run has produced so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub trace: Trace,
    pub stats: Stats,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.stats.passed()
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Presenter / Inspector
// ---------------------------------------------------------------------------

/// Receives each failure as it is recorded, already qualified by the
/// descriptions of the tests that enclose it.
pub trait Presenter {
    fn present(&mut self, trace: &Trace);

    /// Called once at the end of every run.
    fn summary(&mut self, _stats: &Stats) {}
}

/// Interactive investigation of a failure.
///
/// `inspect` may block for as long as it likes; the run resumes when it
/// returns.
pub trait Inspector {
    fn inspect(&mut self, failure: &Failure);
}

/// Default presenter: one `tracing` event per failure, with the qualified
/// trace rendered as JSON.
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present(&mut self, trace: &Trace) {
        match serde_json::to_string(trace) {
            Ok(json) => tracing::warn!(trace = %json, "test failure"),
            Err(err) => tracing::warn!(error = %err, "test failure (trace not serializable)"),
        }
    }

    fn summary(&mut self, stats: &Stats) {
        tracing::info!(
            pass = stats.pass,
            fail = stats.fail,
            error = stats.error,
            "{}",
            stats
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
