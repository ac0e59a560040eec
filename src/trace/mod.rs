//! Hierarchical failure traces
//!
//! A [`Trace`] is the record of one nesting level: failures and logged values
//! in the order they happened, interleaved with one [`Entry::Test`] per test
//! that ran at that level, which in turn holds that test's own trace. The
//! shape therefore mirrors the test declarations that produced it.
//!
//! [`FailureBuilder`] turns a failing assertion or an uncaught error into a
//! [`Failure`]: message, source window, sandbox snapshot, filtered call stack.

mod capture;
mod source;

pub use capture::{panic_message, CallStack, Frame, Origin};
pub use source::{SourceCache, RADIUS};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::sandbox::Sandbox;

/// Width at which variable renderings are cut in a snapshot.
pub const VARIABLE_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Whether a record comes from an assertion or from an error nobody caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Assertion,
    Error,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Assertion => write!(f, "FAIL"),
            FailureKind::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured capture of one failing assertion or uncaught error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// Description of the failure.
    pub fail: String,
    pub kind: FailureKind,
    /// Where in test code the failure happened, as `file:line`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    /// Extra labelled details (compared values, the raised error, a diff).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
    /// Source code surrounding the point of failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Sandbox variables visible at the point of failure.
    pub vars: BTreeMap<String, String>,
    /// Filtered call stack leading to the point of failure.
    pub call: Vec<String>,
}

impl Failure {
    /// A bare record with only a message.
    pub fn new(kind: FailureKind, fail: impl Into<String>) -> Self {
        Self {
            fail: fail.into(),
            kind,
            at: None,
            notes: BTreeMap::new(),
            code: None,
            vars: BTreeMap::new(),
            call: Vec::new(),
        }
    }

    /// The same record without variables and call stack, for quick display
    /// before handing control to an interactive inspector.
    pub fn overview(&self) -> Self {
        Self {
            vars: BTreeMap::new(),
            call: Vec::new(),
            ..self.clone()
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == FailureKind::Error
    }

    /// Whether the message or any note contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.fail.contains(needle) || self.notes.values().any(|note| note.contains(needle))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.fail)?;
        if let Some(at) = &self.at {
            write!(f, " at {}", at)?;
        }
        for (label, note) in &self.notes {
            write!(f, "\n  {}: {}", label, note)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// One element of a trace level.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Failure(Failure),
    /// A value recorded through the logging primitive.
    Log(serde_json::Value),
    /// A test that ran at this level and everything recorded inside it.
    Test { description: String, trace: Trace },
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Failure(failure) => failure.serialize(serializer),
            Entry::Log(value) => value.serialize(serializer),
            Entry::Test { description, trace } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(description, trace)?;
                map.end()
            }
        }
    }
}

/// The record of one nesting level, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    pub entries: Vec<Entry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Wrap `details` under each description of `path`, outermost first.
    pub fn qualified(path: &[String], details: Trace) -> Trace {
        path.iter().rev().fold(details, |inner, description| Trace {
            entries: vec![Entry::Test {
                description: description.clone(),
                trace: inner,
            }],
        })
    }

    /// The nested trace of the test called `description` at this level.
    pub fn test(&self, description: &str) -> Option<&Trace> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Test {
                description: d,
                trace,
            } if d == description => Some(trace),
            _ => None,
        })
    }

    /// Follow a path of descriptions down the tree.
    pub fn at_path(&self, path: &[&str]) -> Option<&Trace> {
        path.iter().try_fold(self, |level, description| level.test(description))
    }

    /// Descriptions of the tests recorded directly at this level.
    pub fn descriptions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Test { description, .. } => Some(description.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Failures recorded directly at this level.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Failure(failure) => Some(failure),
            _ => None,
        })
    }

    /// Every failure in this trace and below it, paired with the path of
    /// test descriptions that leads to it.
    pub fn all_failures(&self) -> Vec<(Vec<String>, &Failure)> {
        let mut found = Vec::new();
        self.collect_failures(&mut Vec::new(), &mut found);
        found
    }

    fn collect_failures<'a>(
        &'a self,
        path: &mut Vec<String>,
        found: &mut Vec<(Vec<String>, &'a Failure)>,
    ) {
        for entry in &self.entries {
            match entry {
                Entry::Failure(failure) => found.push((path.clone(), failure)),
                Entry::Log(_) => {}
                Entry::Test { description, trace } => {
                    path.push(description.clone());
                    trace.collect_failures(path, found);
                    path.pop();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FailureBuilder
// ---------------------------------------------------------------------------

/// Collects the context of a failure and turns it into a [`Failure`].
#[derive(Debug)]
pub struct FailureBuilder {
    failure: Failure,
    origin: Option<Origin>,
    stack: CallStack,
}

impl FailureBuilder {
    pub fn new(kind: FailureKind, fail: impl Into<String>) -> Self {
        Self {
            failure: Failure::new(kind, fail),
            origin: None,
            stack: CallStack::default(),
        }
    }

    /// Replace the description given to [`FailureBuilder::new`].
    pub fn fail(mut self, fail: impl Into<String>) -> Self {
        self.failure.fail = fail.into();
        self
    }

    pub fn note(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.failure.notes.insert(label.into(), text.into());
        self
    }

    /// Point of failure; when unset the first external frame is used.
    pub fn origin(mut self, origin: Option<Origin>) -> Self {
        self.origin = origin;
        self
    }

    pub fn stack(mut self, stack: CallStack) -> Self {
        self.stack = stack;
        self
    }

    /// Snapshot the variables of `context`.
    ///
    /// A sandbox that is mutably borrowed by the failing code is skipped.
    pub fn context(mut self, context: Option<&std::cell::RefCell<Sandbox>>) -> Self {
        if let Some(sandbox) = context.and_then(|cell| cell.try_borrow().ok()) {
            self.failure.vars = sandbox.snapshot(VARIABLE_WIDTH);
        }
        self
    }

    /// Resolve the source window and produce the record.
    pub fn build(mut self, sources: &mut SourceCache) -> Failure {
        let origin = self.origin.or_else(|| self.stack.first_origin().cloned());
        if let Some(origin) = origin {
            self.failure.code = sources.snippet(Path::new(&origin.file), origin.line as usize);
            self.failure.at = Some(origin.to_string());
        }
        self.failure.call = self.stack.lines();
        self.failure
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
