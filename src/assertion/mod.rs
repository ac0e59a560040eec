//! Assertion engine
//!
//! Every assertion family comes in three modes. `engine.assert()` and
//! `engine.negate()` hand out a [`Check`] whose methods count a pass or a
//! fail and record a [`Failure`](crate::trace::Failure) when the expectation
//! does not hold. The sample forms (`engine.is_truthy(..)` and friends) only
//! answer the question and leave the engine untouched.
//!
//! Checks are `#[track_caller]`, so a failure points at the line that made
//! the assertion rather than somewhere inside the engine.

mod raise;
mod signal;

pub use raise::{Kind, Raised};
pub(crate) use raise::describe_panic;
pub use signal::{throw, throw_bare, Payload};
pub(crate) use signal::StopSignal;

use regex::Regex;
use std::fmt::Debug;
use std::panic::Location;
use tracing::debug;

use crate::engine::Engine;
use crate::sandbox::truncate;
use crate::trace::{CallStack, FailureBuilder, FailureKind, Origin};
use signal::Caught;

/// Strings longer than this get a character diff when they compare unequal.
const DIFF_THRESHOLD: usize = 40;

/// Negated equality names the value inline when it renders shorter than this.
const INLINE_VALUE_WIDTH: usize = 10;

/// Pattern-match failures show at most this much of the subject string.
const SUBJECT_WIDTH: usize = 200;

// ---------------------------------------------------------------------------
// Mode / Truthy
// ---------------------------------------------------------------------------

/// Whether a check expects its condition to hold or not to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Assert,
    Negate,
}

impl Mode {
    pub fn flipped(self) -> Self {
        match self {
            Mode::Assert => Mode::Negate,
            Mode::Negate => Mode::Assert,
        }
    }

    fn pick<'a>(self, assert: &'a str, negate: &'a str) -> &'a str {
        match self {
            Mode::Assert => assert,
            Mode::Negate => negate,
        }
    }
}

/// Values that can stand as the condition of a truthy check.
///
/// `Option` is truthy when `Some`, `Result` when `Ok`, a JSON value unless it
/// is `null` or `false`.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Truthy for Result<T, E> {
    fn is_truthy(&self) -> bool {
        self.is_ok()
    }
}

impl Truthy for serde_json::Value {
    fn is_truthy(&self) -> bool {
        !matches!(
            self,
            serde_json::Value::Null | serde_json::Value::Bool(false)
        )
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

/// A pending assertion in assert or negate mode.
#[must_use = "a check does nothing until one of its assertion methods is called"]
pub struct Check<'e> {
    engine: &'e mut Engine,
    mode: Mode,
    message: Option<String>,
}

impl<'e> Check<'e> {
    pub(crate) fn new(engine: &'e mut Engine, mode: Mode) -> Self {
        Self {
            engine,
            mode,
            message: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Use `message` instead of the default failure description.
    pub fn because(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Condition must be truthy (negate: must not be). Returns the condition.
    #[track_caller]
    pub fn truthy<T: Truthy>(self, condition: T) -> T {
        let holds = condition.is_truthy();
        self.settle(holds, |mode| {
            failed(mode.pick("assertion failed", "assertion must not hold"))
        });
        condition
    }

    /// Like [`Check::truthy`] with the condition computed by `f`.
    #[track_caller]
    pub fn truthy_by<T: Truthy>(self, f: impl FnOnce() -> T) -> T {
        let condition = f();
        self.truthy(condition)
    }

    /// Condition must be absent or false (negate: must be truthy).
    #[track_caller]
    pub fn falsy<T: Truthy>(self, condition: T) -> T {
        let flipped = Check {
            mode: self.mode.flipped(),
            ..self
        };
        flipped.truthy(condition)
    }

    /// `expected == actual` must hold (negate: must not hold).
    #[track_caller]
    pub fn eq<A, E>(self, actual: A, expected: E) -> bool
    where
        A: Debug,
        E: Debug + PartialEq<A>,
    {
        let holds = expected == actual;
        self.settle(holds, |mode| {
            describe_equality(mode, &format!("{:?}", actual), &format!("{:?}", expected))
        });
        holds
    }

    /// Value must be `None` (negate: must be `Some`).
    #[track_caller]
    pub fn none<T: Debug>(self, value: Option<T>) -> bool {
        self.check_none(
            value,
            "condition must be None",
            "condition must not be None",
        )
    }

    /// Closure must yield `None` (negate: must yield `Some`).
    #[track_caller]
    pub fn none_by<T: Debug>(self, f: impl FnOnce() -> Option<T>) -> bool {
        let value = f();
        self.check_none(value, "block must yield None", "block must not yield None")
    }

    #[track_caller]
    fn check_none<T: Debug>(self, value: Option<T>, assert: &str, negate: &str) -> bool {
        let holds = value.is_none();
        self.settle(holds, |mode| {
            let builder = failed(mode.pick(assert, negate));
            match &value {
                Some(inner) => builder.note("value", format!("{:?}", inner)),
                None => builder,
            }
        });
        holds
    }

    /// `pattern` must match somewhere in `text` (negate: must not).
    ///
    /// Returns the byte offset of the first match.
    #[track_caller]
    pub fn matches(self, text: &str, pattern: &Regex) -> Option<usize> {
        let found = pattern.find(text).map(|m| m.start());
        self.settle(found.is_some(), |mode| {
            failed(mode.pick(
                "match failure: string should match regex",
                "match failure: string should NOT match regex",
            ))
            .note("string", truncate(&format!("{:?}", text), SUBJECT_WIDTH))
            .note("regex", pattern.as_str())
        });
        found
    }

    /// `body` must raise one of `kinds` (negate: must not). An empty list
    /// stands for any returned error.
    ///
    /// A raise that breaks the expectation (an unlisted kind in assert mode,
    /// a listed kind in negate mode) is also recorded as an uncaught error.
    /// Returns what was raised.
    #[track_caller]
    pub fn raises<R, E, F>(self, kinds: &[Kind], body: F) -> Option<Raised>
    where
        F: FnOnce() -> Result<R, E>,
        E: Into<anyhow::Error>,
    {
        let origin = Origin::from(Location::caller());
        let raised = Raised::probe(body);
        let expected = raised
            .as_ref()
            .is_some_and(|raised| Kind::any_matches(kinds, raised));
        if let Some(raised) = &raised {
            match (self.mode, expected) {
                (Mode::Assert, false) | (Mode::Negate, true) => {
                    self.engine.record_uncaught(raised, origin)
                }
                (Mode::Negate, false) => {
                    debug!(raised = %raised, "unlisted error raised under negation")
                }
                (Mode::Assert, true) => {}
            }
        }
        let names = Kind::describe(kinds);
        self.settle(expected, |mode| {
            let builder = failed(format!(
                "{} {}",
                mode.pick("block must raise", "block must not raise"),
                names
            ));
            match &raised {
                Some(raised) => builder.note("block raised", raised.to_string()),
                None => builder,
            }
        });
        raised
    }

    /// `body` must throw `tag` (negate: must not). Returns the thrown value.
    ///
    /// A panic that is not a throw is recorded as an uncaught error.
    #[track_caller]
    pub fn catches<R>(self, tag: &str, body: impl FnOnce() -> R) -> Option<Payload> {
        let origin = Origin::from(Location::caller());
        let caught = signal::catch(tag, body);
        if let Caught::Panic(message) = &caught {
            self.engine
                .record_uncaught(&Raised::Panic(message.clone()), origin);
        }
        self.settle(caught.is_thrown(), |mode| {
            failed(format!(
                "{} {}",
                mode.pick("block must throw", "block must not throw"),
                tag
            ))
        });
        match caught {
            Caught::Thrown(payload) => payload,
            Caught::Nothing | Caught::Panic(_) => None,
        }
    }

    /// Count the outcome and record a failure when the expectation was
    /// not met. Returns whether it was met.
    #[track_caller]
    fn settle(self, holds: bool, describe: impl FnOnce(Mode) -> FailureBuilder) -> bool {
        let origin = Origin::from(Location::caller());
        let Check {
            engine,
            mode,
            message,
        } = self;
        engine.tally(mode, holds, || {
            let builder = describe(mode)
                .origin(Some(origin))
                .stack(CallStack::capture());
            match message {
                Some(message) => builder.fail(message),
                None => builder,
            }
        })
    }
}

fn failed(message: impl Into<String>) -> FailureBuilder {
    FailureBuilder::new(FailureKind::Assertion, message)
}

fn describe_equality(mode: Mode, actual: &str, expected: &str) -> FailureBuilder {
    match mode {
        Mode::Negate if expected.chars().count() < INLINE_VALUE_WIDTH => failed(format!(
            "inequality test failed: value should not equal {}",
            expected
        )),
        Mode::Negate => {
            failed("inequality test failed: the two values were equal").note("value", expected)
        }
        Mode::Assert => {
            let builder = failed("equality test failed")
                .note("was", actual)
                .note("expected", expected);
            if is_long_string(actual) && is_long_string(expected) {
                builder.note("diff", char_diff(actual, expected))
            } else {
                builder
            }
        }
    }
}

fn is_long_string(rendered: &str) -> bool {
    rendered.len() > DIFF_THRESHOLD + 2 && rendered.starts_with('"') && rendered.ends_with('"')
}

/// Character diff from `old` to `new`: `[-removed-]` and `{+added+}`.
fn char_diff(old: &str, new: &str) -> String {
    #[derive(PartialEq)]
    enum Run {
        Same,
        Removed,
        Added,
    }

    fn close(out: &mut String, run: &Run) {
        match run {
            Run::Removed => out.push_str("-]"),
            Run::Added => out.push_str("+}"),
            Run::Same => {}
        }
    }

    let mut out = String::new();
    let mut current = Run::Same;
    for change in diff::chars(old, new) {
        let (run, ch) = match change {
            diff::Result::Both(ch, _) => (Run::Same, ch),
            diff::Result::Left(ch) => (Run::Removed, ch),
            diff::Result::Right(ch) => (Run::Added, ch),
        };
        if run != current {
            close(&mut out, &current);
            match run {
                Run::Removed => out.push_str("[-"),
                Run::Added => out.push_str("{+"),
                Run::Same => {}
            }
            current = run;
        }
        out.push(ch);
    }
    close(&mut out, &current);
    out
}

// ---------------------------------------------------------------------------
// Engine entry points
// ---------------------------------------------------------------------------

impl Engine {
    /// Start an assertion that must hold.
    pub fn assert(&mut self) -> Check<'_> {
        Check::new(self, Mode::Assert)
    }

    /// Start an assertion that must not hold.
    pub fn negate(&mut self) -> Check<'_> {
        Check::new(self, Mode::Negate)
    }

    pub fn is_truthy<T: Truthy>(&self, condition: T) -> bool {
        condition.is_truthy()
    }

    pub fn is_truthy_by<T: Truthy>(&self, f: impl FnOnce() -> T) -> bool {
        f().is_truthy()
    }

    pub fn is_falsy<T: Truthy>(&self, condition: T) -> bool {
        !condition.is_truthy()
    }

    pub fn is_eq<A, E>(&self, actual: A, expected: E) -> bool
    where
        E: PartialEq<A>,
    {
        expected == actual
    }

    pub fn is_none<T>(&self, value: Option<T>) -> bool {
        value.is_none()
    }

    pub fn is_none_by<T>(&self, f: impl FnOnce() -> Option<T>) -> bool {
        f().is_none()
    }

    pub fn is_match(&self, text: &str, pattern: &Regex) -> bool {
        pattern.is_match(text)
    }

    /// Whether `body` raises one of `kinds`. Records nothing, whatever the
    /// body does short of a stop request.
    pub fn raises<R, E, F>(&self, kinds: &[Kind], body: F) -> bool
    where
        F: FnOnce() -> Result<R, E>,
        E: Into<anyhow::Error>,
    {
        Raised::probe(body).is_some_and(|raised| Kind::any_matches(kinds, &raised))
    }

    /// Whether `body` throws `tag`. Records nothing.
    pub fn catches<R>(&self, tag: &str, body: impl FnOnce() -> R) -> bool {
        signal::catch(tag, body).is_thrown()
    }
}
