//! Exception kinds for the exception-raise assertion
//!
//! A probed body can fail two ways: by returning `Err`, or by panicking.
//! [`Raised`] captures either, and a [`Kind`] decides whether what was
//! raised is one of the kinds the caller listed.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use super::signal::{Signal, StopSignal};
use crate::trace::{panic_message, CallStack, Origin};

// ---------------------------------------------------------------------------
// Raised
// ---------------------------------------------------------------------------

/// Whatever a probed body raised.
#[derive(Debug)]
pub enum Raised {
    Error(anyhow::Error),
    Panic(String),
}

impl Raised {
    /// Run `body`, capturing a returned error or a panic.
    ///
    /// A stop request or a throw passes through untouched.
    pub(crate) fn probe<R, E, F>(body: F) -> Option<Raised>
    where
        F: FnOnce() -> Result<R, E>,
        E: Into<anyhow::Error>,
    {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(Raised::Error(err.into())),
            Err(payload) if payload.is::<StopSignal>() || payload.is::<Signal>() => {
                panic::resume_unwind(payload)
            }
            Err(payload) => Some(Raised::Panic(describe_panic(payload.as_ref()))),
        }
    }

    /// The error, if the body returned one.
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Raised::Error(err) => Some(err),
            Raised::Panic(_) => None,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Raised::Panic(_))
    }

    /// Whether the error, or anything in its source chain, is an `E`.
    pub fn is<E>(&self) -> bool
    where
        E: StdError + Send + Sync + 'static,
    {
        match self {
            Raised::Error(err) => err.is::<E>() || err.chain().any(|cause| cause.is::<E>()),
            Raised::Panic(_) => false,
        }
    }

    /// Where the error was created, if its backtrace was captured, together
    /// with the external part of that backtrace.
    pub(crate) fn location(&self) -> (Option<Origin>, CallStack) {
        match self {
            Raised::Error(err) => {
                let stack = CallStack::from_backtrace(err.backtrace());
                (stack.first_origin().cloned(), stack)
            }
            Raised::Panic(_) => (None, CallStack::default()),
        }
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Raised::Error(err) => write!(f, "{:#}", err),
            Raised::Panic(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// Message of a panic payload; a stray throw is described by its tag.
pub(crate) fn describe_panic(payload: &(dyn Any + Send)) -> String {
    match payload.downcast_ref::<Signal>() {
        Some(signal) => format!("uncaught throw {:?}", signal.tag),
        None => panic_message(payload),
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// A class of raised things the caller anticipates.
#[derive(Clone, Copy)]
pub struct Kind {
    name: &'static str,
    matcher: fn(&Raised) -> bool,
}

impl Kind {
    /// Errors of type `E`, directly or anywhere in the source chain.
    pub fn of<E>() -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let full = std::any::type_name::<E>();
        Self {
            name: full.rsplit("::").next().unwrap_or(full),
            matcher: |raised| raised.is::<E>(),
        }
    }

    /// Any returned error. This is what an empty kind list means.
    pub fn any_error() -> Self {
        Self {
            name: "error",
            matcher: |raised| matches!(raised, Raised::Error(_)),
        }
    }

    /// Any panic.
    pub fn panic() -> Self {
        Self {
            name: "panic",
            matcher: Raised::is_panic,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, raised: &Raised) -> bool {
        (self.matcher)(raised)
    }

    /// Whether `raised` is one of `kinds`; an empty list means any error.
    pub(crate) fn any_matches(kinds: &[Kind], raised: &Raised) -> bool {
        if kinds.is_empty() {
            return Kind::any_error().matches(raised);
        }
        kinds.iter().any(|kind| kind.matches(raised))
    }

    /// `A or B`, for failure messages.
    pub(crate) fn describe(kinds: &[Kind]) -> String {
        if kinds.is_empty() {
            return Kind::any_error().name.to_string();
        }
        kinds
            .iter()
            .map(|kind| kind.name)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.name)
    }
}
