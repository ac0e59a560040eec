//! Call-stack capture and filtering
//!
//! Stack frames come from [`std::backtrace::Backtrace`], which only resolves
//! symbols when `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` asks for it. With
//! backtraces disabled the call stack is simply empty.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

/// Symbol prefixes that belong to the engine or to the machinery under it.
const INTERNAL_PREFIXES: &[&str] = &[
    "nestest::",
    "<nestest::",
    "std::",
    "<std::",
    "core::",
    "<core::",
    "alloc::",
    "<alloc::",
    "anyhow::",
    "<anyhow::",
    "__rust",
    "rust_begin_unwind",
    "_start",
    "__libc_start",
];

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A file and line in test code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: String,
    pub line: u32,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl From<&Location<'_>> for Origin {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub symbol: String,
    pub origin: Option<Origin>,
}

impl Frame {
    /// Whether this frame belongs to the engine, the standard library, or
    /// the unwinding machinery.
    pub fn is_internal(&self) -> bool {
        if INTERNAL_PREFIXES
            .iter()
            .any(|prefix| self.symbol.starts_with(prefix))
        {
            return true;
        }
        matches!(&self.origin, Some(origin) if origin.file.starts_with("/rustc/"))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{} ({})", self.symbol, origin),
            None => write!(f, "{}", self.symbol),
        }
    }
}

// ---------------------------------------------------------------------------
// CallStack
// ---------------------------------------------------------------------------

/// The external part of a call stack, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    pub frames: Vec<Frame>,
}

impl CallStack {
    /// Capture the current call stack, keeping only external frames.
    pub fn capture() -> Self {
        Self::from_backtrace(&Backtrace::capture())
    }

    /// Keep the external frames of an already captured backtrace.
    pub fn from_backtrace(backtrace: &Backtrace) -> Self {
        if backtrace.status() != BacktraceStatus::Captured {
            return Self::default();
        }
        Self::parse(&backtrace.to_string())
    }

    /// Parse the `Display` rendering of a backtrace:
    ///
    /// ```text
    ///    4: math_tests::sums::{{closure}}
    ///              at ./tests/math_tests.rs:12:9
    /// ```
    pub fn parse(text: &str) -> Self {
        let mut frames: Vec<Frame> = Vec::new();
        for raw in text.lines() {
            let line = raw.trim();
            if let Some(location) = line.strip_prefix("at ") {
                if let Some(frame) = frames.last_mut() {
                    frame.origin = parse_origin(location);
                }
                continue;
            }
            if let Some((index, symbol)) = line.split_once(": ") {
                if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                    frames.push(Frame {
                        symbol: symbol.to_string(),
                        origin: None,
                    });
                }
            }
        }
        frames.retain(|frame| !frame.is_internal());
        Self { frames }
    }

    /// Location of the innermost external frame that has one.
    pub fn first_origin(&self) -> Option<&Origin> {
        self.frames.iter().find_map(|frame| frame.origin.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// One rendered line per frame.
    pub fn lines(&self) -> Vec<String> {
        self.frames.iter().map(Frame::to_string).collect()
    }
}

/// Split `path:line[:column]` into an [`Origin`].
fn parse_origin(text: &str) -> Option<Origin> {
    let mut parts = text.rsplitn(3, ':');
    let last = parts.next()?;
    let middle = parts.next()?;
    match parts.next() {
        // path:line:column
        Some(path) if middle.parse::<u32>().is_ok() => {
            Some(Origin::new(path, middle.parse().ok()?))
        }
        // path:line (a path containing ':' is rare enough to ignore)
        _ => {
            let line = last.parse().ok()?;
            let path = text.strip_suffix(last)?.strip_suffix(':')?;
            Some(Origin::new(path, line))
        }
    }
}

/// Human-readable message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
