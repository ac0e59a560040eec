//! Error types for the nestest engine
//!
//! Only programmer mistakes in test authoring surface as [`Error`]. Failing
//! assertions and errors raised by test bodies are test *outcomes* and are
//! recorded in the trace instead.

use std::fmt;
use thiserror::Error;

/// Outcome of a test body, hook, or shared code block.
///
/// Bodies may use `?` on any error type; an `Err` returned here is recorded
/// as an uncaught error of the enclosing test.
pub type Outcome = anyhow::Result<()>;

/// Main error type for nestest
#[derive(Error, Debug)]
pub enum Error {
    /// A code block was already shared under this identifier
    #[error("a code block has already been shared under the identifier {id:?}")]
    DuplicateShare { id: String },

    /// No code block is shared under this identifier
    #[error("no code block is shared under the identifier {id:?}")]
    MissingShare { id: String },

    /// Shared code can only be injected from inside a running test
    #[error("cannot inject the code block shared under {id:?} outside of a test")]
    ShareOutsideTest { id: String },

    /// Shared code raised an error while it was being injected
    #[error("code block shared under {id:?} failed")]
    Injected {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// `stop` was called while no run was in progress
    #[error("stop was called outside of a run")]
    NotRunning,

    /// `run` was called from inside a running test
    #[error("a run is already in progress; nested runs are not supported")]
    RunInProgress,

    /// A logged value could not be converted for the report
    #[error("value could not be serialized: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

/// Which kind of usage error occurred, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateShare,
    MissingShare,
    ShareOutsideTest,
    Injected,
    NotRunning,
    RunInProgress,
    Serialize,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DuplicateShare => write!(f, "DuplicateShare"),
            ErrorKind::MissingShare => write!(f, "MissingShare"),
            ErrorKind::ShareOutsideTest => write!(f, "ShareOutsideTest"),
            ErrorKind::Injected => write!(f, "Injected"),
            ErrorKind::NotRunning => write!(f, "NotRunning"),
            ErrorKind::RunInProgress => write!(f, "RunInProgress"),
            ErrorKind::Serialize => write!(f, "Serialize"),
        }
    }
}

impl Error {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateShare { .. } => ErrorKind::DuplicateShare,
            Error::MissingShare { .. } => ErrorKind::MissingShare,
            Error::ShareOutsideTest { .. } => ErrorKind::ShareOutsideTest,
            Error::Injected { .. } => ErrorKind::Injected,
            Error::NotRunning => ErrorKind::NotRunning,
            Error::RunInProgress => ErrorKind::RunInProgress,
            Error::Serialize { .. } => ErrorKind::Serialize,
        }
    }

    /// Create a duplicate-identifier error
    pub fn duplicate_share(id: impl Into<String>) -> Self {
        Error::DuplicateShare { id: id.into() }
    }

    /// Create a missing-identifier error
    pub fn missing_share(id: impl Into<String>) -> Self {
        Error::MissingShare { id: id.into() }
    }

    /// Create an injection-outside-a-test error
    pub fn share_outside_test(id: impl Into<String>) -> Self {
        Error::ShareOutsideTest { id: id.into() }
    }
}

/// Result type alias for nestest
pub type Result<T> = std::result::Result<T, Error>;
