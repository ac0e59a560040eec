//! Nestest: nested tests with failure traces that mirror their declarations
//!
//! Tests are closures declared on an [`Engine`]. A test body can declare more
//! tests, which run right after it returns, so a test program is a tree. Every
//! failing assertion and every error nobody caught is captured with the
//! source around it, the sandbox variables in scope, and the call stack, and
//! lands in a trace with the same shape as the tree.
//!
//! # Quick Start
//!
//! ```no_run
//! use nestest::{Engine, Kind};
//!
//! fn main() -> nestest::Result<()> {
//!     let mut t = Engine::new();
//!     t.test("a stack", |t| {
//!         t.set_var("items", Vec::<i32>::new());
//!
//!         t.test("starts empty", |t| {
//!             let len = t.var::<Vec<i32>>("items").map(|items| items.len());
//!             t.assert().eq(len, Some(0));
//!             Ok(())
//!         });
//!
//!         t.test("rejects bad input", |t| {
//!             t.assert().raises(&[Kind::of::<std::num::ParseIntError>()], || "x".parse::<i32>());
//!             Ok(())
//!         });
//!         Ok(())
//!     });
//!
//!     let stats = t.run(false)?;
//!     println!("{}", stats);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Declaration, run driver, sandbox access, shared code |
//! | [`assertion`] | Assertion families in assert, negate and sample mode |
//! | [`trace`] | Failure capture and the hierarchical trace |
//! | [`suite`] | Tests and hooks of one nesting level |
//! | [`sandbox`] | Private state of isolated tests |
//! | [`share`] | Registry of injectable code blocks |
//! | [`report`] | Statistics, report, presenter and inspector seams |
//! | [`options`] | Debug and quiet switches |

pub mod assertion;
pub mod engine;
pub mod error;
pub mod options;
pub mod report;
pub mod sandbox;
pub mod share;
pub mod suite;
pub mod trace;

pub use assertion::{throw, throw_bare, Check, Kind, Mode, Payload, Raised, Truthy};
pub use engine::{Disabled, Engine};
pub use error::{Error, ErrorKind, Outcome, Result};
pub use options::Options;
pub use report::{Inspector, Presenter, Report, Stats, TracingPresenter};
pub use sandbox::{Sandbox, SandboxRef};
pub use trace::{Entry, Failure, FailureKind, Trace};

/// Version of nestest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
