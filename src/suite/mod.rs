//! Suite tree
//!
//! A [`Suite`] holds the tests and hooks declared at one nesting level. The
//! engine creates a fresh suite each time it enters a test body, lets the body
//! declare into it, runs it, and drops it once the body's trace is captured.

use std::fmt;
use std::panic::Location;
use std::rc::Rc;

use crate::engine::Engine;
use crate::error::Outcome;
use crate::sandbox::SandboxRef;
use crate::trace::Origin;

/// A test body, hook, or shared code block.
pub type Body = Rc<dyn Fn(&mut Engine) -> Outcome>;

// ---------------------------------------------------------------------------
// Test
// ---------------------------------------------------------------------------

/// A named unit of behaviour, possibly declaring nested tests.
#[derive(Clone)]
pub struct Test {
    /// Human-readable description.
    pub description: String,
    pub body: Body,
    /// Private context, present for root-level and explicitly isolated tests.
    pub sandbox: Option<SandboxRef>,
    /// Context the body runs against: its own sandbox, or the one that was
    /// active where the test was declared.
    pub context: SandboxRef,
    /// Where the test was declared.
    pub origin: Origin,
}

impl Test {
    /// Create a test that runs against `context` unless it has a sandbox of
    /// its own.
    pub fn new(
        description: impl Into<String>,
        body: Body,
        sandbox: Option<SandboxRef>,
        context: SandboxRef,
        location: &Location<'_>,
    ) -> Self {
        let context = sandbox.clone().unwrap_or(context);
        Self {
            description: description.into(),
            body,
            sandbox,
            context,
            origin: Origin::from(location),
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.sandbox.is_some()
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("description", &self.description)
            .field("isolated", &self.is_isolated())
            .field("origin", &self.origin)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Hook
// ---------------------------------------------------------------------------

/// When a hook runs relative to the tests of its suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    BeforeEach,
    AfterEach,
    BeforeAll,
    AfterAll,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::BeforeEach => write!(f, "before_each"),
            HookKind::AfterEach => write!(f, "after_each"),
            HookKind::BeforeAll => write!(f, "before_all"),
            HookKind::AfterAll => write!(f, "after_all"),
        }
    }
}

/// A closure run around the tests of one suite.
#[derive(Clone)]
pub struct Hook {
    pub kind: HookKind,
    pub body: Body,
    /// Context that was active where the hook was registered.
    pub context: SandboxRef,
    pub origin: Origin,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Suite
// ---------------------------------------------------------------------------

/// Tests and hooks declared at one nesting level.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    pub tests: Vec<Test>,
    pub before_each: Vec<Hook>,
    pub after_each: Vec<Hook>,
    pub before_all: Vec<Hook>,
    pub after_all: Vec<Hook>,
}

impl Suite {
    /// Create a new, empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test to this suite.
    pub fn add_test(&mut self, test: Test) {
        self.tests.push(test);
    }

    /// Register a hook under its kind.
    pub fn add_hook(&mut self, hook: Hook) {
        let hooks = match hook.kind {
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
        };
        hooks.push(hook);
    }

    /// Hooks of one kind, in registration order.
    pub fn hooks(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
        }
    }

    /// Append everything declared in `other`.
    pub fn merge(&mut self, other: Suite) {
        self.tests.extend(other.tests);
        self.before_each.extend(other.before_each);
        self.after_each.extend(other.after_each);
        self.before_all.extend(other.before_all);
        self.after_all.extend(other.after_all);
    }

    /// Whether nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
            && self.before_each.is_empty()
            && self.after_each.is_empty()
            && self.before_all.is_empty()
            && self.after_all.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;

    fn noop() -> Body {
        Rc::new(|_: &mut Engine| Ok(()))
    }

    #[test]
    fn test_isolated_test_runs_in_own_sandbox() {
        let outer = Sandbox::new_ref();
        let own = Sandbox::new_ref();
        let test = Test::new("a", noop(), Some(own.clone()), outer.clone(), Location::caller());
        assert!(test.is_isolated());
        assert!(Rc::ptr_eq(&test.context, &own));
    }

    #[test]
    fn test_nested_test_inherits_context() {
        let outer = Sandbox::new_ref();
        let test = Test::new("b", noop(), None, outer.clone(), Location::caller());
        assert!(!test.is_isolated());
        assert!(Rc::ptr_eq(&test.context, &outer));
        assert!(test.origin.file.ends_with("mod.rs"));
    }

    #[test]
    fn test_suite_add_hook_by_kind() {
        let context = Sandbox::new_ref();
        let mut suite = Suite::new();
        assert!(suite.is_empty());
        for kind in [HookKind::BeforeAll, HookKind::BeforeEach, HookKind::BeforeEach] {
            suite.add_hook(Hook {
                kind,
                body: noop(),
                context: context.clone(),
                origin: Origin::new("x.rs", 1),
            });
        }
        assert_eq!(suite.hooks(HookKind::BeforeEach).len(), 2);
        assert_eq!(suite.hooks(HookKind::BeforeAll).len(), 1);
        assert!(suite.hooks(HookKind::AfterAll).is_empty());
        assert!(!suite.is_empty());
    }

    #[test]
    fn test_suite_add_test_keeps_order() {
        let context = Sandbox::new_ref();
        let mut suite = Suite::new();
        suite.add_test(Test::new("first", noop(), None, context.clone(), Location::caller()));
        suite.add_test(Test::new("second", noop(), None, context, Location::caller()));
        let names: Vec<_> = suite.tests.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_hook_kind_display() {
        assert_eq!(HookKind::BeforeEach.to_string(), "before_each");
        assert_eq!(HookKind::AfterAll.to_string(), "after_all");
    }
}
