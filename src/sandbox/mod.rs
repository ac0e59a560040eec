//! Isolated execution contexts
//!
//! A [`Sandbox`] is the private state a test body runs against. Root-level
//! tests and explicitly isolated tests each get a fresh sandbox when they are
//! declared; every other test and hook runs against the sandbox that was
//! active where it was declared, so nested tests see (and mutate) their
//! parent's state while siblings under different roots never do.
//!
//! Values are stored by name and must be `Debug` so the failure capture can
//! snapshot them.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a sandbox.
pub type SandboxRef = Rc<RefCell<Sandbox>>;

// ---------------------------------------------------------------------------
// Variable
// ---------------------------------------------------------------------------

/// A value that can live in a sandbox.
///
/// Implemented for every `Any + Debug` type.
pub trait Variable: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + fmt::Debug> Variable for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Named state private to one isolated test and everything nested in it.
#[derive(Default)]
pub struct Sandbox {
    vars: BTreeMap<String, Box<dyn Variable>>,
}

impl Sandbox {
    /// Create an empty sandbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sandbox behind a shared handle.
    pub fn new_ref() -> SandboxRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn set<T: Any + fmt::Debug>(&mut self, name: impl Into<String>, value: T) {
        self.vars.insert(name.into(), Box::new(value));
    }

    /// Borrow the value bound to `name` if it has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        let value: &dyn Variable = &**self.vars.get(name)?;
        value.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the value bound to `name` if it has type `T`.
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        let value: &mut dyn Variable = &mut **self.vars.get_mut(name)?;
        value.as_any_mut().downcast_mut::<T>()
    }

    /// Whether anything is bound to `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Remove the binding for `name`, returning whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    /// Names of all bindings, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render every binding with its `Debug` form, truncated to `width`
    /// characters.
    pub fn snapshot(&self, width: usize) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .map(|(name, value)| (name.clone(), truncate(&format!("{:?}", value), width)))
            .collect()
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.vars.iter()).finish()
    }
}

/// Cut `text` to at most `width` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
