//! Tagged non-local exits
//!
//! [`throw`] unwinds with a typed payload instead of a panic message, so the
//! installed panic hook stays silent and the signal-catch assertion can tell
//! a throw apart from an ordinary panic by downcasting.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Unwinding payload of [`throw`] / [`throw_bare`].
pub(crate) struct Signal {
    pub tag: String,
    pub payload: Option<Box<dyn Any + Send>>,
}

/// Unwinding payload of `Engine::stop`, caught only by the run driver.
#[derive(Debug)]
pub(crate) struct StopSignal;

/// Leave the current closure with `tag`, carrying `value` to whoever catches
/// the tag.
pub fn throw<V: Any + Send>(tag: &str, value: V) -> ! {
    panic::resume_unwind(Box::new(Signal {
        tag: tag.to_string(),
        payload: Some(Box::new(value)),
    }))
}

/// Leave the current closure with `tag` and no value.
pub fn throw_bare(tag: &str) -> ! {
    panic::resume_unwind(Box::new(Signal {
        tag: tag.to_string(),
        payload: None,
    }))
}

/// Value carried by a caught throw.
pub struct Payload(Box<dyn Any + Send>);

impl Payload {
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.0.downcast_ref()
    }

    pub fn is<V: Any>(&self) -> bool {
        self.0.is::<V>()
    }

    /// Take the value out, or get the payload back if it has another type.
    pub fn take<V: Any>(self) -> Result<V, Self> {
        self.0.downcast::<V>().map(|value| *value).map_err(Payload)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// What a probed body did, as far as a particular tag is concerned.
pub(crate) enum Caught {
    /// Returned normally.
    Nothing,
    Thrown(Option<Payload>),
    /// Panicked for reasons unrelated to throwing.
    Panic(String),
}

impl Caught {
    pub fn is_thrown(&self) -> bool {
        matches!(self, Caught::Thrown(_))
    }
}

/// Run `body`, catching a throw of `tag`.
///
/// A throw of another tag keeps unwinding towards an enclosing catch of that
/// tag. A stop request is never caught here.
pub(crate) fn catch<R>(tag: &str, body: impl FnOnce() -> R) -> Caught {
    let payload = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(_) => return Caught::Nothing,
        Err(payload) => payload,
    };
    if payload.is::<StopSignal>() {
        panic::resume_unwind(payload);
    }
    match payload.downcast::<Signal>() {
        Ok(signal) if signal.tag == tag => Caught::Thrown(signal.payload.map(Payload)),
        Ok(signal) => {
            tracing::trace!(expected = tag, thrown = %signal.tag, "passing throw outwards");
            panic::resume_unwind(signal)
        }
        Err(payload) => Caught::Panic(super::raise::describe_panic(payload.as_ref())),
    }
}
