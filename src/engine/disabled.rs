//! Inert twins of the declaration and assertion primitives
//!
//! Switching `t.test(..)` to `t.disabled().test(..)` keeps the code compiling
//! and type-checked while taking it out of the run. Nothing passed to a
//! disabled primitive is evaluated or recorded.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::Engine;
use crate::assertion::Kind;
use crate::error::Outcome;

/// Handle returned by [`Engine::disabled`].
pub struct Disabled<'e> {
    engine: &'e mut Engine,
}

impl<'e> Disabled<'e> {
    pub(crate) fn new(engine: &'e mut Engine) -> Self {
        Self { engine }
    }

    fn skip(&self, what: &str) {
        debug!(test = %self.engine.path().join(" "), what, "skipping disabled primitive");
    }

    pub fn test<F>(&mut self, description: impl Into<String>, _body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        let description = description.into();
        debug!(test = %description, "skipping disabled test");
    }

    pub fn test_isolated<F>(&mut self, description: impl Into<String>, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.test(description, body);
    }

    pub fn before_each<F>(&mut self, _body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("before_each");
    }

    pub fn after_each<F>(&mut self, _body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("after_each");
    }

    pub fn before_all<F>(&mut self, _body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("before_all");
    }

    pub fn after_all<F>(&mut self, _body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("after_all");
    }

    pub fn truthy<T>(&mut self, _condition: T) {
        self.skip("truthy");
    }

    pub fn truthy_by<T>(&mut self, _f: impl FnOnce() -> T) {
        self.skip("truthy");
    }

    pub fn falsy<T>(&mut self, _condition: T) {
        self.skip("falsy");
    }

    pub fn eq<A, E>(&mut self, _actual: A, _expected: E) {
        self.skip("eq");
    }

    pub fn none<T>(&mut self, _value: Option<T>) {
        self.skip("none");
    }

    pub fn none_by<T>(&mut self, _f: impl FnOnce() -> Option<T>) {
        self.skip("none");
    }

    pub fn matches(&mut self, _text: &str, _pattern: &Regex) {
        self.skip("matches");
    }

    pub fn raises<R, E, F>(&mut self, _kinds: &[Kind], _body: F)
    where
        F: FnOnce() -> Result<R, E>,
    {
        self.skip("raises");
    }

    pub fn catches<R>(&mut self, _tag: &str, _body: impl FnOnce() -> R) {
        self.skip("catches");
    }

    pub fn log<T: Serialize>(&mut self, _value: T) {
        self.skip("log");
    }

    pub fn share<F>(&mut self, _id: impl Into<String>, _block: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("share");
    }

    pub fn inject(&mut self, _id: &str) {
        self.skip("inject");
    }

    pub fn share_and_inject<F>(&mut self, _id: &str, _block: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.skip("share_and_inject");
    }
}
