//! Execution driver
//!
//! [`Engine`] owns everything a test program builds up: the suite being
//! declared, the live test stack, the trace, the statistics, and the shared
//! code registry. Test bodies receive `&mut Engine` and use it to declare
//! nested tests, make assertions, and reach their sandbox.
//!
//! Declaring a test only records it. [`Engine::run`] walks the root suite
//! depth-first; entering a test swaps in a fresh suite and a fresh trace,
//! runs the body (which may declare into that suite), executes whatever it
//! declared, and finally folds the local trace into the enclosing one under
//! the test's description.
//!
//! Every body runs inside a panic boundary. An `Err` return or a panic is
//! recorded as an uncaught error and the run moves on; a stop request
//! unwinds all the way out of the run instead.

mod disabled;

pub use disabled::Disabled;

use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe, Location};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::assertion::{describe_panic, Mode, Raised, StopSignal};
use crate::error::{Error, Outcome, Result};
use crate::options::Options;
use crate::report::{Inspector, Presenter, Report, Stats, TracingPresenter};
use crate::sandbox::{Sandbox, SandboxRef};
use crate::share::SharedCode;
use crate::suite::{Body, Hook, HookKind, Suite, Test};
use crate::trace::{Entry, Failure, FailureBuilder, FailureKind, Origin, SourceCache, Trace};

/// A stop request is unwinding out of the run.
struct Halt;

type Flow = std::result::Result<(), Halt>;

/// The test engine
pub struct Engine {
    options: Options,
    stats: Stats,
    /// Trace of the level that is currently executing.
    trace: Trace,
    /// Traces of the enclosing levels, outermost first.
    outer_traces: Vec<Trace>,
    /// Suite receiving declarations at the current level.
    suite: Suite,
    /// Tests whose bodies are executing, outermost first.
    tests: Vec<Test>,
    /// Contexts of the closures that are executing, innermost last.
    contexts: Vec<SandboxRef>,
    /// Context of code running outside of any closure.
    main: SandboxRef,
    shared: SharedCode,
    sources: SourceCache,
    last_failure: Option<Failure>,
    presenter: Box<dyn Presenter>,
    inspector: Option<Box<dyn Inspector>>,
    running: bool,
}

impl Engine {
    /// Create an engine configured from the environment.
    pub fn new() -> Self {
        Self::with_options(Options::from_env())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            stats: Stats::default(),
            trace: Trace::new(),
            outer_traces: Vec::new(),
            suite: Suite::new(),
            tests: Vec::new(),
            contexts: Vec::new(),
            main: Sandbox::new_ref(),
            shared: SharedCode::new(),
            sources: SourceCache::new(),
            last_failure: None,
            presenter: Box::new(TracingPresenter),
            inspector: None,
            running: false,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Replace the collaborator that failures and summaries are shown to.
    pub fn set_presenter(&mut self, presenter: Box<dyn Presenter>) {
        self.presenter = presenter;
    }

    /// Install the collaborator consulted on each failure when
    /// [`Options::debug`] is set.
    pub fn set_inspector(&mut self, inspector: Box<dyn Inspector>) {
        self.inspector = Some(inspector);
    }

    // -----------------------------------------------------------------------
    // Declaration
    // -----------------------------------------------------------------------

    /// Declare a test.
    ///
    /// At the top level the test gets a sandbox of its own; inside another
    /// test's body it shares the sandbox of its parent.
    #[track_caller]
    pub fn test<F>(&mut self, description: impl Into<String>, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        let isolated = self.tests.is_empty();
        self.declare(description.into(), Rc::new(body), isolated, Location::caller());
    }

    /// Declare a test that always gets a sandbox of its own.
    #[track_caller]
    pub fn test_isolated<F>(&mut self, description: impl Into<String>, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.declare(description.into(), Rc::new(body), true, Location::caller());
    }

    fn declare(&mut self, description: String, body: Body, isolated: bool, location: &Location<'_>) {
        let sandbox = isolated.then(Sandbox::new_ref);
        let test = Test::new(description, body, sandbox, self.context(), location);
        trace!(test = %test.description, isolated, "declared test");
        self.suite.add_test(test);
    }

    /// Run `body` before each test of the current suite.
    #[track_caller]
    pub fn before_each<F>(&mut self, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.hook(HookKind::BeforeEach, Rc::new(body), Location::caller());
    }

    /// Run `body` after each test of the current suite.
    #[track_caller]
    pub fn after_each<F>(&mut self, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.hook(HookKind::AfterEach, Rc::new(body), Location::caller());
    }

    /// Run `body` once before the first test of the current suite.
    #[track_caller]
    pub fn before_all<F>(&mut self, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.hook(HookKind::BeforeAll, Rc::new(body), Location::caller());
    }

    /// Run `body` once after the last test of the current suite.
    #[track_caller]
    pub fn after_all<F>(&mut self, body: F)
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.hook(HookKind::AfterAll, Rc::new(body), Location::caller());
    }

    fn hook(&mut self, kind: HookKind, body: Body, location: &Location<'_>) {
        let hook = Hook {
            kind,
            body,
            context: self.context(),
            origin: Origin::from(location),
        };
        self.suite.add_hook(hook);
    }

    // -----------------------------------------------------------------------
    // Sandbox access
    // -----------------------------------------------------------------------

    fn context(&self) -> SandboxRef {
        Rc::clone(self.contexts.last().unwrap_or(&self.main))
    }

    /// Sandbox of the innermost executing closure.
    pub fn sandbox(&self) -> SandboxRef {
        self.context()
    }

    pub fn set_var<T: Any + fmt::Debug>(&self, name: impl Into<String>, value: T) {
        self.context().borrow_mut().set(name, value);
    }

    /// A copy of the variable `name`, if it exists and is a `T`.
    pub fn var<T: Any + Clone>(&self, name: &str) -> Option<T> {
        let context = self.context();
        let value = context.borrow().get::<T>(name).cloned();
        value
    }

    /// Apply `f` to the variable `name` in place.
    pub fn with_var<T: Any, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let context = self.context();
        let mut sandbox = context.borrow_mut();
        sandbox.get_mut::<T>(name).map(f)
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.context().borrow().contains(name)
    }

    // -----------------------------------------------------------------------
    // Logging and shared code
    // -----------------------------------------------------------------------

    /// Append `value` to the trace of the current test.
    pub fn log<T: Serialize>(&mut self, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.trace.push(Entry::Log(value));
        Ok(())
    }

    /// Register `block` under `id` for later injection.
    pub fn share<F>(&mut self, id: impl Into<String>, block: F) -> Result<()>
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.shared.register(id, Rc::new(block))
    }

    /// Run the block shared under `id` against the sandbox of the closest
    /// isolated test on the live test stack.
    pub fn inject(&mut self, id: &str) -> Result<()> {
        let block = self.shared.get(id)?;
        let sandbox = self
            .tests
            .iter()
            .rev()
            .find_map(|test| test.sandbox.clone())
            .ok_or_else(|| Error::share_outside_test(id))?;
        debug!(id, "injecting shared code");
        self.contexts.push(sandbox);
        let outcome = block(self);
        self.contexts.pop();
        outcome.map_err(|source| Error::Injected {
            id: id.to_string(),
            source,
        })
    }

    pub fn share_and_inject<F>(&mut self, id: &str, block: F) -> Result<()>
    where
        F: Fn(&mut Engine) -> Outcome + 'static,
    {
        self.share(id, block)?;
        self.inject(id)
    }

    pub fn is_shared(&self, id: &str) -> bool {
        self.shared.contains(id)
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Execute the declared tests and return the statistics.
    ///
    /// With `continue_run` set, statistics and trace accumulate on top of
    /// those of earlier runs; otherwise both start from scratch.
    pub fn run(&mut self, continue_run: bool) -> Result<Stats> {
        if self.running {
            return Err(Error::RunInProgress);
        }
        if !continue_run {
            self.reset();
        }
        self.running = true;
        let started = Instant::now();

        let root = mem::take(&mut self.suite);
        debug!(tests = root.tests.len(), "starting run");
        let flow = self.execute(&root);
        // Tests declared at the top level while running (from a root hook)
        // stay declared for the next run.
        let declared = mem::replace(&mut self.suite, root);
        self.suite.merge(declared);
        if flow.is_err() {
            debug!("run stopped early");
        }

        self.stats.time = started.elapsed();
        self.running = false;
        if !self.options.quiet {
            self.presenter.summary(&self.stats);
        }
        Ok(self.stats)
    }

    fn reset(&mut self) {
        self.stats = Stats::default();
        self.trace.clear();
        self.outer_traces.clear();
        self.tests.clear();
        self.contexts.clear();
        self.last_failure = None;
    }

    /// Abandon the run in progress. Remaining tests and hooks are skipped,
    /// and whatever was recorded so far is kept.
    ///
    /// Does not return while a run is in progress.
    pub fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        debug!(test = %self.path().join(" "), "stop requested");
        panic::resume_unwind(Box::new(StopSignal))
    }

    /// Statistics and the complete trace recorded so far.
    pub fn report(&self) -> Report {
        let trace = self.outer_traces.first().unwrap_or(&self.trace).clone();
        Report {
            trace,
            stats: self.stats,
        }
    }

    /// The most recently recorded failure.
    pub fn info(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Descriptions of the tests that are executing, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.tests
            .iter()
            .map(|test| test.description.clone())
            .collect()
    }

    /// Inert twins of the declaration and assertion primitives.
    pub fn disabled(&mut self) -> Disabled<'_> {
        Disabled::new(self)
    }

    // -----------------------------------------------------------------------
    // Driver
    // -----------------------------------------------------------------------

    fn execute(&mut self, suite: &Suite) -> Flow {
        self.run_hooks(&suite.before_all)?;
        for test in &suite.tests {
            self.run_hooks(&suite.before_each)?;
            self.enter(test)?;
            self.run_hooks(&suite.after_each)?;
        }
        self.run_hooks(&suite.after_all)
    }

    /// Run one test body and the suite it declares, then file their trace
    /// under the test's description.
    fn enter(&mut self, test: &Test) -> Flow {
        self.tests.push(test.clone());
        self.outer_traces.push(mem::take(&mut self.trace));
        let outer_suite = mem::take(&mut self.suite);
        debug!(test = %self.path().join(" "), "entering test");

        let mut flow = self.call(&test.body, &test.context, &test.origin);
        if flow.is_ok() {
            let nested = mem::take(&mut self.suite);
            flow = self.execute(&nested);
        }

        self.suite = outer_suite;
        let local = mem::replace(&mut self.trace, self.outer_traces.pop().unwrap_or_default());
        self.trace.push(Entry::Test {
            description: test.description.clone(),
            trace: local,
        });
        self.tests.pop();
        flow
    }

    fn run_hooks(&mut self, hooks: &[Hook]) -> Flow {
        for hook in hooks {
            trace!(hook = %hook.kind, "running hook");
            self.call(&hook.body, &hook.context, &hook.origin)?;
        }
        Ok(())
    }

    /// Invoke `body` against `context` inside the panic boundary.
    fn call(&mut self, body: &Body, context: &SandboxRef, origin: &Origin) -> Flow {
        let depth = self.contexts.len();
        self.contexts.push(Rc::clone(context));
        let body = Rc::clone(body);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(self)));
        // an injection interrupted by unwinding leaves its context behind
        self.contexts.truncate(depth + 1);

        let flow = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.record_uncaught(&Raised::Error(err), origin.clone());
                Ok(())
            }
            Err(payload) if payload.is::<StopSignal>() => Err(Halt),
            Err(payload) => {
                let raised = Raised::Panic(describe_panic(payload.as_ref()));
                self.record_uncaught(&raised, origin.clone());
                Ok(())
            }
        };
        self.contexts.truncate(depth);
        flow
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Count an assertion outcome; record a failure if it was not met.
    pub(crate) fn tally(
        &mut self,
        mode: Mode,
        holds: bool,
        failure: impl FnOnce() -> FailureBuilder,
    ) -> bool {
        let passed = match mode {
            Mode::Assert => holds,
            Mode::Negate => !holds,
        };
        if passed {
            self.stats.pass += 1;
        } else {
            self.stats.fail += 1;
            self.record(failure());
        }
        passed
    }

    /// Count and record an error nobody caught. `fallback` locates it when
    /// the error carries no backtrace.
    pub(crate) fn record_uncaught(&mut self, raised: &Raised, fallback: Origin) {
        self.stats.error += 1;
        let (origin, stack) = raised.location();
        let builder = FailureBuilder::new(FailureKind::Error, raised.to_string())
            .origin(origin.or(Some(fallback)))
            .stack(stack);
        self.record(builder);
    }

    fn record(&mut self, builder: FailureBuilder) {
        let context = self.context();
        let failure = builder.context(Some(&*context)).build(&mut self.sources);
        let path = self.path();
        debug!(test = %path.join(" "), kind = %failure.kind, "{}", failure.fail);

        let inspecting = self.options.debug && self.inspector.is_some();
        if !self.options.quiet {
            let shown = if inspecting {
                failure.overview()
            } else {
                failure.clone()
            };
            let details = Trace {
                entries: vec![Entry::Failure(shown)],
            };
            self.presenter.present(&Trace::qualified(&path, details));
        }
        if inspecting {
            if let Some(inspector) = self.inspector.as_mut() {
                inspector.inspect(&failure);
            }
        }

        self.trace.push(Entry::Failure(failure.clone()));
        self.last_failure = Some(failure);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("stats", &self.stats)
            .field("path", &self.path())
            .field("declared", &self.suite.tests.len())
            .field("shared", &self.shared)
            .field("running", &self.running)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
