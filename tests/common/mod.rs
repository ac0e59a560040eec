//! Shared test helpers for integration tests

use nestest::{Engine, Failure, Inspector, Options, Presenter, Stats, Trace};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Send engine events to the captured test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An engine that presents nothing on its own.
pub fn quiet_engine() -> Engine {
    init_tracing();
    Engine::with_options(Options::default().with_quiet(true))
}

/// Ordered record of what ran, shared between closures.
pub type Events = Rc<RefCell<Vec<String>>>;

#[allow(dead_code)]
pub fn events() -> Events {
    Rc::new(RefCell::new(Vec::new()))
}

#[allow(dead_code)]
pub fn push(events: &Events, event: &str) {
    events.borrow_mut().push(event.to_string());
}

#[allow(dead_code)]
pub fn recorded(events: &Events) -> Vec<String> {
    events.borrow().clone()
}

/// Messages of every failure in `trace`, depth-first.
#[allow(dead_code)]
pub fn failure_messages(trace: &Trace) -> Vec<String> {
    trace
        .all_failures()
        .into_iter()
        .map(|(_, failure)| failure.fail.clone())
        .collect()
}

/// Presenter that keeps what it is shown.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Collector {
    pub traces: Rc<RefCell<Vec<Trace>>>,
    pub summaries: Rc<RefCell<Vec<Stats>>>,
}

impl Presenter for Collector {
    fn present(&mut self, trace: &Trace) {
        self.traces.borrow_mut().push(trace.clone());
    }

    fn summary(&mut self, stats: &Stats) {
        self.summaries.borrow_mut().push(*stats);
    }
}

/// Inspector that keeps the failures it was asked about.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Recorder {
    pub inspected: Rc<RefCell<Vec<Failure>>>,
}

impl Inspector for Recorder {
    fn inspect(&mut self, failure: &Failure) {
        self.inspected.borrow_mut().push(failure.clone());
    }
}
