#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use viewcore::headless::{self, HeadlessConfig};
use viewcore::{CoreRegistry, Dispatcher, Handle, ManualClock};

/// Installs a test-writer subscriber. `RUST_LOG` selects what is shown.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A headless provider on a manually driven dispatcher.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub dispatcher: Handle<Dispatcher>,
    pub provider: CoreRegistry,
}

impl Fixture {
    pub fn new(config: HeadlessConfig) -> Fixture {
        init_logging();
        let (dispatcher, clock) = Dispatcher::manual();
        let dispatcher = Handle::new(dispatcher);
        let provider = headless::registry(config, dispatcher.clone());
        Fixture {
            clock,
            dispatcher,
            provider,
        }
    }

    /// Runs the dispatcher until nothing is left, moving the clock as needed.
    pub fn run(&self) -> usize {
        self.dispatcher.run_until_idle()
    }
}

/// Slot for a completion callback's result.
pub struct Outcome<T>(Arc<Mutex<Option<T>>>);

impl<T: Send + 'static> Outcome<T> {
    pub fn new() -> Outcome<T> {
        Outcome(Arc::new(Mutex::new(None)))
    }

    pub fn setter(&self) -> impl FnOnce(T) + Send + 'static {
        let slot = self.0.clone();
        move |value| *slot.lock() = Some(value)
    }

    pub fn take(&self) -> T {
        self.0.lock().take().expect("completion was not called")
    }

    pub fn is_set(&self) -> bool {
        self.0.lock().is_some()
    }
}
