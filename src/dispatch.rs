//! The UI-context task queue.
//!
//! Views and cores are mutated on a single logical context. Work that has to happen later
//! (asynchronous native effects, settle retries) is posted to a [`Dispatcher`] as a deferred task
//! and runs when the host drives the queue with [`Dispatcher::run_pending`]. Nothing here ever
//! sleeps; waiting is expressed as a due time.
//!
//! Native callback threads that need to get back onto the UI context use a [`DispatchSender`].

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce(&Dispatcher) + Send>;

/// Source of the current time, as an offset from an arbitrary epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall clock.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Moves the clock forward to `time`. Never moves backwards.
    pub fn advance_to(&self, time: Duration) {
        let mut now = self.now.lock();
        if time > *now {
            *now = time;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

struct Scheduled {
    due: Duration,
    seq: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // reversed: BinaryHeap is a max-heap and the earliest task must come out first
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

/// Posts tasks to a dispatcher from any thread.
#[derive(Clone)]
pub struct DispatchSender {
    tx: Sender<Task>,
}

impl DispatchSender {
    /// Queues a task to run on the UI context as soon as it is driven.
    ///
    /// Returns false if the dispatcher no longer exists.
    pub fn post<F: FnOnce(&Dispatcher) + Send + 'static>(&self, task: F) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// Single-context cooperative task queue.
pub struct Dispatcher {
    clock: Arc<dyn Clock>,
    /// Set when the dispatcher owns a manual clock that `run_until_idle` may move.
    manual: Option<Arc<ManualClock>>,
    queue: Mutex<BinaryHeap<Scheduled>>,
    seq: AtomicU64,
    remote_tx: Sender<Task>,
    remote_rx: Receiver<Task>,
}

/// Upper bound on tasks run by one [`Dispatcher::run_until_idle`] call.
pub const IDLE_TASK_LIMIT: usize = 1_000_000;

impl Dispatcher {
    /// Creates a dispatcher driven by the wall clock.
    pub fn new() -> Dispatcher {
        Dispatcher::with_clock(Arc::new(SystemClock::new()))
    }

    /// Creates a dispatcher driven by a manual clock, which is returned alongside it.
    ///
    /// [`run_until_idle`](Dispatcher::run_until_idle) moves this clock to each next due time.
    pub fn manual() -> (Dispatcher, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let mut dispatcher = Dispatcher::with_clock(clock.clone());
        dispatcher.manual = Some(clock.clone());
        (dispatcher, clock)
    }

    /// Creates a dispatcher driven by `clock`. Time only moves as the clock says.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Dispatcher {
        let (remote_tx, remote_rx) = channel::unbounded();
        Dispatcher {
            clock,
            manual: None,
            queue: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            remote_tx,
            remote_rx,
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Returns a handle for posting from other threads.
    pub fn sender(&self) -> DispatchSender {
        DispatchSender {
            tx: self.remote_tx.clone(),
        }
    }

    /// Queues a task to run on the next drive.
    pub fn post<F: FnOnce(&Dispatcher) + Send + 'static>(&self, task: F) {
        self.post_after(Duration::from_millis(0), task);
    }

    /// Queues a task to run once `delay` has elapsed.
    pub fn post_after<F: FnOnce(&Dispatcher) + Send + 'static>(&self, delay: Duration, task: F) {
        self.schedule(self.now().saturating_add(delay), Box::new(task));
    }

    fn schedule(&self, due: Duration, task: Task) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.queue.lock().push(Scheduled { due, seq, task });
    }

    /// Number of tasks waiting, including ones that are not due yet.
    pub fn pending(&self) -> usize {
        self.queue.lock().len() + self.remote_rx.len()
    }

    /// Due time of the earliest queued task.
    pub fn next_due(&self) -> Option<Duration> {
        self.drain_remote();
        self.queue.lock().peek().map(|scheduled| scheduled.due)
    }

    fn drain_remote(&self) {
        let now = self.now();
        loop {
            match self.remote_rx.try_recv() {
                Ok(task) => self.schedule(now, task),
                Err(TryRecvError::Empty) => break,
                // we hold a sender ourselves
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn pop_due(&self) -> Option<Task> {
        let now = self.now();
        let mut queue = self.queue.lock();
        let ready = matches!(queue.peek(), Some(scheduled) if scheduled.due <= now);
        if ready {
            queue.pop().map(|scheduled| scheduled.task)
        } else {
            None
        }
    }

    /// Runs every task that is due, including tasks posted by those tasks for the current time.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        self.drain_remote();

        let mut count = 0;
        while let Some(task) = self.pop_due() {
            task(self);
            count += 1;
        }

        if count > 0 {
            tracing::trace!(count, "ran dispatcher tasks");
        }
        count
    }

    /// Runs tasks until the queue is empty, moving a [`manual`](Dispatcher::manual) clock
    /// forward to each next due time.
    ///
    /// Other clocks are never waited for: this returns as soon as no task is due.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        loop {
            count += self.run_pending();
            if count >= IDLE_TASK_LIMIT {
                tracing::warn!(count, "dispatcher did not become idle");
                return count;
            }
            match (self.next_due(), &self.manual) {
                (Some(due), Some(clock)) => clock.advance_to(due),
                _ => return count,
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}
