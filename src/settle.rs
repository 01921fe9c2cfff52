//! Waiting for asynchronous native effects.
//!
//! Native backends may defer or animate a resize or a scroll, so the effect of a call is only
//! observable some time later. A [`Settle`] evaluates a condition right away and then once per
//! [`SettlePolicy::interval`], by re-posting itself to the [`Dispatcher`], until the condition is
//! satisfied or the [`SettlePolicy::timeout`] budget is used up.
//!
//! The condition is told whether the current attempt is the last one. Earlier attempts should answer
//! with a tolerant "not yet"; the last attempt should apply the strict check and fail with a
//! descriptive error (see [`compare`]).

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlePolicy {
    /// Delay between two attempts.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Total time budget.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SettlePolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Number of condition evaluations in the budget.
    ///
    /// An attempt is the last one when at most one interval of budget is left.
    pub fn max_attempts(&self) -> u32 {
        if self.interval_ms == 0 {
            return 1;
        }
        let attempts = self.timeout_ms.div_ceil(self.interval_ms);
        attempts.clamp(1, u32::MAX as u64) as u32
    }
}

/// What a condition is told about the current evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,

    /// If true, a "not yet" answer fails the settle.
    pub last_try: bool,
}

/// Settle progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleState {
    /// Waiting; `attempt` evaluations have been made.
    Pending { attempt: u32 },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

pub type Condition = Box<dyn FnMut(Attempt) -> Result<bool> + Send>;
pub type Completion = Box<dyn FnOnce(Result<u32>) + Send>;

/// A bounded retry loop over a condition.
///
/// The completion callback runs exactly once, with the number of attempts on success. Dropping a
/// pending settle (or the dispatcher it is queued on) abandons it without calling back.
pub struct Settle {
    label: &'static str,
    policy: SettlePolicy,
    condition: Condition,
    on_done: Option<Completion>,
    state: SettleState,
}

impl Settle {
    pub fn new<P, C>(label: &'static str, policy: SettlePolicy, condition: P, on_done: C) -> Settle
    where
        P: FnMut(Attempt) -> Result<bool> + Send + 'static,
        C: FnOnce(Result<u32>) + Send + 'static,
    {
        Settle {
            label,
            policy,
            condition: Box::new(condition),
            on_done: Some(Box::new(on_done)),
            state: SettleState::Pending { attempt: 0 },
        }
    }

    pub fn state(&self) -> SettleState {
        self.state
    }

    /// Evaluates the condition once. Does nothing once the settle has finished.
    pub fn step(&mut self) -> SettleState {
        let attempt = match self.state {
            SettleState::Pending { attempt } => attempt + 1,
            finished => return finished,
        };
        let last_try = attempt >= self.policy.max_attempts();

        tracing::trace!(label = self.label, attempt, last_try, "settle attempt");

        let outcome = match (self.condition)(Attempt {
            number: attempt,
            last_try,
        }) {
            Ok(true) => Ok(attempt),
            Ok(false) if last_try => Err(Error::SettleTimeout { attempts: attempt }),
            Ok(false) => {
                self.state = SettleState::Pending { attempt };
                return self.state;
            }
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(_) => {
                tracing::debug!(label = self.label, attempts = attempt, "settled");
                self.state = SettleState::Succeeded { attempts: attempt };
            }
            Err(err) => {
                tracing::warn!(label = self.label, attempts = attempt, %err, "settle failed");
                self.state = SettleState::Failed { attempts: attempt };
            }
        }

        if let Some(on_done) = self.on_done.take() {
            on_done(outcome);
        }
        self.state
    }

    /// Makes the first attempt now and schedules the remaining ones on `dispatcher`.
    pub fn start(mut self, dispatcher: &Dispatcher) {
        if let SettleState::Pending { .. } = self.step() {
            let interval = self.policy.interval();
            dispatcher.post_after(interval, move |dispatcher| self.start(dispatcher));
        }
    }
}

/// True if `observed` is within `tolerance` of `expected`.
pub fn within_tolerance(observed: f64, expected: f64, tolerance: f64) -> bool {
    observed == expected || (observed - expected).abs() <= tolerance
}

/// Like [`within_tolerance`], but fails with [`Error::ToleranceViolation`].
pub fn require_within_tolerance(
    what: &'static str,
    observed: f64,
    expected: f64,
    tolerance: f64,
) -> Result<()> {
    if within_tolerance(observed, expected, tolerance) {
        Ok(())
    } else {
        Err(Error::ToleranceViolation {
            what,
            observed,
            expected,
            tolerance,
        })
    }
}

/// Condition helper: tolerant on early attempts, strict on the last one.
pub fn compare(
    attempt: Attempt,
    what: &'static str,
    observed: f64,
    expected: f64,
    tolerance: f64,
) -> Result<bool> {
    if attempt.last_try {
        require_within_tolerance(what, observed, expected, tolerance).map(|_| true)
    } else {
        Ok(within_tolerance(observed, expected, tolerance))
    }
}
