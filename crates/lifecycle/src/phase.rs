//! Lifecycle phases, their payloads, and call-order tracking

use runtime_core::{Error, Iteration, Result, ScalarMap};
use serde_json::Value;
use std::fmt;

/// Named point in a run at which hooks are notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeRun,
    BeforeTrain,
    BeforeTrainEpoch,
    BeforeTrainIter,
    AfterTrainIter,
    AfterValEpoch,
    AfterTestEpoch,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeRun => "before_run",
            Phase::BeforeTrain => "before_train",
            Phase::BeforeTrainEpoch => "before_train_epoch",
            Phase::BeforeTrainIter => "before_train_iter",
            Phase::AfterTrainIter => "after_train_iter",
            Phase::AfterValEpoch => "after_val_epoch",
            Phase::AfterTestEpoch => "after_test_epoch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle notification together with its phase-specific payload
#[derive(Debug, Clone, Copy)]
pub enum LifecycleEvent<'a> {
    BeforeRun,
    BeforeTrain,
    BeforeTrainEpoch,
    BeforeTrainIter {
        batch_idx: Iteration,
        data_batch: Option<&'a Value>,
    },
    AfterTrainIter {
        batch_idx: Iteration,
        data_batch: Option<&'a Value>,
        /// Absent when the step was skipped or accumulated
        outputs: Option<&'a ScalarMap>,
    },
    AfterValEpoch {
        metrics: Option<&'a ScalarMap>,
    },
    AfterTestEpoch {
        metrics: Option<&'a ScalarMap>,
    },
}

impl LifecycleEvent<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            LifecycleEvent::BeforeRun => Phase::BeforeRun,
            LifecycleEvent::BeforeTrain => Phase::BeforeTrain,
            LifecycleEvent::BeforeTrainEpoch => Phase::BeforeTrainEpoch,
            LifecycleEvent::BeforeTrainIter { .. } => Phase::BeforeTrainIter,
            LifecycleEvent::AfterTrainIter { .. } => Phase::AfterTrainIter,
            LifecycleEvent::AfterValEpoch { .. } => Phase::AfterValEpoch,
            LifecycleEvent::AfterTestEpoch { .. } => Phase::AfterTestEpoch,
        }
    }
}

/// State machine rejecting phases fired out of order.
///
/// `before_run` comes first and only once. `before_train` follows it once.
/// Epoch and iteration starts need training to have begun, and nothing but
/// `after_train_iter` may interrupt an iteration.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    last: Option<Phase>,
    train_started: bool,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted phase
    pub fn last(&self) -> Option<Phase> {
        self.last
    }

    /// Record `next` if it may follow the phases seen so far
    pub fn advance(&mut self, next: Phase) -> Result<()> {
        let run_started = self.last.is_some();
        let mid_iter = self.last == Some(Phase::BeforeTrainIter);

        let allowed = match next {
            Phase::BeforeRun => !run_started,
            Phase::BeforeTrain => run_started && !self.train_started && !mid_iter,
            Phase::BeforeTrainEpoch | Phase::BeforeTrainIter => self.train_started && !mid_iter,
            Phase::AfterTrainIter => mid_iter,
            Phase::AfterValEpoch | Phase::AfterTestEpoch => run_started && !mid_iter,
        };

        if !allowed {
            return Err(Error::PhaseOrder {
                previous: self
                    .last
                    .map(|p| p.as_str())
                    .unwrap_or("<start>")
                    .to_string(),
                next: next.as_str().to_string(),
            });
        }

        if next == Phase::BeforeTrain {
            self.train_started = true;
        }
        self.last = Some(next);
        Ok(())
    }
}
