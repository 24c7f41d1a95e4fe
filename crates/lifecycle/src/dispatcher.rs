//! Priority-ordered delivery of lifecycle events to registered hooks

use crate::context::RunContext;
use crate::hook::Hook;
use crate::phase::{LifecycleEvent, Phase, PhaseTracker};
use runtime_core::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Registered hooks in execution order, plus the phase order check
#[derive(Default)]
pub struct HookDispatcher {
    hooks: Vec<Arc<dyn Hook>>,
    tracker: PhaseTracker,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook behind every hook of equal or higher priority
    pub fn register(&mut self, hook: Arc<dyn Hook>) {
        let priority = hook.priority();
        let position = self
            .hooks
            .iter()
            .position(|h| h.priority() > priority)
            .unwrap_or(self.hooks.len());

        info!(
            hook = hook.name(),
            priority = %priority,
            position = position,
            "Hook registered"
        );
        self.hooks.insert(position, hook);
    }

    /// Hook names in execution order
    pub fn hook_names(&self) -> Vec<String> {
        self.hooks.iter().map(|h| h.name().to_string()).collect()
    }

    /// Last phase dispatched
    pub fn last_phase(&self) -> Option<Phase> {
        self.tracker.last()
    }

    /// Deliver `event` to every hook in priority order.
    ///
    /// The first hook error stops delivery and is returned unchanged.
    pub fn dispatch(&mut self, ctx: &dyn RunContext, event: LifecycleEvent<'_>) -> Result<()> {
        let phase = event.phase();
        if let Err(e) = self.tracker.advance(phase) {
            error!(phase = %phase, error = %e, "Lifecycle phase fired out of order");
            return Err(e);
        }

        for hook in &self.hooks {
            let result = match event {
                LifecycleEvent::BeforeRun => hook.before_run(ctx),
                LifecycleEvent::BeforeTrain => hook.before_train(ctx),
                LifecycleEvent::BeforeTrainEpoch => hook.before_train_epoch(ctx),
                LifecycleEvent::BeforeTrainIter {
                    batch_idx,
                    data_batch,
                } => hook.before_train_iter(ctx, batch_idx, data_batch),
                LifecycleEvent::AfterTrainIter {
                    batch_idx,
                    data_batch,
                    outputs,
                } => hook.after_train_iter(ctx, batch_idx, data_batch, outputs),
                LifecycleEvent::AfterValEpoch { metrics } => hook.after_val_epoch(ctx, metrics),
                LifecycleEvent::AfterTestEpoch { metrics } => hook.after_test_epoch(ctx, metrics),
            };

            if let Err(e) = result {
                warn!(hook = hook.name(), phase = %phase, error = %e, "Hook failed");
                return Err(e);
            }
        }
        Ok(())
    }
}
