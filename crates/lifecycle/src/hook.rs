//! Hook trait implemented by lifecycle observers

use crate::context::RunContext;
use crate::priority::Priority;
use runtime_core::{Iteration, Result, ScalarMap};
use serde_json::Value;

/// Observer notified at every lifecycle phase of a run.
///
/// Every phase has a no-op default so a hook only implements the phases it
/// reacts to. Callbacks run synchronously on the orchestrator's thread and
/// should return quickly. An error aborts the run.
pub trait Hook: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Position among hooks notified at the same phase
    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    /// Once, before any epoch or iteration begins
    fn before_run(&self, _ctx: &dyn RunContext) -> Result<()> {
        Ok(())
    }

    /// Once, after resume state is known and before the first epoch
    fn before_train(&self, _ctx: &dyn RunContext) -> Result<()> {
        Ok(())
    }

    /// Before the iterations of every epoch
    fn before_train_epoch(&self, _ctx: &dyn RunContext) -> Result<()> {
        Ok(())
    }

    /// Before the forward and backward pass of every iteration
    fn before_train_iter(
        &self,
        _ctx: &dyn RunContext,
        _batch_idx: Iteration,
        _data_batch: Option<&Value>,
    ) -> Result<()> {
        Ok(())
    }

    /// After the optimizer step of every iteration
    fn after_train_iter(
        &self,
        _ctx: &dyn RunContext,
        _batch_idx: Iteration,
        _data_batch: Option<&Value>,
        _outputs: Option<&ScalarMap>,
    ) -> Result<()> {
        Ok(())
    }

    /// After all iterations of a validation epoch
    fn after_val_epoch(&self, _ctx: &dyn RunContext, _metrics: Option<&ScalarMap>) -> Result<()> {
        Ok(())
    }

    /// After all iterations of a test epoch
    fn after_test_epoch(&self, _ctx: &dyn RunContext, _metrics: Option<&ScalarMap>) -> Result<()> {
        Ok(())
    }
}
