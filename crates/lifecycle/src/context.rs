//! Narrow views of the orchestrator exposed to hooks

use runtime_core::{Epoch, Iteration};
use serde_json::Value;

/// Optimizer state query
pub trait OptimizerState: Send + Sync {
    /// Current learning rates.
    ///
    /// Expected to be an object mapping each parameter group name to a
    /// non-empty array of learning rates. The value is left untyped because
    /// optimizer wrappers are supplied by the caller; hooks validate the shape.
    fn get_lr(&self) -> Value;
}

/// Dataset metadata query
pub trait DatasetInfo: Send + Sync {
    /// Dataset metainfo, if the dataset exposes any
    fn metainfo(&self) -> Option<Value>;
}

/// Read-only view of the orchestrator state a hook may consult
pub trait RunContext {
    /// Current epoch
    fn epoch(&self) -> Epoch;

    /// Current global iteration
    fn iter(&self) -> Iteration;

    /// Total epochs, unset for iteration-based runs
    fn max_epochs(&self) -> Option<Epoch>;

    /// Total iterations, unset when the run is unbounded
    fn max_iters(&self) -> Option<Iteration>;

    fn seed(&self) -> u64;

    fn experiment_name(&self) -> &str;

    /// Serialized configuration snapshot
    fn config_text(&self) -> &str;

    /// Version and build identifier of the running code
    fn version(&self) -> String;

    fn optimizer(&self) -> &dyn OptimizerState;

    /// Active training dataset, if there is one
    fn train_dataset(&self) -> Option<&dyn DatasetInfo>;
}
