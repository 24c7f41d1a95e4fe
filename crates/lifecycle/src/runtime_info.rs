//! Hook publishing runtime information into the message hub
//!
//! Components that cannot reach the training loop (loggers, checkpointers,
//! progress displays) read the current epoch, iteration, learning rates and
//! reported metrics back from the hub under the keys in [`keys`].

use crate::context::RunContext;
use crate::hook::Hook;
use crate::priority::Priority;
use message_hub::MessageHubHandle;
use runtime_core::{Error, Iteration, Result, ScalarMap};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Message hub keys written by [`RuntimeInfoHook`]
pub mod keys {
    pub const CFG: &str = "cfg";
    pub const SEED: &str = "seed";
    pub const EXPERIMENT_NAME: &str = "experiment_name";
    /// Version of the training stack, `<crate version>+<git hash>`.
    /// Named after the runtime so it cannot clash with a model or dataset
    /// version a user publishes under `version`.
    pub const VERSION: &str = "runtime_version";
    pub const EPOCH: &str = "epoch";
    pub const ITER: &str = "iter";
    pub const MAX_EPOCHS: &str = "max_epochs";
    pub const MAX_ITERS: &str = "max_iters";
    pub const DATASET_META: &str = "dataset_meta";

    pub const TRAIN_PREFIX: &str = "train/";
    pub const VAL_PREFIX: &str = "val/";
    pub const TEST_PREFIX: &str = "test/";

    /// Scalar key for `name` under a mode prefix, e.g. `train/loss`
    pub fn scalar_key(prefix: &str, name: &str) -> String {
        format!("{}{}", prefix, name)
    }
}

/// Publishes epoch, iteration, learning rate and metric updates to the hub.
///
/// Runs at very high priority so hooks reading these keys in the same phase
/// see the values of the current step. Holds no state besides the hub handle.
pub struct RuntimeInfoHook {
    hub: MessageHubHandle,
}

impl RuntimeInfoHook {
    pub fn new(hub: MessageHubHandle) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &MessageHubHandle {
        &self.hub
    }

    /// Append every value under `prefix` as one batch
    fn publish_scalars(&self, prefix: &str, values: Option<&ScalarMap>) -> Result<()> {
        match values {
            Some(values) => self.hub.update_scalars(
                values
                    .iter()
                    .map(|(name, value)| (keys::scalar_key(prefix, name), *value)),
                None,
            ),
            None => Ok(()),
        }
    }
}

impl Hook for RuntimeInfoHook {
    fn name(&self) -> &str {
        "RuntimeInfoHook"
    }

    fn priority(&self) -> Priority {
        Priority::VERY_HIGH
    }

    fn before_run(&self, ctx: &dyn RunContext) -> Result<()> {
        self.hub.update_info_dict([
            (keys::CFG, json!(ctx.config_text())),
            (keys::SEED, json!(ctx.seed())),
            (keys::EXPERIMENT_NAME, json!(ctx.experiment_name())),
            (keys::VERSION, json!(ctx.version())),
        ])?;
        info!(
            experiment = ctx.experiment_name(),
            seed = ctx.seed(),
            "Published run metadata"
        );
        Ok(())
    }

    fn before_train(&self, ctx: &dyn RunContext) -> Result<()> {
        self.hub.update_info(keys::EPOCH, &ctx.epoch())?;
        self.hub.update_info(keys::ITER, &ctx.iter())?;
        self.hub.update_info(keys::MAX_EPOCHS, &ctx.max_epochs())?;
        self.hub.update_info(keys::MAX_ITERS, &ctx.max_iters())?;
        if let Some(meta) = ctx.train_dataset().and_then(|d| d.metainfo()) {
            self.hub.update_info(keys::DATASET_META, &meta)?;
        }
        info!(
            epoch = ctx.epoch(),
            iter = ctx.iter(),
            max_epochs = ?ctx.max_epochs(),
            max_iters = ?ctx.max_iters(),
            "Published training state"
        );
        Ok(())
    }

    fn before_train_epoch(&self, ctx: &dyn RunContext) -> Result<()> {
        self.hub.update_info(keys::EPOCH, &ctx.epoch())
    }

    fn before_train_iter(
        &self,
        ctx: &dyn RunContext,
        _batch_idx: Iteration,
        _data_batch: Option<&Value>,
    ) -> Result<()> {
        self.hub.update_info(keys::ITER, &ctx.iter())?;

        let lr = ctx.optimizer().get_lr();
        let rates = first_lr_per_group(&lr)?;
        self.hub.update_scalars(
            rates
                .into_iter()
                .map(|(group, rate)| (keys::scalar_key(keys::TRAIN_PREFIX, group), rate)),
            None,
        )?;
        debug!(iter = ctx.iter(), "Published learning rates");
        Ok(())
    }

    fn after_train_iter(
        &self,
        _ctx: &dyn RunContext,
        _batch_idx: Iteration,
        _data_batch: Option<&Value>,
        outputs: Option<&ScalarMap>,
    ) -> Result<()> {
        self.publish_scalars(keys::TRAIN_PREFIX, outputs)
    }

    fn after_val_epoch(&self, _ctx: &dyn RunContext, metrics: Option<&ScalarMap>) -> Result<()> {
        self.publish_scalars(keys::VAL_PREFIX, metrics)
    }

    fn after_test_epoch(&self, _ctx: &dyn RunContext, metrics: Option<&ScalarMap>) -> Result<()> {
        self.publish_scalars(keys::TEST_PREFIX, metrics)
    }
}

/// Validate a learning rate report and take the first rate of every group.
///
/// The whole report is checked before anything is returned. The rates are
/// then appended as one batch, so neither a malformed group nor a key
/// collision leaves part of the report in the hub.
fn first_lr_per_group(lr: &Value) -> Result<Vec<(&str, f64)>> {
    let groups = lr.as_object().ok_or_else(|| Error::ContractViolation {
        message: format!(
            "optimizer get_lr() should return a mapping of parameter group to learning rates, got {}",
            json_type(lr)
        ),
    })?;

    groups
        .iter()
        .map(|(group, rates)| {
            rates
                .as_array()
                .and_then(|r| r.first())
                .and_then(Value::as_f64)
                .map(|rate| (group.as_str(), rate))
                .ok_or_else(|| Error::ContractViolation {
                    message: format!(
                        "learning rates of group '{}' should be a non-empty list of numbers, got {}",
                        group, rates
                    ),
                })
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
