//! Step-decay learning rate schedule over named parameter groups

use lifecycle::{Epoch, OptimizerState};
use runtime_core::OptimizerConfig;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Optimizer reporting `base * gamma^(epoch / step_size)` for every group
#[derive(Debug, Clone)]
pub struct StepDecayOptimizer {
    base: BTreeMap<String, f64>,
    gamma: f64,
    step_size: u64,
    epoch: Epoch,
}

impl StepDecayOptimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            base: config.groups.clone(),
            gamma: config.gamma,
            step_size: config.step_size.max(1),
            epoch: 0,
        }
    }

    /// Move the schedule to `epoch`
    pub fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch;
    }

    /// Current learning rate of `group`
    pub fn lr(&self, group: &str) -> Option<f64> {
        let decays = (self.epoch / self.step_size) as i32;
        self.base.get(group).map(|base| base * self.gamma.powi(decays))
    }
}

impl OptimizerState for StepDecayOptimizer {
    fn get_lr(&self) -> Value {
        let groups: Map<String, Value> = self
            .base
            .keys()
            .filter_map(|name| {
                self.lr(name)
                    .map(|lr| (name.clone(), Value::from(vec![lr])))
            })
            .collect();
        Value::Object(groups)
    }
}
