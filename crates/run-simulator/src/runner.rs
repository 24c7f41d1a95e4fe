//! Epoch-based training loop driving lifecycle hooks

use crate::dataset::SyntheticDataset;
use crate::optimizer::StepDecayOptimizer;
use chrono::Utc;
use lifecycle::{
    DatasetInfo, Epoch, HookDispatcher, Iteration, LifecycleEvent, OptimizerState, RunContext,
};
use runtime_core::{Result, RunConfig, ScalarMap};
use serde_json::json;
use tracing::info;

/// Counters reached at the end of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub epochs: Epoch,
    pub iters: Iteration,
    pub final_loss: Option<f64>,
}

/// Simulated training run.
///
/// Produces a deterministic loss curve and evaluation metrics while firing
/// every lifecycle phase in order. Hooks observe the runner only through
/// [`RunContext`].
pub struct SimulatedRunner {
    config: RunConfig,
    config_text: String,
    experiment_name: String,
    optimizer: StepDecayOptimizer,
    dataset: SyntheticDataset,
    epoch: Epoch,
    iter: Iteration,
}

impl SimulatedRunner {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let config_text = config.pretty_text()?;
        let experiment_name = config
            .experiment_name
            .clone()
            .unwrap_or_else(|| Utc::now().format("run_%Y%m%d_%H%M%S").to_string());

        Ok(Self {
            optimizer: StepDecayOptimizer::new(&config.optimizer),
            dataset: SyntheticDataset::new(&config.dataset),
            config,
            config_text,
            experiment_name,
            epoch: 0,
            iter: 0,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run training to completion, then the optional test epoch
    pub fn run(&mut self, dispatcher: &mut HookDispatcher) -> Result<RunSummary> {
        let train = self.config.train.clone();
        info!(
            experiment = %self.experiment_name,
            max_epochs = train.max_epochs,
            iters_per_epoch = train.iters_per_epoch,
            "Starting simulated run"
        );

        dispatcher.dispatch(&*self, LifecycleEvent::BeforeRun)?;

        self.epoch = train.resume_epoch;
        self.iter = train.resume_iter;
        self.optimizer.set_epoch(self.epoch);
        if self.epoch > 0 || self.iter > 0 {
            info!(epoch = self.epoch, iter = self.iter, "Resuming training");
        }
        dispatcher.dispatch(&*self, LifecycleEvent::BeforeTrain)?;

        let mut final_loss = None;
        while self.epoch < train.max_epochs {
            self.optimizer.set_epoch(self.epoch);
            dispatcher.dispatch(&*self, LifecycleEvent::BeforeTrainEpoch)?;

            let epoch_end = train.epoch_start(self.epoch + 1)?;
            while self.iter < epoch_end {
                let batch_idx = self.iter % train.iters_per_epoch;
                let data_batch = json!({ "batch_idx": batch_idx, "epoch": self.epoch });

                dispatcher.dispatch(
                    &*self,
                    LifecycleEvent::BeforeTrainIter {
                        batch_idx,
                        data_batch: Some(&data_batch),
                    },
                )?;

                let outputs = self.train_step();
                final_loss = outputs.get("loss").copied();
                dispatcher.dispatch(
                    &*self,
                    LifecycleEvent::AfterTrainIter {
                        batch_idx,
                        data_batch: Some(&data_batch),
                        outputs: Some(&outputs),
                    },
                )?;
                self.iter += 1;
            }

            self.epoch += 1;
            if train.val_interval > 0 && self.epoch % train.val_interval == 0 {
                let metrics = self.evaluate();
                dispatcher.dispatch(
                    &*self,
                    LifecycleEvent::AfterValEpoch {
                        metrics: Some(&metrics),
                    },
                )?;
            }
        }

        if train.test_at_end {
            let metrics = self.evaluate();
            dispatcher.dispatch(
                &*self,
                LifecycleEvent::AfterTestEpoch {
                    metrics: Some(&metrics),
                },
            )?;
        }

        info!(epoch = self.epoch, iter = self.iter, "Simulated run finished");
        Ok(RunSummary {
            epochs: self.epoch,
            iters: self.iter,
            final_loss,
        })
    }

    /// Loss of the current iteration
    fn train_step(&self) -> ScalarMap {
        let loss = 2.0 / (1.0 + 0.1 * self.iter as f64);
        ScalarMap::from([("loss".to_string(), loss)])
    }

    /// Metrics after the completed epochs
    fn evaluate(&self) -> ScalarMap {
        let accuracy = 1.0 - 0.5 / (1.0 + self.epoch as f64);
        ScalarMap::from([("accuracy".to_string(), accuracy)])
    }
}

impl RunContext for SimulatedRunner {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn iter(&self) -> Iteration {
        self.iter
    }

    fn max_epochs(&self) -> Option<Epoch> {
        Some(self.config.train.max_epochs)
    }

    fn max_iters(&self) -> Option<Iteration> {
        self.config.train.max_iters().ok()
    }

    fn seed(&self) -> u64 {
        self.config.seed
    }

    fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    fn config_text(&self) -> &str {
        &self.config_text
    }

    fn version(&self) -> String {
        format!(
            "{}+{}",
            env!("CARGO_PKG_VERSION"),
            option_env!("RUN_SIMULATOR_GIT_HASH").unwrap_or("unknown")
        )
    }

    fn optimizer(&self) -> &dyn OptimizerState {
        &self.optimizer
    }

    fn train_dataset(&self) -> Option<&dyn DatasetInfo> {
        Some(&self.dataset)
    }
}
