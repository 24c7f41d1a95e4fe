//! Run configuration types

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Main run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Experiment identifier (generated from the start time if not set)
    pub experiment_name: Option<String>,

    /// Global random seed
    pub seed: u64,

    /// Training loop settings
    pub train: TrainConfig,

    /// Optimizer settings
    pub optimizer: OptimizerConfig,

    /// Training dataset settings
    pub dataset: DatasetConfig,

    /// Progress reporter settings
    pub reporter: ReporterConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            experiment_name: None,
            seed: 42,
            train: TrainConfig::default(),
            optimizer: OptimizerConfig::default(),
            dataset: DatasetConfig::default(),
            reporter: ReporterConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the training loop cannot run
    pub fn validate(&self) -> Result<()> {
        if self.train.max_epochs == 0 {
            return Err(Error::InvalidConfig {
                message: "train.max_epochs must be at least 1".to_string(),
            });
        }
        if self.train.iters_per_epoch == 0 {
            return Err(Error::InvalidConfig {
                message: "train.iters_per_epoch must be at least 1".to_string(),
            });
        }
        if self.optimizer.groups.is_empty() {
            return Err(Error::InvalidConfig {
                message: "optimizer.groups must name at least one parameter group".to_string(),
            });
        }
        if self.optimizer.step_size == 0 {
            return Err(Error::InvalidConfig {
                message: "optimizer.step_size must be at least 1".to_string(),
            });
        }
        let max_iters = self.train.max_iters()?;
        if self.train.resume_epoch > self.train.max_epochs {
            return Err(Error::InvalidConfig {
                message: format!(
                    "train.resume_epoch {} is beyond max_epochs {}",
                    self.train.resume_epoch, self.train.max_epochs
                ),
            });
        }

        // The resume iteration must fall inside the resume epoch
        let first = self.train.epoch_start(self.train.resume_epoch)?;
        let last = self
            .train
            .resume_epoch
            .saturating_add(1)
            .saturating_mul(self.train.iters_per_epoch)
            .min(max_iters);
        if self.train.resume_iter < first || self.train.resume_iter > last {
            return Err(Error::InvalidConfig {
                message: format!(
                    "train.resume_iter {} is outside [{}, {}] for resume_epoch {}",
                    self.train.resume_iter, first, last, self.train.resume_epoch
                ),
            });
        }
        Ok(())
    }

    /// Render the configuration snapshot published as `cfg`
    pub fn pretty_text(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of training epochs
    pub max_epochs: u64,

    /// Iterations in every epoch
    pub iters_per_epoch: u64,

    /// Validate every N epochs (0 disables validation)
    pub val_interval: u64,

    /// Run a test epoch after training
    pub test_at_end: bool,

    /// Epoch to resume from
    pub resume_epoch: u64,

    /// Global iteration to resume from
    pub resume_iter: u64,
}

impl TrainConfig {
    /// Total iterations of the run
    pub fn max_iters(&self) -> Result<u64> {
        self.epoch_start(self.max_epochs)
    }

    /// Global iteration at which `epoch` begins
    pub fn epoch_start(&self, epoch: u64) -> Result<u64> {
        epoch
            .checked_mul(self.iters_per_epoch)
            .ok_or_else(|| Error::InvalidConfig {
                message: format!(
                    "epoch {} with {} iterations per epoch overflows the iteration counter",
                    epoch, self.iters_per_epoch
                ),
            })
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_epochs: 3,
            iters_per_epoch: 10,
            val_interval: 1,
            test_at_end: true,
            resume_epoch: 0,
            resume_iter: 0,
        }
    }
}

/// Optimizer configuration with a step-decay schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Base learning rate per parameter group
    pub groups: BTreeMap<String, f64>,

    /// Multiplicative decay applied every `step_size` epochs
    pub gamma: f64,

    /// Epochs between decays
    pub step_size: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert("lr".to_string(), 0.1);
        Self {
            groups,
            gamma: 0.1,
            step_size: 2,
        }
    }
}

/// Training dataset configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name
    pub name: String,

    /// Class names; the dataset exposes no metainfo when empty
    pub classes: Vec<String>,
}

/// Progress reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// How often the reporter reads the message hub
    #[serde(with = "millis_serde")]
    pub interval: Duration,

    /// Log a training line every N iterations (0 disables the logger hook)
    pub log_interval: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            log_interval: 5,
        }
    }
}

/// Duration serialization helper storing milliseconds
mod millis_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
