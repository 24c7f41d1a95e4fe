//! Runtime Core - Foundation for lifecycle telemetry
//!
//! Provides core types, error handling, and run configuration shared by
//! the message hub, the lifecycle hooks, and the run simulator.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DatasetConfig, OptimizerConfig, ReporterConfig, RunConfig, TrainConfig};
pub use error::{Error, Result};
pub use types::*;
