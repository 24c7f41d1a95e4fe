//! Reference training loop for the lifecycle telemetry stack
//!
//! This crate provides:
//! - **`SimulatedRunner`**: an epoch-based loop firing every lifecycle phase
//! - **`StepDecayOptimizer`** and **`SyntheticDataset`**: collaborators the runner exposes to hooks
//! - **`LoggerHook`**: a hub consumer registered behind `RuntimeInfoHook`
//! - **Progress reporter**: a tokio task reading the hub concurrently with training

mod dataset;
mod logger;
mod optimizer;
mod reporter;
mod runner;

pub use dataset::SyntheticDataset;
pub use logger::LoggerHook;
pub use optimizer::StepDecayOptimizer;
pub use reporter::{
    read_progress, spawn_progress_reporter, Progress, ShutdownReceiver, ShutdownSender,
};
pub use runner::{RunSummary, SimulatedRunner};
