//! Training lifecycle contract and the runtime info bridge
//!
//! This crate provides:
//! - **Phases and events** describing the points of a run at which observers are notified
//! - **Hooks** with priorities, dispatched in a stable priority order
//! - **Run context traits**: the narrow view of the orchestrator hooks read from
//! - **`RuntimeInfoHook`**, which republishes run state into the message hub
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lifecycle::{HookDispatcher, LifecycleEvent, RuntimeInfoHook};
//! use message_hub::MessageHub;
//!
//! let hub = Arc::new(MessageHub::new("run"));
//! let mut dispatcher = HookDispatcher::new();
//! dispatcher.register(Arc::new(RuntimeInfoHook::new(Arc::clone(&hub))));
//!
//! // `runner` implements `RunContext`
//! dispatcher.dispatch(&runner, LifecycleEvent::BeforeRun)?;
//! let seed: u64 = hub.get_info_as("seed")?;
//! ```

mod context;
mod dispatcher;
mod hook;
mod phase;
mod priority;
mod runtime_info;


pub use context::{DatasetInfo, OptimizerState, RunContext};
pub use dispatcher::HookDispatcher;
pub use hook::Hook;
pub use phase::{LifecycleEvent, Phase, PhaseTracker};
pub use priority::Priority;
pub use runtime_info::{keys, RuntimeInfoHook};

// Re-export types from runtime-core for convenience
pub use runtime_core::{Epoch, Error, Iteration, Result, ScalarMap};
