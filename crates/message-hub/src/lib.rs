//! Message hub: the runtime state registry of a training run
//!
//! Producers (the training loop, optimizers, evaluators) publish facts here;
//! consumers (loggers, checkpointers, progress displays) read them back by key
//! without holding a reference to the producer.
//!
//! Two kinds of entries share one key namespace:
//! - **Info values**: a single current fact, last write wins
//! - **Scalar histories**: an append-only `(value, step)` series
//!
//! # Example
//!
//! ```rust
//! use message_hub::MessageHub;
//!
//! let hub = MessageHub::new("example");
//! hub.update_info("epoch", &3).unwrap();
//! hub.update_scalar("train/loss", 0.42, None).unwrap();
//!
//! assert_eq!(hub.get_info_as::<u64>("epoch").unwrap(), 3);
//! assert_eq!(hub.get_scalar("train/loss").unwrap().current(), Some(0.42));
//! ```

mod history;
mod hub;

pub use history::ScalarHistory;
pub use hub::{HubEntry, HubSnapshot, MessageHub, MessageHubHandle, SharedHistory};

// Re-export types from runtime-core for convenience
pub use runtime_core::{EntryKind, Error, Result, ScalarEntry, Step};
