//! Logger hook reading training state back from the message hub

use lifecycle::{keys, Hook, Iteration, Priority, RunContext, ScalarMap};
use message_hub::MessageHubHandle;
use runtime_core::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Emits a progress line every `interval` training iterations.
///
/// Never touches the runner's counters directly: epoch, iteration and the
/// `train/` scalars all come from the hub, which is why it runs after
/// [`lifecycle::RuntimeInfoHook`].
pub struct LoggerHook {
    hub: MessageHubHandle,
    interval: u64,
    lines: AtomicU64,
}

impl LoggerHook {
    pub fn new(hub: MessageHubHandle, interval: u64) -> Self {
        Self {
            hub,
            interval: interval.max(1),
            lines: AtomicU64::new(0),
        }
    }

    /// Number of progress lines emitted so far
    pub fn lines_emitted(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    /// Format the current training line from hub contents
    pub fn format_line(&self) -> Result<String> {
        let epoch: u64 = self.hub.get_info_as(keys::EPOCH)?;
        let iter: u64 = self.hub.get_info_as(keys::ITER)?;
        let max_iters: Option<u64> = self.hub.get_info_as(keys::MAX_ITERS)?;

        let mut line = match max_iters {
            Some(max) => format!("Epoch(train) [{}] [{}/{}]", epoch + 1, iter + 1, max),
            None => format!("Epoch(train) [{}] [{}]", epoch + 1, iter + 1),
        };
        for key in self.hub.scalar_keys() {
            if let Some(name) = key.strip_prefix(keys::TRAIN_PREFIX) {
                if let Some(value) = self.hub.with_scalar(&key, |h| h.current())? {
                    line.push_str(&format!("  {}: {:.4}", name, value));
                }
            }
        }
        Ok(line)
    }
}

impl Hook for LoggerHook {
    fn name(&self) -> &str {
        "LoggerHook"
    }

    fn priority(&self) -> Priority {
        Priority::BELOW_NORMAL
    }

    fn after_train_iter(
        &self,
        _ctx: &dyn RunContext,
        batch_idx: Iteration,
        _data_batch: Option<&Value>,
        _outputs: Option<&ScalarMap>,
    ) -> Result<()> {
        if (batch_idx + 1) % self.interval != 0 {
            return Ok(());
        }
        let line = self.format_line()?;
        self.lines.fetch_add(1, Ordering::Relaxed);
        info!("{}", line);
        Ok(())
    }
}
