//! Append-only scalar history buffer

use runtime_core::{ScalarEntry, Step};
use serde::{Deserialize, Serialize};

/// Ordered, append-only series of scalar samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalarHistory {
    entries: Vec<ScalarEntry>,
}

impl ScalarHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    pub fn push(&mut self, value: f64, step: Option<Step>) {
        self.entries.push(ScalarEntry::new(value, step));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All samples in append order
    pub fn entries(&self) -> &[ScalarEntry] {
        &self.entries
    }

    /// Sample values in append order
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Most recent value
    pub fn current(&self) -> Option<f64> {
        self.entries.last().map(|e| e.value)
    }

    /// Step of the most recent sample that carried one
    pub fn latest_step(&self) -> Option<Step> {
        self.entries.iter().rev().find_map(|e| e.step)
    }

    /// Mean of the last `window` values
    pub fn mean(&self, window: usize) -> Option<f64> {
        let tail = self.tail(window);
        if tail.is_empty() {
            return None;
        }
        Some(tail.iter().map(|e| e.value).sum::<f64>() / tail.len() as f64)
    }

    /// Minimum of the last `window` values
    pub fn min(&self, window: usize) -> Option<f64> {
        self.tail(window).iter().map(|e| e.value).reduce(f64::min)
    }

    /// Maximum of the last `window` values
    pub fn max(&self, window: usize) -> Option<f64> {
        self.tail(window).iter().map(|e| e.value).reduce(f64::max)
    }

    fn tail(&self, window: usize) -> &[ScalarEntry] {
        let start = self.entries.len().saturating_sub(window);
        &self.entries[start..]
    }
}

impl Extend<ScalarEntry> for ScalarHistory {
    fn extend<I: IntoIterator<Item = ScalarEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
