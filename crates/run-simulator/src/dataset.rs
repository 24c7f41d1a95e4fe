//! Synthetic training dataset

use lifecycle::DatasetInfo;
use runtime_core::DatasetConfig;
use serde_json::{json, Value};

/// Dataset with no samples of its own; only its metainfo is observable
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    name: String,
    classes: Vec<String>,
}

impl SyntheticDataset {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            name: config.name.clone(),
            classes: config.classes.clone(),
        }
    }
}

impl DatasetInfo for SyntheticDataset {
    fn metainfo(&self) -> Option<Value> {
        if self.classes.is_empty() {
            return None;
        }
        Some(json!({
            "name": self.name,
            "classes": self.classes,
        }))
    }
}
