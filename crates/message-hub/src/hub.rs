//! Runtime state registry shared across a training run

use crate::history::ScalarHistory;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use runtime_core::{EntryKind, Error, Result, ScalarEntry, Step};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Scalar history with its own lock, so readers never hold a map shard
pub type SharedHistory = Arc<RwLock<ScalarHistory>>;

/// Value stored under a hub key
#[derive(Debug, Clone)]
pub enum HubEntry {
    /// Current fact, overwritten on every update
    Info(Value),

    /// Scalar time series, appended on every update
    Scalar(SharedHistory),
}

impl HubEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            HubEntry::Info(_) => EntryKind::Info,
            HubEntry::Scalar(_) => EntryKind::Scalar,
        }
    }
}

/// Point-in-time copy of every hub entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubSnapshot {
    /// Hub name
    pub name: String,

    /// Info values by key
    pub info: BTreeMap<String, Value>,

    /// Scalar histories by key. Non-finite samples serialize as the strings
    /// `"NaN"`, `"inf"` and `"-inf"`.
    pub scalars: BTreeMap<String, Vec<ScalarEntry>>,
}

/// Thread-safe store of runtime info values and scalar histories.
///
/// Keys are locked individually, so writers to distinct keys proceed in
/// parallel. Batches and snapshots take the batch gate exclusively, which
/// keeps a batch invisible to readers until all of it has landed. Shared
/// acquisitions of the gate are recursive: a reader may call back into the
/// hub while a batch writer is queued.
pub struct MessageHub {
    /// Hub name, used in logs
    name: String,

    /// Map of key to entry
    entries: DashMap<String, HubEntry>,

    /// Shared for single-key operations, exclusive for batches and snapshots
    batch_gate: RwLock<()>,
}

impl MessageHub {
    /// Create an empty hub
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(hub = %name, "Message hub created");
        Self {
            name,
            entries: DashMap::new(),
            batch_gate: RwLock::new(()),
        }
    }

    /// Hub name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrite the info value under `key`.
    ///
    /// Info values are JSON, so a non-finite float is stored as `null`.
    /// Publish such values as scalars to keep them.
    pub fn update_info<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let _gate = self.batch_gate.read_recursive();
        self.put_info(key, value)
    }

    /// Overwrite several info values as one batch.
    ///
    /// Either every key is written or, on a kind mismatch, none is.
    pub fn update_info_dict<K, V, I>(&self, values: I) -> Result<()>
    where
        K: Into<String>,
        V: Serialize,
        I: IntoIterator<Item = (K, V)>,
    {
        let batch = values
            .into_iter()
            .map(|(k, v)| Ok((k.into(), serde_json::to_value(v)?)))
            .collect::<Result<Vec<(String, Value)>>>()?;

        let _gate = self.batch_gate.write();
        for (key, _) in &batch {
            self.expect_kind(key, EntryKind::Info)?;
        }
        for (key, value) in batch {
            self.put_info(&key, value)?;
        }
        Ok(())
    }

    /// Append `(value, step)` to the scalar history under `key`
    pub fn update_scalar(&self, key: &str, value: f64, step: Option<Step>) -> Result<()> {
        let _gate = self.batch_gate.read_recursive();
        self.scalar_slot(key)?.write().push(value, step);
        debug!(hub = %self.name, key = key, value = value, step = ?step, "Scalar updated");
        Ok(())
    }

    /// Append one sample per key as a single batch.
    ///
    /// Readers see either none or all of the samples. If any key already
    /// holds an info value, nothing is appended.
    pub fn update_scalars<K, I>(&self, values: I, step: Option<Step>) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let batch: Vec<(String, f64)> = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if batch.is_empty() {
            return Ok(());
        }

        let _gate = self.batch_gate.write();
        for (key, _) in &batch {
            self.expect_kind(key, EntryKind::Scalar)?;
        }
        for (key, value) in &batch {
            self.scalar_slot(key)?.write().push(*value, step);
        }
        debug!(hub = %self.name, count = batch.len(), step = ?step, "Scalars updated");
        Ok(())
    }

    /// Current info value under `key`
    pub fn get_info(&self, key: &str) -> Result<Value> {
        let _gate = self.batch_gate.read_recursive();
        match self.entries.get(key).as_deref() {
            Some(HubEntry::Info(value)) => Ok(value.clone()),
            Some(HubEntry::Scalar(_)) => Err(mismatch(key, EntryKind::Info, EntryKind::Scalar)),
            None => Err(not_found(key)),
        }
    }

    /// Current info value under `key`, deserialized into `T`
    pub fn get_info_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get_info(key)?)?)
    }

    /// Copy of the scalar history under `key`
    pub fn get_scalar(&self, key: &str) -> Result<ScalarHistory> {
        self.with_scalar(key, ScalarHistory::clone)
    }

    /// Run `f` against the scalar history under `key` without copying it.
    ///
    /// `f` may read from the hub, but must not write to it: the history stays
    /// read-locked and batch writers stay excluded until `f` returns.
    pub fn with_scalar<R>(&self, key: &str, f: impl FnOnce(&ScalarHistory) -> R) -> Result<R> {
        let _gate = self.batch_gate.read_recursive();
        let history = match self.entries.get(key).as_deref() {
            Some(HubEntry::Scalar(history)) => Arc::clone(history),
            Some(HubEntry::Info(_)) => {
                return Err(mismatch(key, EntryKind::Scalar, EntryKind::Info));
            }
            None => return Err(not_found(key)),
        };
        let guard = history.read_recursive();
        Ok(f(&*guard))
    }

    /// Whether anything has been written under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Kind of the entry under `key`, if present
    pub fn kind_of(&self, key: &str) -> Option<EntryKind> {
        self.entries.get(key).map(|e| e.kind())
    }

    /// Sorted info keys
    pub fn info_keys(&self) -> Vec<String> {
        self.keys_of(EntryKind::Info)
    }

    /// Sorted scalar keys
    pub fn scalar_keys(&self) -> Vec<String> {
        self.keys_of(EntryKind::Scalar)
    }

    /// Consistent copy of every entry
    pub fn snapshot(&self) -> HubSnapshot {
        let _gate = self.batch_gate.write();
        let mut snapshot = HubSnapshot {
            name: self.name.clone(),
            ..HubSnapshot::default()
        };
        for entry in self.entries.iter() {
            match entry.value() {
                HubEntry::Info(value) => {
                    snapshot.info.insert(entry.key().clone(), value.clone());
                }
                HubEntry::Scalar(history) => {
                    snapshot
                        .scalars
                        .insert(entry.key().clone(), history.read().entries().to_vec());
                }
            }
        }
        snapshot
    }

    /// Load a snapshot: info values are overwritten, scalar samples are
    /// appended after any existing history. Nothing is written if a key in
    /// the snapshot already holds the other kind.
    pub fn restore(&self, snapshot: HubSnapshot) -> Result<()> {
        let _gate = self.batch_gate.write();
        for key in snapshot.info.keys() {
            self.expect_kind(key, EntryKind::Info)?;
        }
        for key in snapshot.scalars.keys() {
            self.expect_kind(key, EntryKind::Scalar)?;
        }

        let info_count = snapshot.info.len();
        let scalar_count = snapshot.scalars.len();
        for (key, value) in snapshot.info {
            self.entries.insert(key, HubEntry::Info(value));
        }
        for (key, samples) in snapshot.scalars {
            self.scalar_slot(&key)?.write().extend(samples);
        }

        info!(
            hub = %self.name,
            source = %snapshot.name,
            info = info_count,
            scalars = scalar_count,
            "Message hub restored from snapshot"
        );
        Ok(())
    }

    fn put_info(&self, key: &str, value: Value) -> Result<()> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                HubEntry::Info(current) => *current = value,
                HubEntry::Scalar(_) => {
                    return Err(mismatch(key, EntryKind::Info, EntryKind::Scalar));
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(HubEntry::Info(value));
            }
        }
        debug!(hub = %self.name, key = key, "Info updated");
        Ok(())
    }

    /// History under `key`, created empty on first use. The map shard is
    /// released before the caller locks the history.
    fn scalar_slot(&self, key: &str) -> Result<SharedHistory> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) => match occupied.get() {
                HubEntry::Scalar(history) => Ok(Arc::clone(history)),
                HubEntry::Info(_) => Err(mismatch(key, EntryKind::Scalar, EntryKind::Info)),
            },
            Entry::Vacant(vacant) => {
                let history = SharedHistory::default();
                vacant.insert(HubEntry::Scalar(Arc::clone(&history)));
                Ok(history)
            }
        }
    }

    fn expect_kind(&self, key: &str, expected: EntryKind) -> Result<()> {
        match self.kind_of(key) {
            Some(found) if found != expected => Err(mismatch(key, expected, found)),
            _ => Ok(()),
        }
    }

    fn keys_of(&self, kind: EntryKind) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new("runtime")
    }
}

/// Thread-safe handle to a message hub
pub type MessageHubHandle = Arc<MessageHub>;

fn not_found(key: &str) -> Error {
    Error::NotFound {
        key: key.to_string(),
    }
}

fn mismatch(key: &str, expected: EntryKind, found: EntryKind) -> Error {
    Error::KeyKindMismatch {
        key: key.to_string(),
        expected,
        found,
    }
}
