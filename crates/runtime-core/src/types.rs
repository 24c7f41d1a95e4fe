//! Core type definitions for the lifecycle telemetry runtime

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Training counters
pub type Epoch = u64;
pub type Iteration = u64;

/// Optional step attached to a scalar sample
pub type Step = u64;

/// Named scalar values reported by a model step or an evaluator
pub type ScalarMap = BTreeMap<String, f64>;

/// Kind of value stored under a message hub key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Single current fact, last write wins
    Info,

    /// Append-only scalar time series
    Scalar,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Info => f.write_str("info"),
            EntryKind::Scalar => f.write_str("scalar"),
        }
    }
}

/// One sample of a scalar history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScalarEntry {
    /// Recorded value. NaN and infinities survive serialization.
    #[serde(with = "non_finite")]
    pub value: f64,

    /// Step supplied by the writer, if any
    pub step: Option<Step>,
}

impl ScalarEntry {
    pub fn new(value: f64, step: Option<Step>) -> Self {
        Self { value, step }
    }
}

/// Serde adapter writing NaN and infinities as strings, since JSON numbers
/// cannot hold them. Finite values stay plain numbers.
mod non_finite {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INF } else { NEG_INF })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, \"NaN\", \"inf\" or \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}
