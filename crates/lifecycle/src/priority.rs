//! Hook priorities

use runtime_core::{Error, Result};
use std::fmt;

/// Relative execution order of hooks sharing a lifecycle phase.
///
/// Lower values run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);
    pub const VERY_HIGH: Priority = Priority(10);
    pub const HIGH: Priority = Priority(30);
    pub const ABOVE_NORMAL: Priority = Priority(40);
    pub const NORMAL: Priority = Priority(50);
    pub const BELOW_NORMAL: Priority = Priority(60);
    pub const LOW: Priority = Priority(70);
    pub const VERY_LOW: Priority = Priority(90);
    pub const LOWEST: Priority = Priority(100);

    const NAMED: [(&'static str, Priority); 9] = [
        ("HIGHEST", Self::HIGHEST),
        ("VERY_HIGH", Self::VERY_HIGH),
        ("HIGH", Self::HIGH),
        ("ABOVE_NORMAL", Self::ABOVE_NORMAL),
        ("NORMAL", Self::NORMAL),
        ("BELOW_NORMAL", Self::BELOW_NORMAL),
        ("LOW", Self::LOW),
        ("VERY_LOW", Self::VERY_LOW),
        ("LOWEST", Self::LOWEST),
    ];

    /// Parse a level name (`"VERY_HIGH"`) or a number in `0..=100`
    pub fn parse(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some((_, p)) = Self::NAMED.iter().find(|(name, _)| *name == upper) {
            return Ok(*p);
        }
        match upper.parse::<u8>() {
            Ok(v) if v <= 100 => Ok(Priority(v)),
            _ => Err(Error::InvalidConfig {
                message: format!("Unknown hook priority: {}", s),
            }),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, p)| p == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}
