//! Error types for the lifecycle telemetry runtime

use crate::types::EntryKind;
use thiserror::Error;

/// Result type alias using the runtime Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the lifecycle telemetry runtime
#[derive(Error, Debug)]
pub enum Error {
    // Registry errors
    #[error("Key not found in message hub: {key}")]
    NotFound { key: String },

    #[error("Key kind mismatch for {key}: expected {expected}, found {found}")]
    KeyKindMismatch {
        key: String,
        expected: EntryKind,
        found: EntryKind,
    },

    // Collaborator errors
    #[error("Contract violation: {message}")]
    ContractViolation { message: String },

    // Lifecycle errors
    #[error("Lifecycle phase {next} cannot follow {previous}")]
    PhaseOrder { previous: String, next: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Returns true if the run must abort on this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ContractViolation { .. }
                | Error::PhaseOrder { .. }
                | Error::KeyKindMismatch { .. }
                | Error::InvalidConfig { .. }
                | Error::Internal { .. }
        )
    }

    /// Returns true if a reader asked for a key that has not been published yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
