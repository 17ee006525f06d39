//! Unified error types for factdrill.
//!
//! The scheduling core only ever fails on malformed input (`Validation`).
//! Everything else here belongs to the collaborator layers: ledger storage,
//! the attempt log, and configuration loading. Those layers lean fail-open
//! where a missing or unreadable file should not stop a learner from
//! practicing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for factdrill operations.
#[derive(Error, Debug)]
pub enum DrillError {
    /// A malformed attempt was rejected. The ledger is left untouched.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// I/O errors from ledger or attempt-log files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// No ledger stored for the learner.
    #[error("learner not found: {learner_id}")]
    LearnerNotFound { learner_id: String },
}

/// A specialized Result type for factdrill operations.
pub type Result<T> = std::result::Result<T, DrillError>;

impl DrillError {
    /// Create a validation error for the named attempt field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a learner not found error.
    pub fn learner_not_found(learner_id: impl Into<String>) -> Self {
        Self::LearnerNotFound {
            learner_id: learner_id.into(),
        }
    }

    /// True when the error came from rejecting caller input rather than
    /// from infrastructure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<io::Error> for DrillError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DrillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Fail-open handling for collaborator errors.
///
/// Logs the error as a warning and substitutes a fallback value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the factdrill CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (bad input, missing learner, storage failure).
    pub const FAILURE: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
