//! Structured error types for chronicle-core.
//!
//! The binary wraps these in `anyhow` for reporting; library callers can
//! match on the variant to tell global failures (missing or unparseable
//! input) apart from output failures.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChronicleError {
    /// Export file (or folder entry) does not exist
    #[error("Export not found: {path:?}")]
    MissingInput { path: PathBuf },

    /// Export document failed to parse as JSON
    #[error("Malformed JSON in {path:?}: {source}")]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Parsed fine, but the top level is not a conversation sequence
    #[error("Invalid format in file {path:?}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Flattened output could not be persisted
    #[error("Failed to write {path:?}: {source}")]
    WriteFailure { path: PathBuf, source: io::Error },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

pub type Result<T> = std::result::Result<T, ChronicleError>;

impl ChronicleError {
    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    pub fn malformed_json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::MalformedJson {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn write_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True for failures of the global preconditions (input present and parseable).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::MalformedJson { .. } | Self::InvalidFormat { .. }
        )
    }
}
