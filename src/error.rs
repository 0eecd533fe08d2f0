//! Error types for codegrep
//!
//! This module defines the error hierarchy covering:
//! - Configuration and CLI errors (bad filter specs, unknown types, rc files)
//! - Pattern compilation errors
//! - Worker thread errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Configuration errors are fatal at startup; per-file I/O errors are
//!   logged at the point of failure and the unit of work is skipped
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the codegrep application
#[derive(Error, Debug)]
pub enum SearchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pattern compilation errors
    #[error("{0}")]
    Pattern(#[from] PatternError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Process exit status for this error.
    ///
    /// Usage and configuration problems exit 255 (matching ack); everything
    /// else is a runtime error and exits 2. Status 0/1 are reserved for
    /// matched/no-matches outcomes.
    pub fn exit_code(&self) -> u8 {
        match self {
            SearchError::Config(_) => 255,
            _ => 2,
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed filter spec string (e.g. `--type-set=cpp:bogus:x`)
    #[error("Invalid filter spec '{spec}': {reason}")]
    InvalidFilterSpec { spec: String, reason: String },

    /// A `--type=TYPE` / `--noTYPE` referenced a type that doesn't exist
    #[error("Unknown type '{name}'.")]
    UnknownType { name: String },

    /// A `--PREFIX` form matched more than one type name
    #[error("option '--{option}' is ambiguous; possibilities: {possibilities}")]
    AmbiguousTypeOption {
        option: String,
        possibilities: String,
    },

    /// Invalid thread count for `-j`/`--dirjobs`
    #[error("{what} must be >= 1")]
    InvalidJobCount { what: &'static str },

    /// An rc file contained a literal `--`
    #[error("Double-dash \"--\" is not allowed in rc file \"{rc}\"", rc = .file.display())]
    RcDoubleDash { file: PathBuf },

    /// An rc file contained a non-option argument
    #[error("Non-option argument \"{arg}\" is not allowed in rc file \"{rc}\"", rc = .file.display())]
    RcNonOption { file: PathBuf, arg: String },

    /// No search pattern was supplied
    #[error("No search pattern given")]
    MissingPattern,
}

/// Pattern compilation failure
///
/// Carries the original (pre-transformation) pattern so the message names
/// what the user actually typed; the regex error text includes the offset.
#[derive(Error, Debug)]
#[error("Compilation of pattern \"{pattern}\" failed: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Work queue push failed because the queue was closed
    #[error("Failed to enqueue work item: queue closed")]
    QueueSendFailed,
}

/// Result type alias for SearchError
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config_err: SearchError = ConfigError::MissingPattern.into();
        assert_eq!(config_err.exit_code(), 255);

        let pattern_err: SearchError = PatternError {
            pattern: "(".into(),
            source: regex::Regex::new("(").unwrap_err(),
        }
        .into();
        assert_eq!(pattern_err.exit_code(), 2);
    }

    #[test]
    fn test_error_conversion() {
        let worker_err = WorkerError::QueueSendFailed;
        let search_err: SearchError = worker_err.into();
        assert!(matches!(search_err, SearchError::Worker(_)));
    }

    #[test]
    fn test_unknown_type_message() {
        let err = ConfigError::UnknownType {
            name: "cobol2".into(),
        };
        assert_eq!(err.to_string(), "Unknown type 'cobol2'.");
    }
}
