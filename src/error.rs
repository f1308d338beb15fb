//! Error types for fake-detector
//!
//! This module provides the error handling for the crate:
//! - [`Error`], the top-level error propagated out of host calls, configuration
//!   parsing and cache I/O
//! - [`ListError`], the per-file failure kinds of the archive lister, kept apart
//!   so a scan can tell a missing tool from a bad archive

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fake-detector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fake-detector
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The environment variable that caused the error (e.g., "NZBOP_CONTROLPORT")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error talking to the host
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The host answered a remote call with an error
    #[error("RPC call {method} failed: {message}")]
    Rpc {
        /// Name of the remote method (e.g., "listfiles")
        method: String,
        /// Error text returned by the host, or the HTTP status
        message: String,
    },

    /// Archive listing cannot continue (tool missing)
    #[error("archive listing error: {0}")]
    Listing(#[from] ListError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for a specific environment variable
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure to list the contents of one file with the external archive tool
#[derive(Debug, Error)]
pub enum ListError {
    /// The archive tool could not be started at all
    #[error("archive tool {tool} not found: {reason}")]
    ToolNotFound {
        /// Path of the tool that was attempted
        tool: PathBuf,
        /// OS error text
        reason: String,
    },

    /// The tool could be started but failed for another reason (permissions, etc.)
    #[error("failed to run {tool}: {reason}")]
    Spawn {
        /// Path of the tool that was attempted
        tool: PathBuf,
        /// OS error text
        reason: String,
    },

    /// The tool ran and reported an error (not an archive, incomplete, corrupt)
    #[error("listing {file} exited with {code:?}: {stderr}")]
    NonZeroExit {
        /// File that was listed
        file: PathBuf,
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The tool's standard output was not valid UTF-8
    #[error("listing {file} produced unreadable output")]
    UnreadableOutput {
        /// File that was listed
        file: PathBuf,
    },

    /// The tool did not finish in time and was killed
    #[error("listing {file} timed out after {timeout:?}")]
    TimedOut {
        /// File that was listed
        file: PathBuf,
        /// Configured limit
        timeout: Duration,
    },
}

impl ListError {
    /// Whether this failure means no further file can be listed either
    pub fn is_fatal(&self) -> bool {
        matches!(self, ListError::ToolNotFound { .. })
    }
}
