//! Error types for pullgate
//!
//! Provides structured error types with context for better debugging
//! and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pullgate operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Repository Errors
    // ==========================================================================
    #[error("'{path}' is not inside a git repository")]
    NotARepository { path: PathBuf },

    #[error("Repository at '{path}' has no working directory")]
    BareRepository { path: PathBuf },

    // ==========================================================================
    // Git Command Errors
    // ==========================================================================
    #[error("Failed to run 'git {command}' in '{root}': {source}")]
    CommandSpawn {
        command: String,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==========================================================================
    // Metadata Errors
    // ==========================================================================
    #[error("Git operation failed: {message}")]
    GitError {
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Failed to read config '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ConfigParse { message: String },

    // ==========================================================================
    // Hook Errors
    // ==========================================================================
    #[error("A pre-commit hook not managed by pullgate already exists at '{path}'")]
    ForeignHook { path: PathBuf },

    #[error("Failed to write hook '{path}': {source}")]
    HookWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==========================================================================
    // Catch-all
    // ==========================================================================
    #[error("{0}")]
    Other(String),
}

/// Result type alias for pullgate operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::GitError {
            message: err.message().to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NotARepository { .. } => {
                Some("Run pullgate from inside a git working copy or pass its path")
            }
            Error::CommandSpawn { .. } => Some("Make sure the 'git' binary is on PATH"),
            Error::ConfigParse { .. } => {
                Some("Check .pullgate.yaml: valid keys are enabled, fetch_args, pull_args, non_interactive")
            }
            Error::ForeignHook { .. } => {
                Some("Re-run with --force to replace the existing pre-commit hook")
            }
            _ => None,
        }
    }

    /// Returns true if the gate may carry on past this error
    ///
    /// Command and metadata faults only degrade the advisory check; they
    /// never block a commit on their own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CommandSpawn { .. } | Error::GitError { .. } | Error::Other(_)
        )
    }
}
