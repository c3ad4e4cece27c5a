//! Core error types for diagram checking
//!
//! These are failures of the tool itself. A diagram with a syntax error is
//! not an error here; it is recorded in that block's `ValidationResult`.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::report::Outcome;

/// Hint appended to every setup failure
pub const INSTALL_HINT: &str = "install the parser with `npm install mermaid jsdom`, \
or point MERMAID_CHECK_NODE_MODULES at a node_modules directory that contains both";

/// Errors that stop a document, or the whole run, from being checked
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Input not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("No documents matched: {pattern}")]
    NoMatches { pattern: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write block file '{}': {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not initialize the Mermaid parser: {message}; {}", INSTALL_HINT)]
    Setup { message: String },
}

impl CheckError {
    /// Create a new usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a new no-matches error
    pub fn no_matches(pattern: impl Into<String>) -> Self {
        Self::NoMatches {
            pattern: pattern.into(),
        }
    }

    /// Create an I/O error for `path`, mapping a missing file to `NotFound`
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Create an error for a block file that could not be written
    pub fn artifact(path: &Path, source: std::io::Error) -> Self {
        Self::Artifact {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a new setup error
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Setup failures end the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup { .. } | Self::Usage { .. })
    }

    /// Every tool failure maps to the operational-error outcome
    pub fn outcome(&self) -> Outcome {
        Outcome::OperationalError
    }
}

/// Result alias for operations that can fail with a [`CheckError`]
pub type Result<T, E = CheckError> = std::result::Result<T, E>;
