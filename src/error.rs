// src/error.rs

//! Error types for pantry
//!
//! Build, link and verify failures are fatal to an install attempt and are
//! raised only after the attempt's partial state has been cleaned up. A
//! request against a program that is not installed is not an error; tasks
//! report it as an outcome instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A shelled command exited nonzero, could not be spawned or timed out
    #[error("Command failed: {0}")]
    CommandError(String),

    /// The symlink farm already holds an entry at the destination
    #[error("Link conflict: {} already exists", .0.display())]
    LinkConflict(PathBuf),

    /// A recipe's self-check failed after linking
    #[error("Verification failed: {0}")]
    VerificationError(String),

    /// Unknown recipe or missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Downloaded or copied archive does not match its declared checksum
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Ledger format error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for the failures that abort an install attempt mid-flight
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            Self::CommandError(_) | Self::LinkConflict(_) | Self::VerificationError(_)
        )
    }
}
