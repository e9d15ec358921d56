//! Error types for passbook.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for passbook operations.
#[derive(Error, Debug)]
pub enum PassbookError {
    #[error("Cannot access data file {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entry not found: {0}")]
    NotFound(u64),

    #[error("Duplicate entry id: {0}")]
    DuplicateId(u64),

    #[error("Incorrect master password")]
    AuthFailed,

    #[error("No master password has been set")]
    NotInitialized,

    #[error("Master password is already set")]
    AlreadyInitialized,

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl PassbookError {
    /// True for failures of the data file itself (unreadable, unwritable or malformed).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, PassbookError>;
