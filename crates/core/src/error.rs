//! Error types for Verity collaborators
//!
//! Every collaborator seam (version log, claim store, primary store,
//! secondary index) reports failures through [`VerityError`]. The write and
//! read pipelines wrap these into their own taxonomies; this type only
//! describes *what* went wrong at the storage boundary.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for collaborator operations
pub type VerityResult<T> = std::result::Result<T, VerityError>;

/// Error types for collaborator I/O
#[derive(Debug, Error)]
pub enum VerityError {
    /// I/O error (file operations, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage backend unreachable or rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Collaborator call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl VerityError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        VerityError::Storage(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        VerityError::Timeout(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        VerityError::InvalidInput(msg.into())
    }

    /// Create a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        VerityError::Corruption(msg.into())
    }

    /// Whether retrying the same call might succeed
    ///
    /// Unreachable storage and timeouts are transient; corruption and bad
    /// input are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VerityError::Io(_) | VerityError::Storage(_) | VerityError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for VerityError {
    fn from(e: serde_json::Error) -> Self {
        VerityError::Serialization(e.to_string())
    }
}
