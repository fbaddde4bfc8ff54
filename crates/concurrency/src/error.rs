//! Write-path error taxonomy
//!
//! [`WriteError`] is what callers of the write pipeline see. Only
//! [`WriteError::Conflict`] is the expected outcome of legitimate
//! contention; everything else is an I/O failure, a malformed entity, or a
//! failed compensation.
//!
//! [`WriteFailure`] pairs an error with the entity and scope that rollback
//! needs to compensate it.

use thiserror::Error;
use verity_core::{ApplicationScope, Id, Stage, Version, VersionedEntity, VerityError};

/// Errors raised by the write and mark pipelines
#[derive(Debug, Error)]
pub enum WriteError {
    /// Version log append for the ACTIVE marker failed
    #[error("write start failed for {id}: {source}")]
    WriteStart {
        /// Entity being written
        id: Id,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },

    /// A unique field value is owned by another entity
    #[error("unique value conflict for {id} on field(s) {fields:?}")]
    UniqueViolation {
        /// Entity being written
        id: Id,
        /// Names of the fields whose values are taken
        fields: Vec<String>,
    },

    /// An earlier write for the same id has not committed
    #[error("not first writer for {id} at {version}: preceding version {preceding} is {stage}")]
    Conflict {
        /// Entity being written
        id: Id,
        /// Version of this write
        version: Version,
        /// Version of the uncommitted preceding entry
        preceding: Version,
        /// Stage of the preceding entry
        stage: Stage,
    },

    /// The versioned entity is malformed
    #[error("invalid entity {id}: {reason}")]
    Validation {
        /// Entity being written
        id: Id,
        /// What is wrong with it
        reason: String,
    },

    /// A collaborator call failed between start and commit
    #[error("{stage} failed for {id}: {source}")]
    Storage {
        /// Stage that issued the call
        stage: &'static str,
        /// Entity being written
        id: Id,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },

    /// COMMITTED append or primary store write failed
    #[error("write commit failed for {id} at {version}: {source}")]
    WriteCommit {
        /// Entity being written
        id: Id,
        /// Version being committed
        version: Version,
        /// Underlying collaborator error
        #[source]
        source: VerityError,
    },

    /// Compensation for a failed write did not complete
    ///
    /// A dangling claim or log entry may remain.
    #[error("rollback incomplete for {id} at {version} after [{cause}]: {source}")]
    Rollback {
        /// Entity being compensated
        id: Id,
        /// Version being compensated
        version: Version,
        /// Error that triggered the rollback
        cause: Box<WriteError>,
        /// First compensation failure
        #[source]
        source: VerityError,
    },
}

impl WriteError {
    /// Whether retrying the same write may succeed
    ///
    /// True only for optimistic conflicts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WriteError::Conflict { .. })
    }

    /// Whether this is an optimistic conflict
    pub fn is_conflict(&self) -> bool {
        self.is_retryable()
    }

    /// Whether compensation failed
    pub fn is_rollback_failure(&self) -> bool {
        matches!(self, WriteError::Rollback { .. })
    }

    /// Id of the entity the error concerns
    pub fn id(&self) -> &Id {
        match self {
            WriteError::WriteStart { id, .. }
            | WriteError::UniqueViolation { id, .. }
            | WriteError::Conflict { id, .. }
            | WriteError::Validation { id, .. }
            | WriteError::Storage { id, .. }
            | WriteError::WriteCommit { id, .. }
            | WriteError::Rollback { id, .. } => id,
        }
    }

    pub(crate) fn validation(id: &Id, reason: impl Into<String>) -> Self {
        WriteError::Validation {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(stage: &'static str, id: &Id, source: VerityError) -> Self {
        WriteError::Storage {
            stage,
            id: id.clone(),
            source,
        }
    }
}

/// A failed write carrying what rollback needs
#[derive(Debug)]
pub struct WriteFailure {
    /// The versioned entity as it stood when the stage failed
    pub entity: VersionedEntity,
    /// Scope the write ran in
    pub scope: ApplicationScope,
    /// Why it failed
    pub cause: WriteError,
}

impl WriteFailure {
    /// Create a failure record
    pub fn new(entity: VersionedEntity, scope: ApplicationScope, cause: WriteError) -> Self {
        Self {
            entity,
            scope,
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        let id = Id::generate("user");
        let conflict = WriteError::Conflict {
            id: id.clone(),
            version: Version::from_parts(2, 0),
            preceding: Version::from_parts(1, 0),
            stage: Stage::Active,
        };
        assert!(conflict.is_retryable());

        let io = WriteError::WriteCommit {
            id: id.clone(),
            version: Version::from_parts(2, 0),
            source: VerityError::storage("down"),
        };
        assert!(!io.is_retryable());
        assert!(!WriteError::validation(&id, "bad").is_retryable());
    }

    #[test]
    fn test_rollback_error_mentions_cause() {
        let id = Id::generate("user");
        let err = WriteError::Rollback {
            id: id.clone(),
            version: Version::from_parts(1, 0),
            cause: Box::new(WriteError::validation(&id, "field map mismatch")),
            source: VerityError::storage("claim delete refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("field map mismatch"));
        assert!(msg.contains("claim delete refused"));
        assert!(err.is_rollback_failure());
        assert_eq!(err.id(), &id);
    }
}
