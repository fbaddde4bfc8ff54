//! Write pipeline orchestration
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. write_start()            - new version, ACTIVE marker      (no rollback)
//! 2. verify_unique_fields()   - structural checks, no I/O
//! 3. claim_unique_fields()    - write-first uniqueness claims
//! 4. verify_first_writer()    - first-writer-wins conflict check
//! 5. verify_entity()          - structural re-check
//! 6. write_commit()           - COMMITTED marker + primary store write
//! 7. release_superseded_claims() - drop claims of older versions
//! ```
//!
//! Stages run strictly in order. Any failure in steps 2-6 becomes a
//! [`WriteFailure`] handed to [`RollbackAction`]; the caller sees the
//! original error, or [`WriteError::Rollback`] if compensation failed too.
//!
//! ## Mark Sequence
//!
//! `mark_start()` (ACTIVE tombstone) then `write_commit()`. Tombstones carry
//! no unique fields, so their rollback only removes the log entry. After a
//! successful mark every claim held by the id is released.

use crate::claims::claim_unique_fields;
use crate::commit::{release_superseded_claims, write_commit};
use crate::conflict::verify_first_writer;
use crate::context::WriteContext;
use crate::error::{WriteError, WriteFailure};
use crate::rollback::RollbackAction;
use crate::start::{mark_start, write_start};
use crate::validation::{verify_entity, verify_unique_fields};
use verity_core::{Entity, Id, Version, VersionedEntity};

/// A durably committed write
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedEntity {
    /// The record as persisted
    pub record: VersionedEntity,
    /// Claims of older versions released after commit
    pub released_claims: usize,
}

impl CommittedEntity {
    /// Entity id
    pub fn id(&self) -> &Id {
        &self.record.id
    }

    /// Committed version
    pub fn version(&self) -> Version {
        self.record.version
    }

    /// Committed payload; `None` for tombstones
    pub fn entity(&self) -> Option<&Entity> {
        self.record.entity.as_ref()
    }
}

/// Runs entity writes and tombstone marks through their stages
#[derive(Debug, Clone)]
pub struct WritePipeline {
    ctx: WriteContext,
    rollback: RollbackAction,
}

impl WritePipeline {
    /// Create a pipeline over the given collaborators
    pub fn new(ctx: WriteContext) -> Self {
        let rollback = RollbackAction::new(ctx.clone());
        Self { ctx, rollback }
    }

    /// Collaborators in use
    pub fn context(&self) -> &WriteContext {
        &self.ctx
    }

    /// Write an entity
    ///
    /// # Errors
    ///
    /// - `WriteStart`: the ACTIVE marker could not be logged; nothing to undo
    /// - `UniqueViolation`, `Conflict`, `Validation`, `Storage`, `WriteCommit`:
    ///   the write failed and was rolled back
    /// - `Rollback`: the write failed and compensation did not complete
    pub async fn commit(&self, entity: Entity) -> Result<CommittedEntity, WriteError> {
        let record = write_start(&self.ctx, entity).await?;
        let record = match self.run_stages(record).await {
            Ok(record) => record,
            Err(failure) => return Err(self.compensate(failure).await),
        };
        let released_claims = release_superseded_claims(&self.ctx, &record).await;
        Ok(CommittedEntity {
            record,
            released_claims,
        })
    }

    /// Tombstone an entity
    ///
    /// Errors as for [`commit`](Self::commit); only `WriteStart`,
    /// `WriteCommit` and `Rollback` can occur.
    pub async fn mark(&self, id: Id) -> Result<CommittedEntity, WriteError> {
        let record = mark_start(&self.ctx, id).await?;
        if let Err(cause) = write_commit(&self.ctx, &record).await {
            let failure = WriteFailure::new(record, self.ctx.scope.clone(), cause);
            return Err(self.compensate(failure).await);
        }
        tracing::debug!(target: "verity::write", id = %record.id, version = %record.version, "Entity marked deleted");
        let released_claims = release_superseded_claims(&self.ctx, &record).await;
        Ok(CommittedEntity {
            record,
            released_claims,
        })
    }

    /// Run every stage after WriteStart
    ///
    /// Returns the record unchanged on success, or the failure context
    /// rollback needs.
    pub async fn run_stages(&self, record: VersionedEntity) -> Result<VersionedEntity, WriteFailure> {
        match self.stages(&record).await {
            Ok(()) => Ok(record),
            Err(cause) => Err(WriteFailure::new(record, self.ctx.scope.clone(), cause)),
        }
    }

    async fn stages(&self, record: &VersionedEntity) -> Result<(), WriteError> {
        verify_unique_fields(record)?;
        claim_unique_fields(&self.ctx, record).await?;
        verify_first_writer(&self.ctx, record).await?;
        verify_entity(record)?;
        write_commit(&self.ctx, record).await
    }

    async fn compensate(&self, failure: WriteFailure) -> WriteError {
        match self.rollback.run(failure).await {
            Ok((_, cause)) => cause,
            Err(rollback_failed) => rollback_failed,
        }
    }
}
