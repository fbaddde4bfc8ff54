//! RollbackAction: compensation for a failed write
//!
//! Given a [`WriteFailure`], deletes the claim row of every unique field of
//! the failed entity concurrently, waits for all of them, and only then
//! deletes the write's own log entry.
//!
//! ```text
//! claim deletes (fan-out) ──► join all ──► log entry delete
//! ```
//!
//! If any claim delete fails the log entry is left in place and the
//! failure is surfaced as [`WriteError::Rollback`]. The leftover entry keeps
//! later writers of the same id failing their conflict check until a repair
//! pass removes it, which is preferable to a silently dangling claim.
//!
//! Compensation is best effort, not a transaction: a crash part way through
//! leaves partial state for a later repair pass.

use crate::context::WriteContext;
use crate::error::{WriteError, WriteFailure};
use futures::future::join_all;
use verity_core::{UniqueClaim, VerityError};

/// What a completed rollback did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackReport {
    /// Claim deletes issued
    pub claims_deleted: usize,
    /// Whether the log entry delete was issued
    pub log_entry_deleted: bool,
}

/// Compensates failed writes
#[derive(Debug, Clone)]
pub struct RollbackAction {
    ctx: WriteContext,
}

impl RollbackAction {
    /// Create a rollback action over the given collaborators
    pub fn new(ctx: WriteContext) -> Self {
        Self { ctx }
    }

    /// Undo the claims and log entry of a failed write
    ///
    /// Returns the failure's cause unchanged if compensation succeeded, or
    /// [`WriteError::Rollback`] wrapping it if compensation failed.
    pub async fn run(&self, failure: WriteFailure) -> Result<(RollbackReport, WriteError), WriteError> {
        let WriteFailure {
            entity: record,
            scope,
            cause,
        } = failure;
        let id = record.id.clone();
        let version = record.version;

        tracing::warn!(target: "verity::rollback", %id, %version, cause = %cause, "Rolling back write");

        let claims: Vec<UniqueClaim> = record
            .entity
            .iter()
            .flat_map(|entity| entity.unique_fields())
            .filter(|field| field.value.is_claimable())
            .map(|field| UniqueClaim::new(scope.clone(), field.clone(), id.clone(), version))
            .collect();

        let results = join_all(claims.iter().map(|claim| self.ctx.claims.delete(claim))).await;
        let claims_deleted = results.len();
        if let Some(source) = first_error(results) {
            tracing::error!(
                target: "verity::rollback",
                %id,
                %version,
                error = %source,
                "Claim delete failed; log entry left in place"
            );
            return Err(WriteError::Rollback {
                id,
                version,
                cause: Box::new(cause),
                source,
            });
        }

        if let Err(source) = self.ctx.log.delete(&id, version).await {
            tracing::error!(target: "verity::rollback", %id, %version, error = %source, "Log entry delete failed");
            return Err(WriteError::Rollback {
                id,
                version,
                cause: Box::new(cause),
                source,
            });
        }

        tracing::debug!(target: "verity::rollback", %id, %version, claims = claims_deleted, "Rollback complete");
        Ok((
            RollbackReport {
                claims_deleted,
                log_entry_deleted: true,
            },
            cause,
        ))
    }
}

fn first_error(results: Vec<Result<(), VerityError>>) -> Option<VerityError> {
    results.into_iter().find_map(Result::err)
}
