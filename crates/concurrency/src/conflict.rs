//! WriteOptimisticVerify: first-writer-wins conflict detection
//!
//! Checked late, after claims are taken, by looking at the two most recent
//! log entries at or below this write's version. If the entry immediately
//! preceding this write is anything but COMMITTED, an earlier writer is
//! still in flight (or failed without cleaning up) and this writer loses.
//!
//! This is a detector, not a lock. Two writers whose ACTIVE entries land in
//! an order the two-entry window cannot see will both pass.

use crate::context::WriteContext;
use crate::error::WriteError;
use verity_core::{LogEntry, Stage, VersionedEntity};

/// Number of recent entries inspected
pub const CONFLICT_WINDOW: usize = 2;

/// Fail with [`WriteError::Conflict`] if this writer is not first
///
/// On conflict a ROLLBACK marker for this write's own version is appended
/// before the error is returned.
pub async fn verify_first_writer(
    ctx: &WriteContext,
    record: &VersionedEntity,
) -> Result<(), WriteError> {
    let id = &record.id;
    let recent = ctx
        .log
        .load_recent(id, record.version, CONFLICT_WINDOW)
        .await
        .map_err(|e| WriteError::storage("optimistic verify", id, e))?;

    let Some(preceding) = recent.iter().find(|entry| entry.version < record.version) else {
        return Ok(());
    };
    if preceding.stage.is_committed() {
        return Ok(());
    }

    tracing::warn!(
        target: "verity::write",
        %id,
        version = %record.version,
        preceding = %preceding.version,
        stage = %preceding.stage,
        "Not first writer"
    );
    ctx.log
        .append(LogEntry::new(id.clone(), record.version, Stage::Rollback))
        .await
        .map_err(|e| WriteError::storage("optimistic verify", id, e))?;

    Err(WriteError::Conflict {
        id: id.clone(),
        version: record.version,
        preceding: preceding.version,
        stage: preceding.stage,
    })
}
