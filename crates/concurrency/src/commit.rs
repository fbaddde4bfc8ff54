//! WriteCommit and post-commit claim cleanup

use crate::context::WriteContext;
use crate::error::WriteError;
use verity_core::{LogEntry, Stage, UniqueClaim, VersionedEntity};

/// Log the record COMMITTED and persist it to the primary store
///
/// The two calls are issued in that order. The collaborators expose no
/// combined mutation, so a failure of the store write leaves a COMMITTED
/// marker that rollback then removes.
pub async fn write_commit(ctx: &WriteContext, record: &VersionedEntity) -> Result<(), WriteError> {
    let fail = |source| WriteError::WriteCommit {
        id: record.id.clone(),
        version: record.version,
        source,
    };
    ctx.log
        .append(LogEntry::new(record.id.clone(), record.version, Stage::Committed))
        .await
        .map_err(fail)?;
    ctx.store.write(record).await.map_err(fail)?;
    tracing::debug!(target: "verity::write", id = %record.id, version = %record.version, "Write committed");
    Ok(())
}

/// Release claims held by versions of this id older than `record`
///
/// Runs after a successful commit. The commit is already durable, so
/// failures here are logged and reported as zero released rather than
/// failing the write; a stale claim still names this id and never blocks
/// it.
pub async fn release_superseded_claims(ctx: &WriteContext, record: &VersionedEntity) -> usize {
    let held = match ctx.claims.load_for_entity(&ctx.scope, &record.id).await {
        Ok(held) => held,
        Err(e) => {
            tracing::warn!(target: "verity::write", id = %record.id, error = %e, "Could not load claims for cleanup");
            return 0;
        }
    };
    let superseded: Vec<UniqueClaim> = held
        .into_iter()
        .filter(|claim| claim.version < record.version)
        .collect();

    let mut released = 0;
    for claim in &superseded {
        match ctx.claims.delete(claim).await {
            Ok(()) => released += 1,
            Err(e) => tracing::warn!(
                target: "verity::write",
                id = %record.id,
                field = %claim.field.name,
                version = %claim.version,
                error = %e,
                "Could not release superseded claim"
            ),
        }
    }
    if released > 0 {
        tracing::debug!(target: "verity::write", id = %record.id, released, "Released superseded claims");
    }
    released
}
