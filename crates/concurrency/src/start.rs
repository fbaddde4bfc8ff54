//! WriteStart and MarkStart
//!
//! Both issue a fresh version, log it ACTIVE and wrap the payload. Neither
//! triggers rollback on failure: if the ACTIVE append fails there is nothing
//! to compensate.

use crate::context::WriteContext;
use crate::error::WriteError;
use verity_core::{Entity, EntityStatus, Id, LogEntry, Stage, Version, VersionedEntity};

/// Assign a version, log it ACTIVE, and wrap the entity
///
/// Status is `Complete` when the caller's entity already carries a version
/// (an update of a known entity), `Partial` otherwise.
pub async fn write_start(ctx: &WriteContext, mut entity: Entity) -> Result<VersionedEntity, WriteError> {
    let id = entity.id().clone();
    let status = if entity.version().is_some() {
        EntityStatus::Complete
    } else {
        EntityStatus::Partial
    };
    let version = Version::next();

    ctx.log
        .append(LogEntry::new(id.clone(), version, Stage::Active))
        .await
        .map_err(|source| WriteError::WriteStart {
            id: id.clone(),
            source,
        })?;

    entity.set_version(version);
    tracing::debug!(target: "verity::write", %id, %version, ?status, "Write started");
    Ok(VersionedEntity::new(version, status, entity))
}

/// Assign a version, log it ACTIVE, and build a tombstone
pub async fn mark_start(ctx: &WriteContext, id: Id) -> Result<VersionedEntity, WriteError> {
    let version = Version::next();
    ctx.log
        .append(LogEntry::new(id.clone(), version, Stage::Active))
        .await
        .map_err(|source| WriteError::WriteStart {
            id: id.clone(),
            source,
        })?;
    tracing::debug!(target: "verity::write", %id, %version, "Mark started");
    Ok(VersionedEntity::tombstone(id, version))
}
