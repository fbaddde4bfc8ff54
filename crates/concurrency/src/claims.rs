//! WriteUniqueClaim: take uniqueness claims for a write
//!
//! For every unique field the stage:
//! 1. checks the existing claim row; a row owned by a different entity is a
//!    violation, a row owned by an older version of the same entity is not
//! 2. writes its own claim row (write-first)
//! 3. reads the row back; if another writer overwrote it in between, that
//!    is a violation too
//!
//! Every claim written here is owned by (id, version), so rollback can
//! delete exactly these rows without touching a competitor's.

use crate::context::WriteContext;
use crate::error::WriteError;
use verity_core::{Field, UniqueClaim, VersionedEntity};

/// Claim every unique field of `record`
pub async fn claim_unique_fields(
    ctx: &WriteContext,
    record: &VersionedEntity,
) -> Result<(), WriteError> {
    let Some(entity) = record.entity.as_ref() else {
        return Ok(());
    };
    let fields: Vec<&Field> = entity.unique_fields().collect();
    if fields.is_empty() {
        return Ok(());
    }
    let id = &record.id;
    let entity_type = id.entity_type();

    let mut taken = Vec::new();
    for field in &fields {
        let existing = ctx
            .claims
            .load(&ctx.scope, entity_type, field)
            .await
            .map_err(|e| WriteError::storage("unique claim", id, e))?;
        if let Some(owner) = existing {
            if owner.id.uuid() != id.uuid() {
                taken.push(field.name.clone());
            }
        }
    }
    if !taken.is_empty() {
        return Err(violation(record, taken));
    }

    for field in &fields {
        let claim = UniqueClaim::new(ctx.scope.clone(), (*field).clone(), id.clone(), record.version);
        ctx.claims
            .write(&claim)
            .await
            .map_err(|e| WriteError::storage("unique claim", id, e))?;
    }

    for field in &fields {
        let row = ctx
            .claims
            .load(&ctx.scope, entity_type, field)
            .await
            .map_err(|e| WriteError::storage("unique claim", id, e))?;
        match row {
            Some(owner) if owner.is_owned_by(id, record.version) => {}
            _ => taken.push(field.name.clone()),
        }
    }
    if !taken.is_empty() {
        return Err(violation(record, taken));
    }

    tracing::debug!(target: "verity::write", %id, version = %record.version, claims = fields.len(), "Unique fields claimed");
    Ok(())
}

fn violation(record: &VersionedEntity, fields: Vec<String>) -> WriteError {
    tracing::warn!(target: "verity::write", id = %record.id, ?fields, "Unique value already claimed");
    WriteError::UniqueViolation {
        id: record.id.clone(),
        fields,
    }
}
