//! Structural validation of versioned entities
//!
//! Both checks are pure: no I/O, no mutation. They run twice in the write
//! pipeline, once before uniqueness claims are taken and once after the
//! conflict check, so that a malformed record can never reach commit.
//!
//! A failure here is a programming error in whatever built the entity.

use crate::error::WriteError;
use verity_core::{EntityStatus, VersionedEntity};

/// Checks run before uniqueness claims are taken
///
/// - id is complete (non-nil uuid, non-empty type)
/// - every field is stored under its own name
/// - every unique field holds a claimable value
pub fn verify_unique_fields(record: &VersionedEntity) -> Result<(), WriteError> {
    let id = &record.id;
    if !id.is_complete() {
        return Err(WriteError::validation(id, "id is missing uuid or type"));
    }
    let Some(entity) = record.entity.as_ref() else {
        return Ok(());
    };
    for (key, field) in entity.fields() {
        if key != &field.name {
            return Err(WriteError::validation(
                id,
                format!("field stored under '{}' is named '{}'", key, field.name),
            ));
        }
        if field.unique && !field.value.is_claimable() {
            return Err(WriteError::validation(
                id,
                format!("unique field '{}' holds an unclaimable value", field.name),
            ));
        }
    }
    Ok(())
}

/// Checks run after the conflict check, immediately before commit
///
/// Repeats [`verify_unique_fields`] and additionally requires:
/// - the payload belongs to the record's id
/// - the payload is stamped with the record's version
/// - only tombstones lack a payload
pub fn verify_entity(record: &VersionedEntity) -> Result<(), WriteError> {
    verify_unique_fields(record)?;
    let id = &record.id;
    match (&record.entity, record.status) {
        (None, EntityStatus::Deleted) => Ok(()),
        (None, _) => Err(WriteError::validation(
            id,
            format!("{:?} record has no payload", record.status),
        )),
        (Some(entity), _) => {
            if entity.id() != id {
                return Err(WriteError::validation(
                    id,
                    format!("payload belongs to {}", entity.id()),
                ));
            }
            if entity.version() != Some(record.version) {
                return Err(WriteError::validation(
                    id,
                    "payload version does not match record version",
                ));
            }
            Ok(())
        }
    }
}
