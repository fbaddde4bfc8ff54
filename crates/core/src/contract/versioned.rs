//! Versioned entity records
//!
//! A [`VersionedEntity`] is what the write pipeline threads from stage to
//! stage and what the primary store returns on reads: an entity payload
//! (possibly absent) pinned to exactly one version.

use super::Version;
use crate::entity::Entity;
use crate::types::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Completeness of a stored version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityStatus {
    /// Written without a caller-supplied prior version
    Partial,
    /// Full entity payload
    Complete,
    /// Tombstone; no payload
    Deleted,
}

/// An entity pinned to one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntity {
    /// Entity id
    pub id: Id,
    /// Version of this record
    pub version: Version,
    /// Completeness
    pub status: EntityStatus,
    /// Payload; `None` for tombstones
    pub entity: Option<Entity>,
}

impl VersionedEntity {
    /// Wrap an entity payload at a version
    pub fn new(version: Version, status: EntityStatus, entity: Entity) -> Self {
        Self {
            id: entity.id().clone(),
            version,
            status,
            entity: Some(entity),
        }
    }

    /// Create a tombstone for an id
    pub fn tombstone(id: Id, version: Version) -> Self {
        Self {
            id,
            version,
            status: EntityStatus::Deleted,
            entity: None,
        }
    }

    /// Whether this record represents a deleted entity
    ///
    /// A record with no payload counts as deleted whatever its status says.
    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted || self.entity.is_none()
    }
}

/// Latest stored version per id, as returned by a batch load
pub type EntitySet = HashMap<Id, VersionedEntity>;

/// Latest stored version number per id
pub type VersionSet = HashMap<Id, Version>;
