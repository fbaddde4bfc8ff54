//! Uniqueness claims
//!
//! A claim asserts that one (scope, entity type, field name, field value)
//! is owned by a specific entity version. Claims are written by the write
//! pipeline for every unique field and removed by rollback when the owning
//! write fails.

use super::Version;
use crate::entity::Field;
use crate::types::{ApplicationScope, Id};
use serde::{Deserialize, Serialize};

/// A row claiming a unique field value for one entity version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueClaim {
    /// Owning tenant scope
    pub scope: ApplicationScope,
    /// Claimed field (name and value)
    pub field: Field,
    /// Owning entity
    pub id: Id,
    /// Owning entity version
    pub version: Version,
}

impl UniqueClaim {
    /// Create a claim
    pub fn new(scope: ApplicationScope, field: Field, id: Id, version: Version) -> Self {
        Self {
            scope,
            field,
            id,
            version,
        }
    }

    /// Whether this claim is held by the given entity version
    pub fn is_owned_by(&self, id: &Id, version: Version) -> bool {
        &self.id == id && self.version == version
    }

    /// Row key: (entity type, field name, canonical value)
    ///
    /// Returns `None` when the field value cannot be claimed.
    pub fn row_key(&self) -> Option<(String, String, String)> {
        claim_row_key(self.id.entity_type(), &self.field)
    }
}

/// Row key for a (type, field) pair
///
/// Shared by claim stores so that lookups and writes agree on keying.
pub fn claim_row_key(entity_type: &str, field: &Field) -> Option<(String, String, String)> {
    field
        .value
        .claim_key()
        .map(|value| (entity_type.to_string(), field.name.clone(), value))
}
