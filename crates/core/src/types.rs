//! Identity types for Verity
//!
//! This module defines the foundational identity types:
//! - Id: (uuid, type name) pair identifying an entity
//! - ApplicationScope: tenant scope that owns entities, claims and indexes

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque entity identifier
///
/// An Id is the pair of a UUID and the entity's type name. Ids are immutable
/// and compare by value; two Ids with the same UUID but different types are
/// different entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id {
    uuid: Uuid,
    entity_type: String,
}

impl Id {
    /// Create an Id from a UUID and a type name
    pub fn new(uuid: Uuid, entity_type: impl Into<String>) -> Self {
        Self {
            uuid,
            entity_type: entity_type.into(),
        }
    }

    /// Create an Id with a random UUID v4
    pub fn generate(entity_type: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), entity_type)
    }

    /// The UUID component
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The type name component
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Whether both components are populated
    ///
    /// A nil UUID or an empty type name can never address a stored entity.
    pub fn is_complete(&self) -> bool {
        !self.uuid.is_nil() && !self.entity_type.is_empty()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.uuid)
    }
}

/// Tenant scope for all persisted state
///
/// Every claim, log entry and index row lives under exactly one application.
/// The scope is itself addressed by the application's Id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationScope {
    application: Id,
}

impl ApplicationScope {
    /// Type name used for application ids
    pub const APPLICATION_TYPE: &'static str = "application";

    /// Create a scope for the given application id
    pub fn new(application: Id) -> Self {
        Self { application }
    }

    /// Create a scope for an application UUID
    pub fn for_application(uuid: Uuid) -> Self {
        Self::new(Id::new(uuid, Self::APPLICATION_TYPE))
    }

    /// The owning application's Id
    pub fn application(&self) -> &Id {
        &self.application
    }
}

impl fmt::Display for ApplicationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.application)
    }
}
