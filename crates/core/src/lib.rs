//! Core types and traits for Verity
//!
//! This crate defines the foundational types used throughout the system:
//! - Id / ApplicationScope: entity identity and tenant scoping
//! - Version / VersionGenerator: time-ordered version identifiers
//! - Entity / Field / FieldValue: the entity payload model
//! - VersionedEntity / LogEntry / UniqueClaim: the persisted write-path records
//! - Candidate / SearchEdge / ReconciledResult: the read-path records
//! - Traits: collaborator seams (VersionLog, UniqueClaimStore, PrimaryStore, SecondaryIndex)
//! - Error: shared collaborator error type
//! - Config: `verity.toml` configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod contract;
pub mod entity;
pub mod error;
pub mod search_types;
pub mod traits;
pub mod types;

pub use config::{DurabilityMode, VerityConfig, CONFIG_FILE_NAME};
pub use contract::{
    EntitySet, EntityStatus, LogEntry, Stage, UniqueClaim, Version, VersionGenerator, VersionSet,
    VersionedEntity,
};
pub use entity::{Entity, Field, FieldMap, FieldValue, DISTANCE_FIELD, NAME_FIELD};
pub use error::{VerityError, VerityResult};
pub use search_types::{
    Candidate, CandidateKind, DeindexOp, DirectIdentifier, EdgePath, IndexHit, NodeRole, ReconciledResult,
    SearchEdge, SearchQuery, SelectFieldMapping,
};
pub use traits::{IndexBatch, PrimaryStore, SecondaryIndex, UniqueClaimStore, VersionLog};
pub use types::{ApplicationScope, Id};
