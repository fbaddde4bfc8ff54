//! Verity - versioned entity persistence with index reconciliation
//!
//! Verity commits entity versions through an optimistic, first-writer-wins
//! write pipeline with compensating rollback, and reconciles an eventually
//! consistent secondary index against the authoritative primary store on
//! every read.
//!
//! # Quick Start
//!
//! ```ignore
//! use verity::{ApplicationScope, Entity, EntityStore, Field, FieldValue, Id};
//!
//! let store = EntityStore::in_memory(ApplicationScope::for_application(app_uuid));
//!
//! let id = Id::generate("user");
//! let entity = Entity::new(id.clone())
//!     .with_field(Field::unique("email", FieldValue::String("ana@example.com".into())));
//! let committed = store.commit(entity).await?;
//!
//! let loaded = store.load(&id).await?;
//! ```
//!
//! # Architecture
//!
//! All operations go through [`EntityStore`]. The collaborator traits
//! ([`VersionLog`], [`UniqueClaimStore`], [`PrimaryStore`], [`SecondaryIndex`])
//! are the seams for plugging in real storage.

pub use verity_concurrency::{CommittedEntity, RollbackReport, WriteError};
pub use verity_core::{
    ApplicationScope, Candidate, CandidateKind, DeindexOp, DirectIdentifier, DurabilityMode,
    EdgePath, Entity, EntitySet, EntityStatus, Field, FieldMap, FieldValue, Id, IndexBatch,
    IndexHit, LogEntry, PrimaryStore, ReconciledResult, SearchEdge, SearchQuery, SecondaryIndex,
    SelectFieldMapping, Stage, UniqueClaim, UniqueClaimStore, VerityConfig, VerityError,
    VerityResult, Version, VersionLog, VersionedEntity, DISTANCE_FIELD, NAME_FIELD,
};
pub use verity_engine::{
    Collaborators, EntityStore, EntityStoreBuilder, QueryPage, ReadMetrics, WriteMetrics,
};
pub use verity_search::{ReadError, ReadOptions, ReadStats};
