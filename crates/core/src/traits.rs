//! Collaborator traits
//!
//! The persistence core never talks to a concrete database. It depends on
//! four collaborators, each behind a trait so that implementations can be
//! swapped without touching the write or read pipelines:
//!
//! - [`VersionLog`]: append-only per-id version lifecycle markers
//! - [`UniqueClaimStore`]: uniqueness claim rows
//! - [`PrimaryStore`]: authoritative versioned entity storage
//! - [`SecondaryIndex`] + [`IndexBatch`]: eventually-consistent search index
//!
//! Every method is a suspension point. Implementations surface their own
//! timeouts as `VerityError::Timeout`; the pipelines treat any error as fatal
//! for the operation in flight.
//!
//! Thread safety: all collaborators are shared behind `Arc` across tasks
//! (requires Send + Sync).

use async_trait::async_trait;

use crate::contract::{EntitySet, LogEntry, UniqueClaim, Version, VersionSet, VersionedEntity};
use crate::entity::Field;
use crate::error::VerityResult;
use crate::search_types::{IndexHit, SearchEdge, SearchQuery};
use crate::types::{ApplicationScope, Id};

/// Append-only log of version lifecycle markers
#[async_trait]
pub trait VersionLog: Send + Sync {
    /// Append a marker
    ///
    /// A marker for an existing (id, version) supersedes the previous one.
    async fn append(&self, entry: LogEntry) -> VerityResult<()>;

    /// Load up to `count` entries for `id` with version <= `from`, newest first
    async fn load_recent(&self, id: &Id, from: Version, count: usize)
        -> VerityResult<Vec<LogEntry>>;

    /// Remove the marker for (id, version)
    ///
    /// Removing a marker that does not exist is not an error.
    async fn delete(&self, id: &Id, version: Version) -> VerityResult<()>;

    /// All entries for `id`, newest first
    async fn load_history(&self, id: &Id) -> VerityResult<Vec<LogEntry>>;
}

/// Storage for uniqueness claims
#[async_trait]
pub trait UniqueClaimStore: Send + Sync {
    /// Write a claim, replacing any claim on the same row
    async fn write(&self, claim: &UniqueClaim) -> VerityResult<()>;

    /// Delete a claim
    ///
    /// Only removes the row if it is still owned by the claim's id and
    /// version; a row since re-claimed by another version is left alone.
    async fn delete(&self, claim: &UniqueClaim) -> VerityResult<()>;

    /// Load the claim on (scope, entity type, field), if any
    async fn load(
        &self,
        scope: &ApplicationScope,
        entity_type: &str,
        field: &Field,
    ) -> VerityResult<Option<UniqueClaim>>;

    /// All claims held by any version of `id`
    async fn load_for_entity(
        &self,
        scope: &ApplicationScope,
        id: &Id,
    ) -> VerityResult<Vec<UniqueClaim>>;
}

/// Authoritative versioned entity storage
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Latest stored version of one entity
    async fn load_latest(&self, id: &Id) -> VerityResult<Option<VersionedEntity>>;

    /// Latest stored versions of many entities
    ///
    /// Ids absent from the store are absent from the returned set.
    async fn load_latest_batch(&self, ids: &[Id]) -> VerityResult<EntitySet>;

    /// Latest stored version numbers of many entities
    async fn load_latest_versions(&self, ids: &[Id]) -> VerityResult<VersionSet>;

    /// Persist a versioned entity
    ///
    /// Writing an older version than the one stored does not regress the
    /// latest version.
    async fn write(&self, entity: &VersionedEntity) -> VerityResult<()>;

    /// Resolve an entity id by type and name
    async fn lookup_id_by_name(&self, entity_type: &str, name: &str) -> VerityResult<Option<Id>>;
}

/// Eventually-consistent secondary search index
#[async_trait]
pub trait SecondaryIndex: Send + Sync {
    /// Fetch one page of hits for `query` within `edge`
    ///
    /// A page shorter than `limit` means the result set is exhausted.
    async fn search(
        &self,
        edge: &SearchEdge,
        query: &SearchQuery,
        limit: usize,
        offset: usize,
    ) -> VerityResult<Vec<IndexHit>>;

    /// Start a batch of repair mutations
    fn create_batch(&self) -> Box<dyn IndexBatch>;
}

/// Accumulated index repair mutations
///
/// A batch is private to one page evaluation and executed at most once.
#[async_trait]
pub trait IndexBatch: Send {
    /// Queue removal of the index row for (edge, id, version)
    fn deindex(&mut self, edge: &SearchEdge, id: &Id, version: Version);

    /// Number of queued mutations
    fn len(&self) -> usize;

    /// Whether no mutations are queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply all queued mutations
    async fn execute(self: Box<Self>) -> VerityResult<()>;
}
