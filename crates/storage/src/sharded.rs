//! Sharded in-memory primary store
//!
//! Entities are held in a `DashMap` keyed by [`Id`], each entry a
//! [`VersionChain`] of every version written for that id, newest first.
//!
//! # Design
//!
//! - DashMap: sharded, so writers to different ids never contend
//! - VersionChain: newest-first `VecDeque`, latest read is O(1)
//! - Name index: (entity type, lowercased name) → Id, kept in step with the
//!   latest non-deleted version of each entity
//!
//! # Ordering
//!
//! A chain is kept sorted by version. Writing a version older than the
//! current head inserts it in place without moving the head, so a slow or
//! replayed writer can never regress what readers see as "latest".

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use verity_core::{
    EntitySet, Id, PrimaryStore, Version, VersionSet, VersionedEntity, VerityResult,
};

use crate::testing::{FailPoint, FailPoints};

/// Every stored version of one entity, newest first
#[derive(Debug, Clone)]
pub struct VersionChain {
    versions: VecDeque<VersionedEntity>,
}

impl VersionChain {
    /// Create a chain holding a single version
    pub fn new(entity: VersionedEntity) -> Self {
        let mut versions = VecDeque::with_capacity(4);
        versions.push_front(entity);
        Self { versions }
    }

    /// Insert a version, keeping newest-first order
    ///
    /// Writing an existing version replaces it.
    pub fn push(&mut self, entity: VersionedEntity) {
        match self
            .versions
            .iter()
            .position(|existing| existing.version <= entity.version)
        {
            Some(pos) if self.versions[pos].version == entity.version => {
                self.versions[pos] = entity;
            }
            Some(pos) => self.versions.insert(pos, entity),
            None => self.versions.push_back(entity),
        }
    }

    /// The newest version
    #[inline]
    pub fn latest(&self) -> Option<&VersionedEntity> {
        self.versions.front()
    }

    /// A specific version
    pub fn get(&self, version: Version) -> Option<&VersionedEntity> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Number of versions held
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// In-memory [`PrimaryStore`]
#[derive(Debug, Default)]
pub struct ShardedEntityStore {
    entities: DashMap<Id, VersionChain>,
    names: DashMap<(String, String), Id>,
    fail: FailPoints,
    writes: AtomicU64,
    batch_loads: AtomicU64,
}

impl ShardedEntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store consulting the given failure points
    pub fn with_fail_points(fail: FailPoints) -> Self {
        Self {
            fail,
            ..Self::default()
        }
    }

    /// A specific stored version, if present
    pub fn get_version(&self, id: &Id, version: Version) -> Option<VersionedEntity> {
        self.entities
            .get(id)
            .and_then(|chain| chain.get(version).cloned())
    }

    /// Number of versions stored for an id
    pub fn version_count(&self, id: &Id) -> usize {
        self.entities.get(id).map_or(0, |chain| chain.len())
    }

    /// Number of successful writes
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of batch loads served
    pub fn batch_load_count(&self) -> u64 {
        self.batch_loads.load(Ordering::Relaxed)
    }

    fn name_key(entity_type: &str, name: &str) -> (String, String) {
        (entity_type.to_string(), name.to_lowercase())
    }

    fn reindex_name(&self, id: &Id, previous: Option<&str>, latest: &VersionedEntity) {
        if let Some(old) = previous {
            let key = Self::name_key(id.entity_type(), old);
            self.names.remove_if(&key, |_, owner| owner == id);
        }
        if latest.is_deleted() {
            return;
        }
        if let Some(name) = latest.entity.as_ref().and_then(|e| e.name()) {
            self.names
                .insert(Self::name_key(id.entity_type(), name), id.clone());
        }
    }
}

#[async_trait]
impl PrimaryStore for ShardedEntityStore {
    async fn load_latest(&self, id: &Id) -> VerityResult<Option<VersionedEntity>> {
        self.fail.check(FailPoint::StoreLoad)?;
        Ok(self
            .entities
            .get(id)
            .and_then(|chain| chain.latest().cloned()))
    }

    async fn load_latest_batch(&self, ids: &[Id]) -> VerityResult<EntitySet> {
        self.fail.check(FailPoint::StoreLoad)?;
        self.batch_loads.fetch_add(1, Ordering::Relaxed);
        let mut set = EntitySet::with_capacity(ids.len());
        for id in ids {
            if let Some(latest) = self.entities.get(id).and_then(|c| c.latest().cloned()) {
                set.insert(id.clone(), latest);
            }
        }
        Ok(set)
    }

    async fn load_latest_versions(&self, ids: &[Id]) -> VerityResult<VersionSet> {
        self.fail.check(FailPoint::StoreLoad)?;
        self.batch_loads.fetch_add(1, Ordering::Relaxed);
        let mut set = VersionSet::with_capacity(ids.len());
        for id in ids {
            if let Some(version) = self
                .entities
                .get(id)
                .and_then(|c| c.latest().map(|v| v.version))
            {
                set.insert(id.clone(), version);
            }
        }
        Ok(set)
    }

    async fn write(&self, entity: &VersionedEntity) -> VerityResult<()> {
        self.fail.check(FailPoint::StoreWrite)?;

        let mut chain = self
            .entities
            .entry(entity.id.clone())
            .or_insert_with(|| VersionChain {
                versions: VecDeque::with_capacity(4),
            });
        let previous_name = chain
            .latest()
            .filter(|v| !v.is_deleted())
            .and_then(|v| v.entity.as_ref())
            .and_then(|e| e.name().map(str::to_string));
        chain.push(entity.clone());
        if let Some(latest) = chain.latest() {
            if latest.version == entity.version {
                self.reindex_name(&entity.id, previous_name.as_deref(), latest);
            }
        }
        drop(chain);

        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: "verity::store", id = %entity.id, version = %entity.version, "Stored version");
        Ok(())
    }

    async fn lookup_id_by_name(&self, entity_type: &str, name: &str) -> VerityResult<Option<Id>> {
        self.fail.check(FailPoint::StoreLoad)?;
        Ok(self
            .names
            .get(&Self::name_key(entity_type, name))
            .map(|id| id.clone()))
    }
}
