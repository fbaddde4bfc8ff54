//! EntityStore: the Verity facade
//!
//! Wires configuration, the four collaborators, the write pipeline and the
//! read reconcilers together for one application scope.
//!
//! | Constructor | Version log | Config file |
//! |-------------|-------------|-------------|
//! | `in_memory(scope)` | in memory | none |
//! | `open(path, scope)` | `FileVersionLog` in `path` | `path/verity.toml` |
//! | `builder()` | either | either |
//!
//! The primary store, claim store and secondary index are in-memory
//! reference implementations unless the builder is given others.

mod builder;
mod query;

pub use builder::EntityStoreBuilder;
pub use query::QueryPage;

use crate::coordinator::{ReadMetrics, WriteCoordinator, WriteMetrics};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use verity_concurrency::{CommittedEntity, WriteContext, WriteError, WritePipeline};
use verity_core::{
    ApplicationScope, Entity, EntitySet, Field, Id, LogEntry, PrimaryStore, SecondaryIndex,
    UniqueClaimStore, VerityConfig, VerityError, VerityResult, VersionLog, CONFIG_FILE_NAME,
};
use verity_durability::FileVersionLog;
use verity_storage::{InMemoryClaimStore, InMemoryIndex, InMemoryVersionLog, ShardedEntityStore};

/// The collaborators an [`EntityStore`] runs on
#[derive(Clone)]
pub struct Collaborators {
    /// Version lifecycle log
    pub log: Arc<dyn VersionLog>,
    /// Uniqueness claims
    pub claims: Arc<dyn UniqueClaimStore>,
    /// Authoritative entity storage
    pub store: Arc<dyn PrimaryStore>,
    /// Secondary search index
    pub index: Arc<dyn SecondaryIndex>,
}

impl Collaborators {
    /// In-memory reference implementations of all four collaborators
    pub fn in_memory() -> Self {
        Self {
            log: Arc::new(InMemoryVersionLog::new()),
            claims: Arc::new(InMemoryClaimStore::new()),
            store: Arc::new(ShardedEntityStore::new()),
            index: Arc::new(InMemoryIndex::new()),
        }
    }
}

/// Versioned entity store for one application scope
pub struct EntityStore {
    /// Data directory (empty for in-memory stores)
    data_dir: PathBuf,
    scope: ApplicationScope,
    /// Mirrors `verity.toml` for disk-backed stores
    config: RwLock<VerityConfig>,
    collaborators: Collaborators,
    coordinator: WriteCoordinator,
    read_metrics: Arc<ReadMetrics>,
}

impl EntityStore {
    /// Create a store over explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        scope: ApplicationScope,
        config: VerityConfig,
        collaborators: Collaborators,
    ) -> VerityResult<Self> {
        config.validate()?;
        Ok(Self::assemble(PathBuf::new(), scope, config, collaborators))
    }

    /// In-memory store with default configuration
    pub fn in_memory(scope: ApplicationScope) -> Self {
        Self::assemble(
            PathBuf::new(),
            scope,
            VerityConfig::default(),
            Collaborators::in_memory(),
        )
    }

    /// Start building a store
    pub fn builder() -> EntityStoreBuilder {
        EntityStoreBuilder::new()
    }

    /// Open a disk-backed store
    ///
    /// Reads `verity.toml` from the data directory, writing the default
    /// file first if there is none, then replays the version log.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, the config is invalid, or
    /// the version log cannot be opened or is corrupt.
    pub fn open<P: AsRef<Path>>(path: P, scope: ApplicationScope) -> VerityResult<Self> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        VerityConfig::write_default_if_missing(&config_path)?;
        let config = VerityConfig::from_file(&config_path)?;

        Self::open_disk(data_dir, scope, config, None)
    }

    /// Open a disk-backed store with an explicit configuration
    ///
    /// The configuration is written to `verity.toml` so a later
    /// [`open`](Self::open) picks up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        scope: ApplicationScope,
        config: VerityConfig,
    ) -> VerityResult<Self> {
        Self::open_disk(path.as_ref().to_path_buf(), scope, config, None)
    }

    pub(crate) fn open_disk(
        data_dir: PathBuf,
        scope: ApplicationScope,
        config: VerityConfig,
        others: Option<Collaborators>,
    ) -> VerityResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&data_dir)?;
        config.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;

        let log = FileVersionLog::open(&data_dir, config.durability_mode()?)?;
        let stats = log.recovery_stats().clone();
        let mut collaborators = others.unwrap_or_else(Collaborators::in_memory);
        collaborators.log = Arc::new(log);

        info!(
            target: "verity::log",
            dir = %data_dir.display(),
            records = stats.records_replayed,
            skipped = stats.skipped_corrupted,
            truncated = stats.bytes_truncated,
            "Opened entity store"
        );
        Ok(Self::assemble(data_dir, scope, config, collaborators))
    }

    fn assemble(
        data_dir: PathBuf,
        scope: ApplicationScope,
        config: VerityConfig,
        collaborators: Collaborators,
    ) -> Self {
        let ctx = WriteContext::new(
            scope.clone(),
            Arc::clone(&collaborators.log),
            Arc::clone(&collaborators.claims),
            Arc::clone(&collaborators.store),
        );
        Self {
            data_dir,
            scope,
            config: RwLock::new(config),
            collaborators,
            coordinator: WriteCoordinator::new(WritePipeline::new(ctx)),
            read_metrics: Arc::new(ReadMetrics::new()),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Tenant scope
    pub fn scope(&self) -> &ApplicationScope {
        &self.scope
    }

    /// Data directory; empty for in-memory stores
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Whether this store writes nothing to disk
    pub fn is_in_memory(&self) -> bool {
        self.data_dir.as_os_str().is_empty()
    }

    /// Collaborators in use
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Current configuration
    pub fn config(&self) -> VerityConfig {
        self.config.read().clone()
    }

    /// Change the configuration
    ///
    /// Disk-backed stores persist the result to `verity.toml`. Changing the
    /// durability mode of an open store is rejected.
    pub fn update_config<F: FnOnce(&mut VerityConfig)>(&self, f: F) -> VerityResult<()> {
        let mut guard = self.config.write();
        let previous = guard.clone();
        f(&mut guard);
        if guard.durability != previous.durability {
            *guard = previous;
            return Err(VerityError::invalid_input(
                "Cannot change durability mode of an open store",
            ));
        }
        if let Err(e) = guard.validate() {
            *guard = previous;
            return Err(e);
        }
        if !self.is_in_memory() {
            guard.write_to_file(&self.data_dir.join(CONFIG_FILE_NAME))?;
        }
        Ok(())
    }

    /// Write lifecycle metrics
    pub fn write_metrics(&self) -> WriteMetrics {
        self.coordinator.metrics()
    }

    /// Read reconciliation metrics
    pub fn read_metrics(&self) -> &ReadMetrics {
        &self.read_metrics
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Commit an entity
    ///
    /// See [`WritePipeline::commit`] for the error taxonomy.
    pub async fn commit(&self, entity: Entity) -> Result<CommittedEntity, WriteError> {
        self.coordinator.commit(entity).await
    }

    /// Tombstone an entity and release its unique claims
    pub async fn mark(&self, id: Id) -> Result<CommittedEntity, WriteError> {
        self.coordinator.mark(id).await
    }

    // ========================================================================
    // Loads
    // ========================================================================

    /// Load the latest version of an entity
    ///
    /// Returns `None` if the entity was never written or is deleted.
    pub async fn load(&self, id: &Id) -> VerityResult<Option<Entity>> {
        let latest = self.collaborators.store.load_latest(id).await?;
        Ok(latest.filter(|record| !record.is_deleted()).and_then(|record| record.entity))
    }

    /// Load the latest records of many entities, tombstones included
    pub async fn load_batch(&self, ids: &[Id]) -> VerityResult<EntitySet> {
        self.collaborators.store.load_latest_batch(ids).await
    }

    /// Version log entries of an entity, newest first
    pub async fn get_versions(&self, id: &Id) -> VerityResult<Vec<LogEntry>> {
        self.collaborators.log.load_history(id).await
    }

    /// Resolve the owner of a unique field value
    pub async fn get_id_field(&self, entity_type: &str, field: &Field) -> VerityResult<Option<Id>> {
        if !field.value.is_claimable() {
            return Err(VerityError::invalid_input(format!(
                "field '{}' has no claimable value",
                field.name
            )));
        }
        let claim = self
            .collaborators
            .claims
            .load(&self.scope, entity_type, field)
            .await?;
        Ok(claim.map(|c| c.id))
    }
}
