//! Store builder for fluent configuration

use std::path::PathBuf;
use std::sync::Arc;
use verity_core::{
    ApplicationScope, PrimaryStore, SecondaryIndex, UniqueClaimStore, VerityConfig, VerityError,
    VerityResult, VersionLog, CONFIG_FILE_NAME,
};

use super::{Collaborators, EntityStore};

/// Builder for [`EntityStore`]
///
/// ```ignore
/// let store = EntityStore::builder()
///     .scope(scope)
///     .path("/data/verity")
///     .index(Arc::new(my_index))
///     .build()?;
/// ```
///
/// With a path the version log is file-backed and any `log` given to the
/// builder is ignored.
#[derive(Default)]
pub struct EntityStoreBuilder {
    path: Option<PathBuf>,
    scope: Option<ApplicationScope>,
    config: Option<VerityConfig>,
    log: Option<Arc<dyn VersionLog>>,
    claims: Option<Arc<dyn UniqueClaimStore>>,
    store: Option<Arc<dyn PrimaryStore>>,
    index: Option<Arc<dyn SecondaryIndex>>,
}

impl EntityStoreBuilder {
    /// Create a builder with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Tenant scope (required)
    pub fn scope(mut self, scope: ApplicationScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Data directory; makes the version log durable
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Explicit configuration instead of `verity.toml` or defaults
    pub fn config(mut self, config: VerityConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Version log for in-memory builds
    pub fn log(mut self, log: Arc<dyn VersionLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Uniqueness claim store
    pub fn claims(mut self, claims: Arc<dyn UniqueClaimStore>) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Primary entity store
    pub fn primary(mut self, store: Arc<dyn PrimaryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Secondary index
    pub fn index(mut self, index: Arc<dyn SecondaryIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the store
    ///
    /// # Errors
    ///
    /// Fails if no scope was set, the configuration is invalid, or the
    /// version log cannot be opened.
    pub fn build(self) -> VerityResult<EntityStore> {
        let scope = self.scope.ok_or_else(|| {
            VerityError::invalid_input("EntityStoreBuilder::build() requires a scope")
        })?;

        let defaults = Collaborators::in_memory();
        let collaborators = Collaborators {
            log: self.log.unwrap_or(defaults.log),
            claims: self.claims.unwrap_or(defaults.claims),
            store: self.store.unwrap_or(defaults.store),
            index: self.index.unwrap_or(defaults.index),
        };

        match self.path {
            Some(dir) => {
                let config = match self.config {
                    Some(config) => config,
                    None => {
                        std::fs::create_dir_all(&dir)?;
                        let config_path = dir.join(CONFIG_FILE_NAME);
                        VerityConfig::write_default_if_missing(&config_path)?;
                        VerityConfig::from_file(&config_path)?
                    }
                };
                EntityStore::open_disk(dir, scope, config, Some(collaborators))
            }
            None => EntityStore::new(scope, self.config.unwrap_or_default(), collaborators),
        }
    }
}
