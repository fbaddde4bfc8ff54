//! Collaborators shared by every write stage

use std::fmt;
use std::sync::Arc;
use verity_core::{ApplicationScope, PrimaryStore, UniqueClaimStore, VersionLog};

/// Explicit dependencies of the write and mark pipelines
///
/// Cheap to clone; every collaborator is shared behind an `Arc`.
#[derive(Clone)]
pub struct WriteContext {
    /// Tenant scope all claims and markers are written under
    pub scope: ApplicationScope,
    /// Version lifecycle log
    pub log: Arc<dyn VersionLog>,
    /// Uniqueness claims
    pub claims: Arc<dyn UniqueClaimStore>,
    /// Authoritative entity storage
    pub store: Arc<dyn PrimaryStore>,
}

impl WriteContext {
    /// Bundle collaborators for one scope
    pub fn new(
        scope: ApplicationScope,
        log: Arc<dyn VersionLog>,
        claims: Arc<dyn UniqueClaimStore>,
        store: Arc<dyn PrimaryStore>,
    ) -> Self {
        Self {
            scope,
            log,
            claims,
            store,
        }
    }
}

impl fmt::Debug for WriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteContext")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
