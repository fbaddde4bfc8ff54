//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};
pub use verity::{
    ApplicationScope, Collaborators, DirectIdentifier, Entity, EntityStore, Field, FieldValue,
    Id, ReadOptions, SearchEdge, SearchQuery, SelectFieldMapping, Stage, VerityConfig, Version,
};
pub use verity_storage::{
    FailPoint, FailPoints, InMemoryClaimStore, InMemoryIndex, InMemoryVersionLog,
    ShardedEntityStore, Trigger,
};

// ============================================================================
// Logging
// ============================================================================

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=verity::read=debug`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TestStore - in-memory store with handles on every collaborator
// ============================================================================

/// In-memory store whose collaborators stay reachable for assertions
pub struct TestStore {
    pub store: EntityStore,
    pub log: Arc<InMemoryVersionLog>,
    pub claims: Arc<InMemoryClaimStore>,
    pub primary: Arc<ShardedEntityStore>,
    pub index: InMemoryIndex,
    pub fail: FailPoints,
    pub edge: SearchEdge,
}

impl TestStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(VerityConfig::default())
    }

    /// Create a store with the given configuration
    pub fn with_config(config: VerityConfig) -> Self {
        init_test_logging();
        let fail = FailPoints::new();
        let log = Arc::new(InMemoryVersionLog::with_fail_points(fail.clone()));
        let claims = Arc::new(InMemoryClaimStore::with_fail_points(fail.clone()));
        let primary = Arc::new(ShardedEntityStore::with_fail_points(fail.clone()));
        let index = InMemoryIndex::with_fail_points(fail.clone());
        let scope = ApplicationScope::for_application(uuid::Uuid::new_v4());
        let edge = SearchEdge::collection(scope.application().clone(), "users");
        let collaborators = Collaborators {
            log: log.clone(),
            claims: claims.clone(),
            store: primary.clone(),
            index: Arc::new(index.clone()),
        };
        let store = EntityStore::new(scope, config, collaborators).expect("valid config");
        TestStore {
            store,
            log,
            claims,
            primary,
            index,
            fail,
            edge,
        }
    }

    /// Commit a user and index the committed version under `self.edge`
    pub async fn commit_indexed(&self, entity: Entity) -> (Id, Version) {
        let committed = self.store.commit(entity).await.expect("commit");
        let id = committed.id().clone();
        self.index.index(&self.edge, &id, committed.version());
        (id, committed.version())
    }

    /// Index query over users
    pub fn users_query(&self) -> SearchQuery {
        SearchQuery::index("user", "select *")
    }
}

// ============================================================================
// Entity builders
// ============================================================================

/// A user with a unique email and a plain name
pub fn user(id: &Id, name: &str, email: &str) -> Entity {
    Entity::new(id.clone())
        .with_field(Field::new("name", FieldValue::String(name.into())))
        .with_field(Field::unique("email", FieldValue::String(email.into())))
}

/// A user with a nested address object
pub fn user_with_address(id: &Id, name: &str, city: &str) -> Entity {
    Entity::from_json(
        id.clone(),
        serde_json::json!({
            "name": name,
            "address": {"city": city, "zip": "1000"}
        }),
        &[],
    )
}
