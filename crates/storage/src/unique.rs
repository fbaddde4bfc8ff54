//! In-memory uniqueness claim store
//!
//! One row per (scope, entity type, field name, canonical value). Writing a
//! row replaces whatever claim was there; deleting only removes a row that
//! is still owned by the deleting claim's (id, version).

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use verity_core::contract::claim_row_key;
use verity_core::{
    ApplicationScope, Field, Id, UniqueClaim, UniqueClaimStore, VerityError, VerityResult,
};

use crate::testing::{FailPoint, FailPoints};

type ClaimKey = (ApplicationScope, String, String, String);

/// In-memory [`UniqueClaimStore`]
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    rows: DashMap<ClaimKey, UniqueClaim>,
    fail: FailPoints,
    deleted: Mutex<Vec<UniqueClaim>>,
    writes: AtomicU64,
}

impl InMemoryClaimStore {
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

    /// Number of claim rows currently held
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no claim rows are held
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every delete call received, in arrival order
    pub fn deleted(&self) -> Vec<UniqueClaim> {
        self.deleted.lock().clone()
    }

    /// Number of writes accepted
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn key(scope: &ApplicationScope, entity_type: &str, field: &Field) -> VerityResult<ClaimKey> {
        let (entity_type, name, value) = claim_row_key(entity_type, field).ok_or_else(|| {
            VerityError::invalid_input(format!("field '{}' cannot be claimed", field.name))
        })?;
        Ok((scope.clone(), entity_type, name, value))
    }
}

#[async_trait]
impl UniqueClaimStore for InMemoryClaimStore {
    async fn write(&self, claim: &UniqueClaim) -> VerityResult<()> {
        self.fail.check(FailPoint::ClaimWrite)?;
        let key = Self::key(&claim.scope, claim.id.entity_type(), &claim.field)?;
        self.rows.insert(key, claim.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, claim: &UniqueClaim) -> VerityResult<()> {
        self.fail.check(FailPoint::ClaimDelete)?;
        let key = Self::key(&claim.scope, claim.id.entity_type(), &claim.field)?;
        self.rows
            .remove_if(&key, |_, held| held.is_owned_by(&claim.id, claim.version));
        self.deleted.lock().push(claim.clone());
        Ok(())
    }

    async fn load(
        &self,
        scope: &ApplicationScope,
        entity_type: &str,
        field: &Field,
    ) -> VerityResult<Option<UniqueClaim>> {
        self.fail.check(FailPoint::ClaimLoad)?;
        let key = Self::key(scope, entity_type, field)?;
        Ok(self.rows.get(&key).map(|row| row.clone()))
    }

    async fn load_for_entity(
        &self,
        scope: &ApplicationScope,
        id: &Id,
    ) -> VerityResult<Vec<UniqueClaim>> {
        self.fail.check(FailPoint::ClaimLoad)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| &row.scope == scope && &row.id == id)
            .map(|row| row.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use verity_core::{FieldValue, Version};

    fn email(value: &str) -> Field {
        Field::unique("email", FieldValue::String(value.into()))
    }

    fn scope() -> ApplicationScope {
        ApplicationScope::for_application(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let store = InMemoryClaimStore::new();
        let scope = scope();
        let id = Id::generate("user");
        let claim = UniqueClaim::new(scope.clone(), email("a@x.io"), id.clone(), Version::next());
        store.write(&claim).await.unwrap();
        let loaded = store.load(&scope, "user", &email("A@X.IO")).await.unwrap();
        assert_eq!(loaded, Some(claim));
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = InMemoryClaimStore::new();
        let a = scope();
        let claim = UniqueClaim::new(a, email("a@x.io"), Id::generate("user"), Version::next());
        store.write(&claim).await.unwrap();
        assert!(store.load(&scope(), "user", &email("a@x.io")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_only_removes_owned_row() {
        let store = InMemoryClaimStore::new();
        let scope = scope();
        let id = Id::generate("user");
        let old = UniqueClaim::new(scope.clone(), email("a@x.io"), id.clone(), Version::next());
        let new = UniqueClaim::new(scope.clone(), email("a@x.io"), id.clone(), Version::next());
        store.write(&old).await.unwrap();
        store.write(&new).await.unwrap();

        store.delete(&old).await.unwrap();
        assert_eq!(store.len(), 1);
        store.delete(&new).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.deleted().len(), 2);
    }

    #[tokio::test]
    async fn test_load_for_entity() {
        let store = InMemoryClaimStore::new();
        let scope = scope();
        let id = Id::generate("user");
        let v = Version::next();
        store
            .write(&UniqueClaim::new(scope.clone(), email("a@x.io"), id.clone(), v))
            .await
            .unwrap();
        store
            .write(&UniqueClaim::new(
                scope.clone(),
                Field::unique("handle", FieldValue::String("ace".into())),
                id.clone(),
                v,
            ))
            .await
            .unwrap();
        store
            .write(&UniqueClaim::new(
                scope.clone(),
                email("b@x.io"),
                Id::generate("user"),
                Version::next(),
            ))
            .await
            .unwrap();
        assert_eq!(store.load_for_entity(&scope, &id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unclaimable_value_rejected() {
        let store = InMemoryClaimStore::new();
        let field = Field::unique("score", FieldValue::Float(1.5));
        let claim = UniqueClaim::new(scope(), field, Id::generate("user"), Version::next());
        assert!(store.write(&claim).await.is_err());
    }
}
