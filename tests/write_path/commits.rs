//! Commit ordering, uniqueness and marks

use crate::common::*;
use verity::{EntityStatus, PrimaryStore, WriteError};

#[tokio::test]
async fn sequential_commits_have_increasing_versions() {
    let t = TestStore::new();
    let id = Id::generate("user");

    let first = t.store.commit(user(&id, "ana", "ana@x.io")).await.unwrap();
    let mut again = user(&id, "ana", "ana@x.io");
    again.set_version(first.version());
    let second = t.store.commit(again).await.unwrap();

    assert!(second.version() > first.version());
    assert_eq!(second.record.status, EntityStatus::Complete);
    let latest = t.primary.load_latest(&id).await.unwrap().unwrap();
    assert_eq!(latest.version, second.version());
}

#[tokio::test]
async fn duplicate_unique_value_rejected_for_other_entity() {
    let t = TestStore::new();
    t.store
        .commit(user(&Id::generate("user"), "ana", "shared@x.io"))
        .await
        .unwrap();

    let loser = Id::generate("user");
    let err = t
        .store
        .commit(user(&loser, "bob", "SHARED@x.io"))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::UniqueViolation { .. }));
    assert!(!err.is_retryable());
    assert!(t.store.load(&loser).await.unwrap().is_none());
    assert!(t.store.get_versions(&loser).await.unwrap().is_empty());
}

#[tokio::test]
async fn changing_unique_value_frees_the_old_one() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.store.commit(user(&id, "ana", "old@x.io")).await.unwrap();
    let changed = t.store.commit(user(&id, "ana", "new@x.io")).await.unwrap();
    assert_eq!(changed.released_claims, 1);

    let other = Id::generate("user");
    t.store.commit(user(&other, "bob", "old@x.io")).await.unwrap();

    let owner = t
        .store
        .get_id_field("user", &Field::unique("email", FieldValue::String("old@x.io".into())))
        .await
        .unwrap();
    assert_eq!(owner, Some(other));
}

#[tokio::test]
async fn mark_releases_claims_and_hides_entity() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.store.commit(user(&id, "ana", "ana@x.io")).await.unwrap();

    let marked = t.store.mark(id.clone()).await.unwrap();
    assert!(marked.entity().is_none());
    assert!(t.store.load(&id).await.unwrap().is_none());

    let history = t.store.get_versions(&id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, marked.version());

    t.store
        .commit(user(&Id::generate("user"), "bob", "ana@x.io"))
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_writers_to_distinct_ids_all_commit() {
    let t = std::sync::Arc::new(TestStore::new());
    let mut handles = Vec::new();
    for i in 0..16 {
        let t = t.clone();
        handles.push(tokio::spawn(async move {
            let id = Id::generate("user");
            t.store
                .commit(user(&id, "n", &format!("user{}@x.io", i)))
                .await
                .map(|c| c.version())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let metrics = t.store.write_metrics();
    assert_eq!(metrics.total_committed, 16);
    assert_eq!(metrics.active_count, 0);
}
