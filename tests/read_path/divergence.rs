//! Store/index divergence handling

use crate::common::*;
use futures::TryStreamExt;
use verity::{DeindexOp, Entity, ReconciledResult};

async fn entities(t: &TestStore, options: ReadOptions) -> Vec<ReconciledResult<Entity>> {
    t.store
        .query_entities(t.edge.clone(), t.users_query(), options)
        .try_collect()
        .await
        .unwrap()
}

async fn update(t: &TestStore, id: &Id, name: &str) -> Version {
    t.store
        .commit(user(id, name, &format!("{}@x.io", id.uuid())))
        .await
        .unwrap()
        .version()
}

#[tokio::test]
async fn consistent_candidates_returned_without_repair() {
    let t = TestStore::new();
    for i in 0..3 {
        let id = Id::generate("user");
        t.commit_indexed(user(&id, "n", &format!("{}@x.io", i))).await;
    }
    assert_eq!(entities(&t, ReadOptions::new()).await.len(), 3);
    assert_eq!(t.index.batches_created(), 0);

    // Idempotent: a second pass changes nothing
    assert_eq!(entities(&t, ReadOptions::new()).await.len(), 3);
    assert_eq!(t.index.batches_created(), 0);
}

#[tokio::test]
async fn stale_candidate_dropped_and_deindexed() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let (_, v1) = t
        .commit_indexed(user(&id, "old", &format!("{}@x.io", id.uuid())))
        .await;
    update(&t, &id, "new").await;

    assert!(entities(&t, ReadOptions::new()).await.is_empty());
    assert_eq!(t.index.deindexed(), vec![DeindexOp::new(t.edge.clone(), id, v1)]);
    assert!(t.index.rows(&t.edge).is_empty());
}

#[tokio::test]
async fn keep_stale_returns_current_data_without_repair() {
    let t = TestStore::with_config(VerityConfig {
        keep_stale_entries: true,
        ..VerityConfig::default()
    });
    let id = Id::generate("user");
    t.commit_indexed(user(&id, "old", &format!("{}@x.io", id.uuid())))
        .await;
    let v2 = update(&t, &id, "new").await;

    let results = entities(&t, ReadOptions::new()).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value.name(), Some("new"));
    assert_eq!(results[0].value.version(), Some(v2));
    assert!(t.index.deindexed().is_empty());

    // A query can still opt out of the configured default
    assert!(entities(&t, ReadOptions::new().keep_stale_entries(false))
        .await
        .is_empty());
    assert_eq!(t.index.deindexed().len(), 1);
}

#[tokio::test]
async fn index_ahead_of_store_dropped_without_repair() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.store
        .commit(user(&id, "ana", "ana@x.io"))
        .await
        .unwrap();
    t.index.index(&t.edge, &id, Version::next());

    assert!(entities(&t, ReadOptions::new()).await.is_empty());
    assert!(t.index.deindexed().is_empty());
    assert_eq!(t.store.read_metrics().totals().ahead, 1);
}

#[tokio::test]
async fn missing_from_store_dropped_without_repair() {
    let t = TestStore::new();
    t.index.index(&t.edge, &Id::generate("user"), Version::next());

    assert!(entities(&t, ReadOptions::new()).await.is_empty());
    assert_eq!(t.index.batches_created(), 0);
    assert_eq!(t.store.read_metrics().totals().missing, 1);
}

#[tokio::test]
async fn marked_entity_deindexed_at_candidate_version() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let (_, v1) = t.commit_indexed(user(&id, "ana", "ana@x.io")).await;
    t.store.mark(id.clone()).await.unwrap();

    assert!(entities(&t, ReadOptions::new()).await.is_empty());
    assert_eq!(t.index.deindexed(), vec![DeindexOp::new(t.edge.clone(), id, v1)]);
}

#[tokio::test]
async fn duplicates_across_edges_keep_newest() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let email = format!("{}@x.io", id.uuid());
    let v1 = t.store.commit(user(&id, "a", &email)).await.unwrap().version();
    let v2 = t.store.commit(user(&id, "b", &email)).await.unwrap().version();
    let v3 = t.store.commit(user(&id, "c", &email)).await.unwrap().version();
    // Same edge, three rows for one id, as a lagging index would leave them
    t.index.index(&t.edge, &id, v1);
    t.index.index(&t.edge, &id, v3);
    t.index.index(&t.edge, &id, v2);

    let results = entities(&t, ReadOptions::new()).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value.name(), Some("c"));

    let mut repaired: Vec<Version> = t.index.deindexed().iter().map(|op| op.version).collect();
    repaired.sort();
    assert_eq!(repaired, vec![v1, v2]);
    assert_eq!(t.index.rows(&t.edge).len(), 1);
}

#[tokio::test]
async fn id_query_repairs_at_store_version() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.commit_indexed(user(&id, "old", &format!("{}@x.io", id.uuid())))
        .await;
    let v2 = update(&t, &id, "new").await;

    let ids: Vec<_> = t
        .store
        .query_ids(t.edge.clone(), t.users_query())
        .try_collect()
        .await
        .unwrap();
    assert!(ids.is_empty());
    assert_eq!(t.index.deindexed(), vec![DeindexOp::new(t.edge.clone(), id, v2)]);
}

#[tokio::test]
async fn failed_repair_surfaces_as_error() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.commit_indexed(user(&id, "old", &format!("{}@x.io", id.uuid())))
        .await;
    update(&t, &id, "new").await;
    t.fail.arm(FailPoint::BatchExecute, Trigger::Once);

    let err = t
        .store
        .query_entities(t.edge.clone(), t.users_query(), ReadOptions::new())
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();
    assert!(err.is_repair_failure());
}
