//! Direct lookups by name and uuid

use crate::common::*;
use futures::TryStreamExt;
use verity::{Entity, ReconciledResult};

async fn direct(t: &TestStore, identifiers: Vec<DirectIdentifier>) -> Vec<ReconciledResult<Entity>> {
    t.store
        .query_entities(
            t.edge.clone(),
            SearchQuery::direct("user", identifiers),
            ReadOptions::new(),
        )
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn unknown_name_dropped_with_no_index_calls() {
    let t = TestStore::new();
    let results = direct(&t, vec![DirectIdentifier::Name("ghost".into())]).await;
    assert!(results.is_empty());
    assert_eq!(t.index.batches_created(), 0);
    assert!(t.index.searches().is_empty());
    assert_eq!(t.store.read_metrics().totals().unresolved, 1);
}

#[tokio::test]
async fn name_and_uuid_resolve_to_current_version() {
    let t = TestStore::new();
    let ana = Id::generate("user");
    let bob = Id::generate("user");
    t.store.commit(user(&ana, "Ana", "ana@x.io")).await.unwrap();
    t.store.commit(user(&bob, "Bob", "bob@x.io")).await.unwrap();
    let latest = t
        .store
        .commit(user(&ana, "Ana", "ana2@x.io"))
        .await
        .unwrap()
        .version();

    let results = direct(
        &t,
        vec![
            DirectIdentifier::Name("ana".into()),
            DirectIdentifier::Uuid(bob.uuid()),
            // resolves to ana again; first occurrence wins
            DirectIdentifier::Uuid(ana.uuid()),
        ],
    )
    .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].value.id(), &ana);
    assert_eq!(results[0].value.version(), Some(latest));
    assert_eq!(results[1].value.id(), &bob);
    assert_eq!(t.index.batches_created(), 0);
}

#[tokio::test]
async fn deleted_entity_not_returned_by_uuid() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.store.commit(user(&id, "Ana", "ana@x.io")).await.unwrap();
    t.store.mark(id.clone()).await.unwrap();

    let results = direct(&t, vec![DirectIdentifier::Uuid(id.uuid())]).await;
    assert!(results.is_empty());
    assert_eq!(t.index.batches_created(), 0);
}
