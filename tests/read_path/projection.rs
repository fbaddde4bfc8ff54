//! Field selection on entity queries

use crate::common::*;
use futures::TryStreamExt;
use verity::{Entity, ReconciledResult, DISTANCE_FIELD};

async fn run(t: &TestStore, query: SearchQuery, options: ReadOptions) -> Vec<ReconciledResult<Entity>> {
    t.store
        .query_entities(t.edge.clone(), query, options)
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn query_select_renames_and_extracts_nested_fields() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.commit_indexed(user_with_address(&id, "ana", "Lisbon")).await;

    let query = t.users_query().with_select(vec![
        SelectFieldMapping::rename("name", "display"),
        SelectFieldMapping::keep("address.city"),
    ]);
    let results = run(&t, query, ReadOptions::new()).await;
    let entity = &results[0].value;
    assert_eq!(entity.fields().len(), 2);
    assert_eq!(
        entity.field("display").and_then(|f| f.value.as_str()),
        Some("ana")
    );
    let address = entity
        .field("address")
        .and_then(|f| f.value.as_object())
        .unwrap();
    assert_eq!(address.len(), 1);
    assert_eq!(address["city"].value.as_str(), Some("Lisbon"));
}

#[tokio::test]
async fn options_projection_overrides_query_select() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.commit_indexed(user_with_address(&id, "ana", "Porto")).await;

    let query = t
        .users_query()
        .with_select(vec![SelectFieldMapping::keep("name")]);
    let options = ReadOptions::new().projection(vec![SelectFieldMapping::rename("address.city", "city")]);
    let results = run(&t, query, options).await;
    let entity = &results[0].value;
    assert_eq!(entity.fields().len(), 1);
    assert_eq!(entity.field("city").and_then(|f| f.value.as_str()), Some("Porto"));
}

#[tokio::test]
async fn geo_distance_returned_when_selected() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let committed = t
        .store
        .commit(user_with_address(&id, "ana", "Faro"))
        .await
        .unwrap();
    t.index.index_geo(&t.edge, &id, committed.version(), 12.5);

    let everything = run(&t, t.users_query(), ReadOptions::new()).await;
    assert_eq!(
        everything[0].value.field(DISTANCE_FIELD).map(|f| f.value.clone()),
        Some(FieldValue::Float(12.5))
    );

    let names_only = run(
        &t,
        t.users_query().with_select(vec![SelectFieldMapping::keep("name")]),
        ReadOptions::new(),
    )
    .await;
    assert!(names_only[0].value.field(DISTANCE_FIELD).is_none());
}
