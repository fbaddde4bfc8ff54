//! Paging, resumption and cancellation

use crate::common::*;
use futures::TryStreamExt;
use verity_storage::SearchCall;

async fn seed(t: &TestStore, n: usize) -> Vec<Id> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let id = Id::generate("user");
        t.commit_indexed(user(&id, "n", &format!("{}@x.io", i))).await;
        ids.push(id);
    }
    ids
}

fn limit(n: usize) -> VerityConfig {
    VerityConfig {
        query_limit: n,
        ..VerityConfig::default()
    }
}

#[tokio::test]
async fn producer_stops_at_first_short_page() {
    let t = TestStore::with_config(limit(4));
    seed(&t, 10).await;

    let results: Vec<_> = t
        .store
        .query_ids(t.edge.clone(), t.users_query())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(
        t.index.searches(),
        vec![
            SearchCall { limit: 4, offset: 0 },
            SearchCall { limit: 4, offset: 4 },
            SearchCall { limit: 4, offset: 8 },
        ]
    );
}

#[tokio::test]
async fn dropping_the_stream_stops_searching() {
    let t = TestStore::with_config(limit(2));
    seed(&t, 10).await;

    let mut stream = Box::pin(t.store.query_entities(
        t.edge.clone(),
        t.users_query(),
        ReadOptions::new(),
    ));
    stream.try_next().await.unwrap();
    stream.try_next().await.unwrap();
    drop(stream);

    assert_eq!(t.index.searches().len(), 1);
}

#[tokio::test]
async fn paged_queries_resume_from_returned_offset() {
    let t = TestStore::with_config(limit(3));
    let ids = seed(&t, 7).await;

    let mut offset = Some(0);
    let mut seen = Vec::new();
    while let Some(from) = offset {
        let page = t
            .store
            .query_page(t.edge.clone(), t.users_query(), ReadOptions::new(), from)
            .await
            .unwrap();
        seen.extend(page.results.into_iter().map(|r| r.value.id().clone()));
        offset = page.next_offset;
    }
    assert_eq!(seen, ids);
    assert_eq!(t.store.read_metrics().pages(), 3);
}

#[tokio::test]
async fn search_failure_is_fatal() {
    let t = TestStore::new();
    seed(&t, 1).await;
    t.fail.arm(FailPoint::IndexSearch, Trigger::Once);

    let result = t
        .store
        .query_ids(t.edge.clone(), t.users_query())
        .try_collect::<Vec<_>>()
        .await;
    assert!(result.is_err());
}
