//! First-writer-wins conflict detection

use crate::common::*;
use verity::{LogEntry, VersionLog, WriteError};

#[tokio::test]
async fn writer_behind_active_entry_conflicts_and_never_commits() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let in_flight = Version::next();
    t.log
        .append(LogEntry::new(id.clone(), in_flight, Stage::Active))
        .await
        .unwrap();

    let err = t.store.commit(user(&id, "ana", "ana@x.io")).await.unwrap_err();
    let WriteError::Conflict { version, preceding, .. } = &err else {
        panic!("expected conflict, got {err:?}");
    };
    assert_eq!(*preceding, in_flight);
    assert!(err.is_retryable());
    assert_ne!(t.log.stage_of(&id, *version), Some(Stage::Committed));
    assert!(t.store.load(&id).await.unwrap().is_none());
    // The losing writer's claim is gone
    assert!(t.claims.is_empty());

    let metrics = t.store.write_metrics();
    assert_eq!(metrics.total_conflicted, 1);
    assert_eq!(metrics.total_rolled_back, 1);
}

#[tokio::test]
async fn conflict_clears_once_the_earlier_writer_commits() {
    let t = TestStore::new();
    let id = Id::generate("user");
    let in_flight = Version::next();
    t.log
        .append(LogEntry::new(id.clone(), in_flight, Stage::Active))
        .await
        .unwrap();
    assert!(t.store.commit(user(&id, "ana", "ana@x.io")).await.is_err());

    t.log
        .append(LogEntry::new(id.clone(), in_flight, Stage::Committed))
        .await
        .unwrap();
    let committed = t.store.commit(user(&id, "ana", "ana@x.io")).await.unwrap();
    assert_eq!(
        t.log.stage_of(&id, committed.version()),
        Some(Stage::Committed)
    );
}
