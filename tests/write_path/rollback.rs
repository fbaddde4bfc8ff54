//! Compensation after a failed stage

use crate::common::*;
use verity::WriteError;

fn profile(id: &Id) -> Entity {
    user(id, "ana", "ana@x.io")
        .with_field(Field::unique("handle", FieldValue::String("ana".into())))
        .with_field(Field::unique("badge", FieldValue::Int(7)))
}

#[tokio::test]
async fn store_failure_deletes_every_claim_and_the_log_entry() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.fail.arm(FailPoint::StoreWrite, Trigger::Once);

    let err = t.store.commit(profile(&id)).await.unwrap_err();
    assert!(matches!(err, WriteError::WriteCommit { .. }));
    assert_eq!(t.claims.deleted().len(), 3);
    assert!(t.claims.is_empty());
    assert_eq!(t.log.delete_count(), 1);
    assert_eq!(t.log.entry_count(&id), 0);
}

#[tokio::test]
async fn failed_claim_delete_is_surfaced() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.fail.arm(FailPoint::StoreWrite, Trigger::Once);
    t.fail.arm(FailPoint::ClaimDelete, Trigger::Once);

    let err = t.store.commit(profile(&id)).await.unwrap_err();
    assert!(err.is_rollback_failure());
    // Log entry stays so the id remains visibly wedged
    assert_eq!(t.log.entry_count(&id), 1);
    assert_eq!(t.store.write_metrics().total_rollback_failed, 1);
}

#[tokio::test]
async fn write_start_failure_needs_no_rollback() {
    let t = TestStore::new();
    t.fail.arm(FailPoint::LogAppendActive, Trigger::Once);

    let err = t
        .store
        .commit(profile(&Id::generate("user")))
        .await
        .unwrap_err();
    assert!(matches!(err, WriteError::WriteStart { .. }));
    assert_eq!(t.claims.write_count(), 0);
    assert_eq!(t.log.delete_count(), 0);
}

#[tokio::test]
async fn store_recovers_after_transient_failure() {
    let t = TestStore::new();
    let id = Id::generate("user");
    t.fail.arm(FailPoint::StoreWrite, Trigger::Once);
    assert!(t.store.commit(profile(&id)).await.is_err());

    let committed = t.store.commit(profile(&id)).await.unwrap();
    assert_eq!(t.store.load(&id).await.unwrap().and_then(|e| e.version()), Some(committed.version()));
}
