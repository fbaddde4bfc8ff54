//! Disk-backed version log across reopen

use crate::common::*;
use tempfile::TempDir;

fn scope() -> ApplicationScope {
    ApplicationScope::for_application(uuid::Uuid::new_v4())
}

#[tokio::test]
async fn committed_versions_survive_reopen() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let scope = scope();
    let id = Id::generate("user");

    let (first, second) = {
        let store = EntityStore::open(dir.path(), scope.clone()).unwrap();
        let first = store.commit(user(&id, "ana", "a@x.io")).await.unwrap();
        let second = store.commit(user(&id, "ana", "a@x.io")).await.unwrap();
        (first.version(), second.version())
    };

    let store = EntityStore::open(dir.path(), scope).unwrap();
    let history = store.get_versions(&id).await.unwrap();
    let versions: Vec<Version> = history.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![second, first]);
    assert!(history.iter().all(|e| e.stage == Stage::Committed));
}

#[tokio::test]
async fn rolled_back_entries_do_not_reappear() {
    let dir = TempDir::new().unwrap();
    let scope = scope();
    let id = Id::generate("user");
    {
        let store = EntityStore::open(dir.path(), scope.clone()).unwrap();
        store
            .commit(user(&Id::generate("user"), "ana", "taken@x.io"))
            .await
            .unwrap();
        assert!(store.commit(user(&id, "bob", "taken@x.io")).await.is_err());
    }
    let store = EntityStore::open(dir.path(), scope).unwrap();
    assert!(store.get_versions(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn always_durability_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let config = VerityConfig {
        durability: "always".to_string(),
        ..VerityConfig::default()
    };
    {
        let store = EntityStore::open_with_config(dir.path(), scope(), config.clone()).unwrap();
        store
            .commit(user(&Id::generate("user"), "ana", "a@x.io"))
            .await
            .unwrap();
    }
    let store = EntityStore::open(dir.path(), scope()).unwrap();
    assert_eq!(store.config(), config);
}
