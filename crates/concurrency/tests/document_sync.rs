use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tutorlog_concurrency::{ChangeFeed, DocumentView, LockService, VersionedStore};
use tutorlog_core::merge::DocumentData;
use tutorlog_store::{JsonFileStore, SharedStore};

fn obj(v: Value) -> DocumentData {
    match v {
        Value::Object(m) => m,
        _ => panic!("expected object"),
    }
}

async fn wait_for_version(view: &DocumentView, version: u64) {
    for _ in 0..200 {
        if view.version() >= version {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("view never reached version {version}, at {}", view.version());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_converge_and_never_downgrade() {
    let dir = tempfile::tempdir().unwrap();
    let store: SharedStore = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let docs = VersionedStore::profile("u-aziza", store, LockService::default(), ChangeFeed::default());

    let a = Arc::new(DocumentView::open(docs.clone(), "tab-a").unwrap());
    let b = Arc::new(DocumentView::open(docs.clone(), "tab-b").unwrap());
    let _la = a.spawn_listener();
    let _lb = b.spawn_listener();

    a.edit(obj(json!({"full_name": "Aziza Karimova"})));
    a.save().await.unwrap();
    wait_for_version(&b, 1).await;
    assert_eq!(b.snapshot().data["full_name"], "Aziza Karimova");

    b.edit(obj(json!({"phone": "+998 90 123 45 67"})));
    b.save().await.unwrap();
    wait_for_version(&a, 2).await;

    // Replaying an old signal must not move a view backwards.
    let stale = json!({"data": {"full_name": "Old"}, "version": 1}).to_string();
    assert!(!a.on_document_changed("profile:u-aziza", &stale, "tab-b"));

    let snap = a.snapshot();
    assert_eq!(snap.version, 2);
    assert_eq!(snap.data["full_name"], "Aziza Karimova");
    assert_eq!(snap.data["phone"], "+998 90 123 45 67");

    // The file store holds the same value after a reopen.
    let reopened: SharedStore = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let persisted = VersionedStore::profile("u-aziza", reopened, LockService::default(), ChangeFeed::default())
        .read()
        .unwrap();
    assert_eq!(persisted.version, 2);
    assert_eq!(persisted.data, snap.data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_from_same_base_produce_one_winner() {
    let store: SharedStore = Arc::new(tutorlog_store::MemoryStore::new());
    let docs = VersionedStore::profile("u-aziza", store, LockService::default(), ChangeFeed::default());

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let docs = docs.clone();
            tokio::spawn(async move {
                docs.write(&format!("tab-{i}"), 0, &obj(json!({"bio": format!("bio {i}")})))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut saved = 0;
    for task in tasks {
        if !task.await.unwrap().is_conflict() {
            saved += 1;
        }
    }
    assert_eq!(saved, 1);
    assert_eq!(docs.read().unwrap().version, 1);
}
