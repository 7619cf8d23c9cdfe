//! Integration tests for `JsonFileStore` and the typed repositories.

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use tutorlog_core::notifications::Notification;
use tutorlog_core::records::{NewRecord, Record, RecordFilter};
use tutorlog_core::roles::{Role, Session};
use tutorlog_store::repositories::{NotificationRepo, RecordRepo, StudentRepo};
use tutorlog_store::{keys, seed, JsonFileStore, KeyValueStore, StoreError};

fn new_record(owner: &str, theme: &str) -> Record {
    let payload = NewRecord {
        date: "01.01.2026".into(),
        time: "10:00".into(),
        group: "G1".into(),
        mentor: "M".into(),
        student: "S".into(),
        theme: theme.into(),
        status: "group".into(),
    };
    Record::create(&Session::new(owner, owner, Role::Support), payload, Utc::now())
}

// ---------------------------------------------------------------------------
// Test: absent keys read as None and survive a reopen once written
// ---------------------------------------------------------------------------

#[test]
fn documents_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("profile:u-aziza").unwrap(), None);
        store
            .set("profile:u-aziza", json!({"version": 1}))
            .unwrap();
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(
        store.get("profile:u-aziza").unwrap(),
        Some(json!({"version": 1}))
    );
    assert_eq!(store.keys().unwrap(), vec!["profile:u-aziza"]);
}

// ---------------------------------------------------------------------------
// Test: no temp files remain after writes
// ---------------------------------------------------------------------------

#[test]
fn writes_leave_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.set("records", json!([])).unwrap();
    store.set("records", json!([1])).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["records.json"]);
}

// ---------------------------------------------------------------------------
// Test: a failed rename removes the temp file
// ---------------------------------------------------------------------------

#[test]
fn failed_rename_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    // A directory where the document file belongs makes the rename fail.
    std::fs::create_dir(dir.path().join("records.json")).unwrap();

    let err = store.set("records", json!([])).unwrap_err();
    assert_matches!(err, StoreError::Io { .. });
    assert!(!dir.path().join("records.json.tmp").exists());
}

// ---------------------------------------------------------------------------
// Test: a corrupt file surfaces a JSON error instead of a default
// ---------------------------------------------------------------------------

#[test]
fn corrupt_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("records.json"), "{not json").unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();

    assert_matches!(store.get("records"), Err(StoreError::Json(_)));
}

// ---------------------------------------------------------------------------
// Test: record repository CRUD on a file store
// ---------------------------------------------------------------------------

#[test]
fn record_repo_crud() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();

    let mut a = new_record("u1", "A");
    let b = new_record("u2", "B");
    RecordRepo::insert(&store, &a).unwrap();
    RecordRepo::insert(&store, &b).unwrap();
    assert_eq!(RecordRepo::list(&store).unwrap().len(), 2);

    a.theme = "A2".into();
    assert!(RecordRepo::replace(&store, &a).unwrap());
    assert_eq!(
        RecordRepo::find_by_id(&store, &a.id).unwrap().unwrap().theme,
        "A2"
    );

    let mine = RecordRepo::list_filtered(
        &store,
        &RecordFilter {
            owner_id: Some("u2".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(mine, vec![b.clone()]);

    assert!(RecordRepo::delete(&store, &b.id).unwrap());
    assert!(!RecordRepo::delete(&store, &b.id).unwrap());
    assert!(!RecordRepo::replace(&store, &b).unwrap());
    assert_eq!(RecordRepo::list(&store).unwrap(), vec![a]);
}

// ---------------------------------------------------------------------------
// Test: notifications mark-all-seen persists
// ---------------------------------------------------------------------------

#[test]
fn notifications_mark_all_seen() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let record = new_record("u1", "A");

    NotificationRepo::insert(&store, &Notification::for_new_record(&record, Utc::now())).unwrap();
    NotificationRepo::insert(&store, &Notification::for_new_record(&record, Utc::now())).unwrap();
    assert_eq!(NotificationRepo::unseen_count(&store).unwrap(), 2);

    assert_eq!(NotificationRepo::mark_all_seen(&store).unwrap(), 2);
    assert_eq!(NotificationRepo::unseen_count(&store).unwrap(), 0);
    assert!(NotificationRepo::list(&store).unwrap().iter().all(|n| n.seen));
}

// ---------------------------------------------------------------------------
// Test: seeding only fills absent keys
// ---------------------------------------------------------------------------

#[test]
fn seed_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.set(keys::RECORDS, json!([])).unwrap();

    let seeded = seed::seed_if_empty(&store).unwrap();
    assert_eq!(seeded, vec![keys::STUDENTS, keys::NOTIFICATIONS]);
    assert!(RecordRepo::list(&store).unwrap().is_empty());

    assert!(seed::seed_if_empty(&store).unwrap().is_empty());

    let hint = StudentRepo::autofill(&store, "sardor").unwrap().unwrap();
    assert_eq!(hint.group, "GW113");
}
