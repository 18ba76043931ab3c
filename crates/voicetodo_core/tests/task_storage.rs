use voicetodo_core::{
    FileKeyValueStore, KeyValueStore, KeyValueTaskRepository, MemoryKeyValueStore,
    SqliteKeyValueStore, StoreError, Task, TaskRepository, DEFAULT_STORAGE_KEY,
};

#[test]
fn load_without_stored_key_is_empty() {
    let repo = KeyValueTaskRepository::new(MemoryKeyValueStore::new());
    assert!(repo.load().is_empty());
}

#[test]
fn save_writes_json_array_under_default_key() {
    let repo = KeyValueTaskRepository::new(MemoryKeyValueStore::new());
    let tasks = sample_tasks();

    assert!(repo.save(&tasks));

    let raw = repo.store().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let value = serde_json::from_str::<serde_json::Value>(&raw).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "write report");
    assert_eq!(records[1]["transcript"], "mention the budget");
    assert_eq!(repo.load(), tasks);
}

#[test]
fn corrupt_text_loads_as_empty() {
    let store = MemoryKeyValueStore::new();
    store.set(DEFAULT_STORAGE_KEY, "{not json").unwrap();
    let repo = KeyValueTaskRepository::new(store);

    assert!(repo.load().is_empty());
}

#[test]
fn non_array_document_loads_as_empty() {
    let store = MemoryKeyValueStore::new();
    store.set(DEFAULT_STORAGE_KEY, r#"{"id":"x"}"#).unwrap();
    let repo = KeyValueTaskRepository::new(store);

    assert!(repo.load().is_empty());
}

#[test]
fn undecodable_records_are_skipped_in_order() {
    let good = sample_tasks();
    let mut records = good.iter().map(Task::to_record).collect::<Vec<_>>();
    records.insert(1, serde_json::json!({ "id": "broken", "title": 42 }));

    let store = MemoryKeyValueStore::new();
    store
        .set(
            DEFAULT_STORAGE_KEY,
            &serde_json::to_string(&records).unwrap(),
        )
        .unwrap();
    let repo = KeyValueTaskRepository::new(store);

    assert_eq!(repo.load(), good);
}

#[test]
fn save_over_quota_returns_false_and_keeps_previous_value() {
    let repo = KeyValueTaskRepository::new(MemoryKeyValueStore::with_quota(512));
    let first = vec![Task::new("small")];
    assert!(repo.save(&first));

    let many = (0..20)
        .map(|index| Task::new(format!("task number {index}")))
        .collect::<Vec<_>>();
    assert!(!repo.save(&many));
    assert_eq!(repo.load(), first);
}

#[test]
fn clear_removes_key_and_is_repeatable() {
    let repo = KeyValueTaskRepository::new(MemoryKeyValueStore::new());
    assert!(repo.save(&sample_tasks()));

    assert!(repo.clear());
    assert!(repo.clear());
    assert!(repo.load().is_empty());
    assert!(repo.store().is_empty());
}

#[test]
fn custom_key_isolates_collections() {
    let store = MemoryKeyValueStore::new();
    store.set("other-list", "[]").unwrap();
    let repo = KeyValueTaskRepository::with_key(store, "work-v1");

    assert!(repo.save(&sample_tasks()));
    assert_eq!(repo.key(), "work-v1");
    assert_eq!(repo.store().len(), 2);
}

#[test]
fn invalid_key_makes_save_fail() {
    let repo = KeyValueTaskRepository::with_key(MemoryKeyValueStore::new(), "../escape");
    assert!(!repo.save(&sample_tasks()));
    assert!(repo.load().is_empty());
}

#[test]
fn file_store_roundtrips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    let tasks = sample_tasks();

    {
        let repo = KeyValueTaskRepository::new(FileKeyValueStore::open(&root).unwrap());
        assert!(repo.save(&tasks));
    }

    assert!(root.join("todos-v1.json").is_file());
    let reopened = KeyValueTaskRepository::new(FileKeyValueStore::open(&root).unwrap());
    assert_eq!(reopened.load(), tasks);
}

#[test]
fn file_store_remove_missing_key_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValueStore::open(dir.path()).unwrap();

    store.remove("never-written").unwrap();
    assert_eq!(store.get("never-written").unwrap(), None);
}

#[test]
fn file_store_rejects_traversal_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValueStore::open(dir.path()).unwrap();

    let err = store.set("../outside", "x").unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey(key) if key == "../outside"));
}

#[test]
fn sqlite_store_roundtrips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.sqlite3");
    let tasks = sample_tasks();

    {
        let repo = KeyValueTaskRepository::new(SqliteKeyValueStore::open(&path).unwrap());
        assert!(repo.save(&tasks));
        assert!(repo.save(&tasks[..1]));
    }

    let reopened = KeyValueTaskRepository::new(SqliteKeyValueStore::open(&path).unwrap());
    assert_eq!(reopened.load(), tasks[..1].to_vec());
    let rows: i64 = reopened
        .store()
        .connection()
        .query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn sqlite_store_remove_deletes_row() {
    let store = SqliteKeyValueStore::open_in_memory().unwrap();
    store.set("k", "v").unwrap();

    store.remove("k").unwrap();
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
}

fn sample_tasks() -> Vec<Task> {
    let mut report = Task::new("write report");
    report.toggle_completed();
    let mut budget = Task::new("budget review");
    budget.attach_transcript("mention the budget");
    vec![report, budget]
}
