use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;
use taskdeck_core::db::open_db;
use taskdeck_core::{
    format_due_date, KeyValueStore, MemoryKeyValueStore, NewTodo, Priority, RepoError,
    RepoResult, SqliteKeyValueStore, StoreError, TodoId, TodoPatch, TodoStore,
    CATALOG_STORAGE_KEY, DEFAULT_PROJECT_NAME,
};

/// Backend whose writes can be switched to fail, for quota-style errors.
struct FlakyStore {
    inner: MemoryKeyValueStore,
    fail_writes: Rc<Cell<bool>>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> RepoResult<()> {
        if self.fail_writes.get() {
            return Err(RepoError::Db(taskdeck_core::db::DbError::Sqlite(
                rusqlite::Error::InvalidQuery,
            )));
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> RepoResult<bool> {
        self.inner.remove(key)
    }
}

fn memory_with_blob(blob: Value) -> MemoryKeyValueStore {
    let mut backend = MemoryKeyValueStore::new();
    backend.set(CATALOG_STORAGE_KEY, &blob.to_string()).unwrap();
    backend
}

fn stored_blob(backend: &impl KeyValueStore) -> Value {
    let raw = backend.get(CATALOG_STORAGE_KEY).unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn catalog_survives_close_and_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite3");

    let (work_id, todo_id, due_date) = {
        let backend = SqliteKeyValueStore::try_new(open_db(&path).unwrap()).unwrap();
        let mut store = TodoStore::open(backend);
        let work_id = store.add_project("Work").unwrap().id().clone();
        store.set_current_project(&work_id).unwrap();
        let todo = store
            .add_todo_to_project(
                &work_id,
                NewTodo::new("quarterly report", "2025-03-31T17:30:45.123+02:00", Priority::High)
                    .with_description("numbers + summary")
                    .with_notes("ask finance"),
            )
            .unwrap();
        let (todo_id, due_date) = (todo.id().clone(), todo.due_date());
        store.add_checklist_item(&work_id, &todo_id, "collect data").unwrap();
        store.toggle_checklist_item(&work_id, &todo_id, 0).unwrap();
        store
            .update_todo_in_project(
                &work_id,
                &todo_id,
                TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        store.close();
        (work_id, todo_id, due_date)
    };

    let backend = SqliteKeyValueStore::try_new(open_db(&path).unwrap()).unwrap();
    let store = TodoStore::open(backend);

    assert_eq!(store.projects().len(), 2);
    assert_eq!(store.current_project_id(), Some(&work_id));
    let project = store.get_project_by_id(&work_id).unwrap();
    assert_eq!(project.name(), "Work");
    let todo = project.get_todo_by_id(&todo_id).unwrap();
    assert_eq!(todo.title(), "quarterly report");
    assert_eq!(todo.description(), "numbers + summary");
    assert_eq!(todo.notes(), "ask finance");
    assert_eq!(todo.priority(), Priority::High);
    assert_eq!(todo.due_date(), due_date);
    assert!(todo.is_completed());
    assert_eq!(todo.checklist().len(), 1);
    assert!(todo.checklist()[0].completed);
}

#[test]
fn reopening_preserves_ids_and_order_exactly() {
    let mut store = TodoStore::open(MemoryKeyValueStore::new());
    let inbox = store.add_project("Inbox").unwrap().id().clone();
    for title in ["one", "two", "three"] {
        store
            .add_todo_to_project(&inbox, NewTodo::new(title, "2025-05-05", Priority::Medium))
            .unwrap();
    }
    let before = store.all_projects();
    let current = store.current_project_id().cloned();

    let reopened = TodoStore::open(store.close());

    assert_eq!(reopened.all_projects(), before);
    assert_eq!(reopened.current_project_id().cloned(), current);
}

#[test]
fn every_mutation_writes_the_whole_catalog() {
    let mut store = TodoStore::open(MemoryKeyValueStore::new());
    let garden = store.add_project("Garden").unwrap().id().clone();
    let blob = stored_blob(store.backend());
    assert_eq!(blob["projects"].as_array().unwrap().len(), 2);

    store
        .add_todo_to_project(&garden, NewTodo::new("water", "2025-01-01", Priority::Low))
        .unwrap();
    let blob = stored_blob(store.backend());
    assert_eq!(blob["projects"][1]["name"], "Garden");
    assert_eq!(blob["projects"][1]["todos"][0]["title"], "water");
    assert_eq!(
        blob["projects"][1]["todos"][0]["dueDate"],
        "2025-01-01T00:00:00.000Z"
    );

    store.set_current_project(&garden).unwrap();
    let blob = stored_blob(store.backend());
    assert_eq!(blob["currentProjectId"], garden.as_str());
}

#[test]
fn failed_operations_do_not_write() {
    let mut store = TodoStore::open(MemoryKeyValueStore::new());
    store.add_project("Work").unwrap();
    let before = store.backend().get(CATALOG_STORAGE_KEY).unwrap();

    assert!(store.add_project("Work").is_err());
    assert_eq!(store.backend().get(CATALOG_STORAGE_KEY).unwrap(), before);
}

#[test]
fn corrupt_blob_falls_back_to_fresh_default_catalog() {
    let mut backend = MemoryKeyValueStore::new();
    backend.set(CATALOG_STORAGE_KEY, "{\"projects\": [tr").unwrap();

    let store = TodoStore::open(backend);

    assert_eq!(store.projects().len(), 1);
    assert_eq!(store.current_project().unwrap().name(), DEFAULT_PROJECT_NAME);
    let blob = stored_blob(store.backend());
    assert_eq!(blob["projects"][0]["name"], DEFAULT_PROJECT_NAME);
}

#[test]
fn empty_project_list_bootstraps_default() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [],
        "currentProjectId": "stale"
    })));

    assert_eq!(store.projects().len(), 1);
    assert_eq!(store.current_project().unwrap().name(), DEFAULT_PROJECT_NAME);
}

#[test]
fn dangling_current_id_falls_back_to_first_project() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [
            { "id": "p-work", "name": "Work", "todos": [] },
            { "id": "p-default", "name": "Default", "todos": [] }
        ],
        "currentProjectId": "p-deleted"
    })));

    assert_eq!(store.current_project_id().unwrap().as_str(), "p-work");
    assert_eq!(stored_blob(store.backend())["currentProjectId"], "p-work");
}

#[test]
fn missing_default_project_is_restored_without_changing_current() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [
            { "id": "p-a", "name": "A", "todos": [] },
            { "id": "p-b", "name": "B", "todos": [] }
        ],
        "currentProjectId": "p-b"
    })));

    assert_eq!(store.projects().len(), 3);
    assert_eq!(store.projects()[2].name(), DEFAULT_PROJECT_NAME);
    assert_eq!(store.current_project_id().unwrap().as_str(), "p-b");
}

#[test]
fn duplicate_projects_and_todos_are_dropped_on_load() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [
            {
                "id": "p-1",
                "name": "Default",
                "todos": [
                    { "id": "t-1", "title": "first", "dueDate": "2025-01-01T00:00:00.000Z", "priority": "low" },
                    { "id": "t-1", "title": "again", "dueDate": "2025-01-01T00:00:00.000Z", "priority": "low" }
                ]
            },
            { "id": "p-1", "name": "Shadow", "todos": [] },
            { "id": "p-2", "name": "Default", "todos": [] }
        ],
        "currentProjectId": "p-1"
    })));

    assert_eq!(store.projects().len(), 1);
    let project = store.current_project().unwrap();
    assert_eq!(project.todo_count(), 1);
    assert_eq!(project.todos()[0].title(), "first");
}

#[test]
fn malformed_todo_is_dropped_without_losing_its_project() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [
            {
                "id": "p-work",
                "name": "Work",
                "todos": [
                    { "id": "t-ok", "title": "report", "dueDate": "2025-01-01T00:00:00.000Z", "priority": "high" },
                    { "id": "t-null", "title": "broken", "dueDate": null, "priority": "low" }
                ]
            },
            { "id": "p-default", "name": "Default", "todos": [] }
        ],
        "currentProjectId": "p-work"
    })));

    let names: Vec<_> = store.projects().iter().map(|p| p.name()).collect();
    assert_eq!(names, ["Work", "Default"]);
    let work = store.current_project().unwrap();
    assert_eq!(work.id().as_str(), "p-work");
    assert_eq!(work.todo_count(), 1);
    assert_eq!(work.todos()[0].id().as_str(), "t-ok");

    let blob = stored_blob(store.backend());
    assert_eq!(blob["projects"][0]["todos"].as_array().unwrap().len(), 1);
}

#[test]
fn out_of_range_due_date_is_rejected_before_it_is_persisted() {
    let mut store = TodoStore::open(MemoryKeyValueStore::new());
    let project_id = store.current_project_id().cloned().unwrap();
    let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    assert!(store
        .add_todo_to_project(&project_id, NewTodo::new("someday", far_future, Priority::Low))
        .is_err());

    let reopened = TodoStore::open(store.close());
    assert_eq!(reopened.current_project().unwrap().todo_count(), 0);
}

#[test]
fn empty_patch_leaves_stored_blob_untouched() {
    let mut store = TodoStore::open(MemoryKeyValueStore::new());
    let project_id = store.current_project_id().cloned().unwrap();
    let todo_id = store
        .add_todo_to_project(&project_id, NewTodo::new("read", "2025-01-01", Priority::Low))
        .unwrap()
        .id()
        .clone();
    store.backend_mut().remove(CATALOG_STORAGE_KEY).unwrap();

    store
        .update_todo_in_project(&project_id, &todo_id, TodoPatch::default())
        .unwrap();
    assert_eq!(store.backend().get(CATALOG_STORAGE_KEY).unwrap(), None);

    let err = store
        .update_todo_in_project(&project_id, &TodoId::from("missing"), TodoPatch::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::TodoNotFound { .. }));
}

#[test]
fn legacy_blob_with_sparse_fields_loads() {
    let store = TodoStore::open(memory_with_blob(json!({
        "projects": [{
            "id": "3f1c7c1e-1111-4a4a-9b9b-222222222222",
            "name": "Default",
            "todos": [{
                "id": "a1",
                "title": "Call plumber",
                "description": "",
                "dueDate": "2024-11-05T00:00:00.000Z",
                "priority": "medium",
                "completed": false
            }]
        }],
        "currentProjectId": "3f1c7c1e-1111-4a4a-9b9b-222222222222"
    })));

    let todo = &store.current_project().unwrap().todos()[0];
    assert_eq!(todo.id().as_str(), "a1");
    assert!(todo.checklist().is_empty());
    assert_eq!(format_due_date(&todo.due_date()), "2024-11-05T00:00:00.000Z");
}

#[test]
fn write_failures_are_counted_but_keep_in_memory_state() {
    let fail_writes = Rc::new(Cell::new(false));
    let mut store = TodoStore::open(FlakyStore {
        inner: MemoryKeyValueStore::new(),
        fail_writes: Rc::clone(&fail_writes),
    });
    assert_eq!(store.save_failures(), 0);

    fail_writes.set(true);
    let project_id = store.add_project("Offline").unwrap().id().clone();

    assert_eq!(store.save_failures(), 1);
    assert!(store.get_project_by_id(&project_id).is_some());
    let persisted = stored_blob(store.backend());
    assert_eq!(persisted["projects"].as_array().unwrap().len(), 1);

    fail_writes.set(false);
    store.set_current_project(&project_id).unwrap();
    let persisted = stored_blob(store.backend());
    assert_eq!(persisted["projects"].as_array().unwrap().len(), 2);
    assert_eq!(store.save_failures(), 1);
}
