//! Plain persisted representation of the catalog.
//!
//! # Responsibility
//! - Define the flat JSON records written under the catalog storage key.
//! - Convert between records and domain entities.
//!
//! # Invariants
//! - Field names are camelCase on the wire (`dueDate`, `currentProjectId`).
//! - Due dates are written as RFC 3339 UTC text with millisecond precision.
//! - Persisted ids are reused verbatim; they are never regenerated on load.
//! - A malformed project or todo entry is skipped on decode; only a blob that
//!   is not a catalog object at all fails to decode.

use crate::model::ids::{ProjectId, TodoId};
use crate::model::project::Project;
use crate::model::todo::{
    format_due_date, ChecklistItem, NewTodo, Priority, Todo, TodoValidationError,
};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Whole-catalog record stored as one JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(deserialize_with = "skip_malformed_projects")]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub current_project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "skip_malformed_todos")]
    pub todos: Vec<TodoRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub due_date: String,
    pub priority: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub checklist: Vec<ChecklistRecord>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistRecord {
    pub item: String,
    #[serde(default)]
    pub completed: bool,
}

fn skip_malformed_projects<'de, D>(deserializer: D) -> Result<Vec<ProjectRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer).map(|entries| decode_each(entries, "project"))
}

fn skip_malformed_todos<'de, D>(deserializer: D) -> Result<Vec<TodoRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer)
        .map(|entries| decode_each(entries.unwrap_or_default(), "todo"))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decodes entries one by one, dropping those that do not fit `T`.
///
/// Only the entry id is logged; field values may hold user text.
fn decode_each<T: DeserializeOwned>(entries: Vec<Value>, kind: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing>")
                .to_string();
            match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(_) => {
                    warn!("event=record_decode module=snapshot status=skipped kind={kind} id={id}");
                    None
                }
            }
        })
        .collect()
}

pub fn todo_to_record(todo: &Todo) -> TodoRecord {
    TodoRecord {
        id: todo.id().to_string(),
        title: todo.title().to_string(),
        description: todo.description().to_string(),
        due_date: format_due_date(&todo.due_date()),
        priority: todo.priority().as_str().to_string(),
        notes: todo.notes().to_string(),
        checklist: todo
            .checklist()
            .iter()
            .map(|entry| ChecklistRecord {
                item: entry.item.clone(),
                completed: entry.completed,
            })
            .collect(),
        completed: todo.is_completed(),
    }
}

/// Rebuilds a todo from its record, trusting the persisted id.
///
/// # Errors
/// - Returns the same validation errors as `Todo::new` for bad title, due
///   date or priority.
pub fn todo_from_record(record: TodoRecord) -> Result<Todo, TodoValidationError> {
    let priority = record.priority.parse::<Priority>()?;
    let checklist = record
        .checklist
        .into_iter()
        .map(|entry| ChecklistItem {
            item: entry.item,
            completed: entry.completed,
        })
        .collect();
    let draft = NewTodo::new(record.title, record.due_date, priority)
        .with_description(record.description)
        .with_notes(record.notes)
        .with_checklist(checklist);

    let mut todo = Todo::with_id(TodoId::from_persisted(record.id), draft)?;
    todo.set_completed(record.completed);
    Ok(todo)
}

pub fn project_to_record(project: &Project) -> ProjectRecord {
    ProjectRecord {
        id: project.id().to_string(),
        name: project.name().to_string(),
        todos: project.todos().iter().map(todo_to_record).collect(),
    }
}

/// Rebuilds a project and its todos from a record.
///
/// Todo records that fail validation are dropped with a warning so one bad
/// entry does not discard the rest of the project.
pub fn project_from_record(record: ProjectRecord) -> Project {
    let mut project = Project::with_id(ProjectId::from_persisted(record.id), record.name);
    for todo_record in record.todos {
        let todo_id = todo_record.id.clone();
        match todo_from_record(todo_record) {
            Ok(todo) => {
                project.add_todo(todo);
            }
            Err(err) => warn!(
                "event=todo_rehydrate module=snapshot status=skipped project_id={} todo_id={} error={}",
                project.id(),
                todo_id,
                err
            ),
        }
    }
    project
}

/// Builds the catalog record for the given store state.
pub fn catalog_to_record(projects: &[Project], current: Option<&ProjectId>) -> CatalogRecord {
    CatalogRecord {
        projects: projects.iter().map(project_to_record).collect(),
        current_project_id: current.map(ToString::to_string),
    }
}

/// Encodes store state into the persisted JSON blob.
pub fn encode_catalog(
    projects: &[Project],
    current: Option<&ProjectId>,
) -> serde_json::Result<String> {
    serde_json::to_string(&catalog_to_record(projects, current))
}

/// Decodes the persisted JSON blob into a catalog record.
pub fn decode_catalog(blob: &str) -> serde_json::Result<CatalogRecord> {
    serde_json::from_str(blob)
}
