//! Project domain model.
//!
//! # Responsibility
//! - Own an ordered collection of todos keyed by `TodoId`.
//!
//! # Invariants
//! - No two todos in one project share an id.
//! - Name uniqueness is enforced by the store, not here.

use crate::model::ids::{ProjectId, TodoId};
use crate::model::todo::Todo;
use log::warn;

/// Named group of todos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    id: ProjectId,
    name: String,
    todos: Vec<Todo>,
}

impl Project {
    /// Creates an empty project with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ProjectId::generate(), name)
    }

    /// Creates an empty project with a caller-provided id.
    pub fn with_id(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            todos: Vec::new(),
        }
    }

    pub fn id(&self) -> &ProjectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a todo unless one with the same id is already present.
    ///
    /// Returns `false` (and logs a warning) for duplicates.
    pub fn add_todo(&mut self, todo: Todo) -> bool {
        if self.todos.iter().any(|existing| existing.id() == todo.id()) {
            warn!(
                "event=todo_add module=model status=skipped reason=duplicate_id project_id={} todo_id={}",
                self.id,
                todo.id()
            );
            return false;
        }
        self.todos.push(todo);
        true
    }

    /// Removes and returns the todo with `id`, if present.
    pub fn remove_todo_by_id(&mut self, id: &TodoId) -> Option<Todo> {
        let index = self.todos.iter().position(|todo| todo.id() == id)?;
        Some(self.todos.remove(index))
    }

    pub fn get_todo_by_id(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id() == id)
    }

    pub(crate) fn get_todo_by_id_mut(&mut self, id: &TodoId) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id() == id)
    }

    /// Returns an owned copy of the todos in insertion order.
    pub fn all_todos(&self) -> Vec<Todo> {
        self.todos.clone()
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn todo_count(&self) -> usize {
        self.todos.len()
    }
}
