//! Catalog store: project/todo use-cases plus persistence.
//!
//! # Responsibility
//! - Own the in-memory catalog (projects and the current-project pointer).
//! - Mediate every create/read/update/delete on projects and todos.
//! - Write the whole catalog to the key-value backend after each mutation.
//!
//! # Invariants
//! - After `open` and after every successful operation:
//!   - a project named `"Default"` exists and cannot be deleted or renamed;
//!   - when projects exist, `current_project_id` references one of them;
//!   - project ids and names are unique, todo ids are unique per project.
//! - Failed operations leave memory and storage untouched.
//! - Persistence write failures are logged, never returned, never rolled back.

use crate::model::ids::{ProjectId, TodoId};
use crate::model::project::Project;
use crate::model::todo::{
    validate_title, ChecklistItem, DueDateInput, NewTodo, Priority, Todo, TodoValidationError,
};
use crate::repo::kv_repo::KeyValueStore;
use crate::snapshot::{decode_catalog, encode_catalog, project_from_record, CatalogRecord};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key holding the encoded catalog blob.
pub const CATALOG_STORAGE_KEY: &str = "todoAppData";
/// Name of the fallback project that always exists.
pub const DEFAULT_PROJECT_NAME: &str = "Default";

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure returned by store operations. No variant leaves partial changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    ProjectNotFound(ProjectId),
    TodoNotFound {
        project_id: ProjectId,
        todo_id: TodoId,
    },
    /// Another project already uses this exact name.
    DuplicateProjectName(String),
    /// Project names cannot be empty or whitespace-only.
    InvalidProjectName,
    /// The `"Default"` project cannot be deleted or renamed.
    DefaultProjectProtected,
    ChecklistIndexOutOfRange {
        index: usize,
        len: usize,
    },
    Validation(TodoValidationError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::TodoNotFound {
                project_id,
                todo_id,
            } => write!(f, "todo {todo_id} not found in project {project_id}"),
            Self::DuplicateProjectName(name) => {
                write!(f, "a project named `{name}` already exists")
            }
            Self::InvalidProjectName => write!(f, "project name cannot be empty"),
            Self::DefaultProjectProtected => write!(
                f,
                "the `{DEFAULT_PROJECT_NAME}` project cannot be deleted or renamed"
            ),
            Self::ChecklistIndexOutOfRange { index, len } => write!(
                f,
                "checklist index {index} is out of range for {len} item(s)"
            ),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for StoreError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Partial update for one todo. `None` fields are left unchanged.
///
/// `completed` sets the flag to the given value; it does not toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DueDateInput>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
            && self.completed.is_none()
    }
}

/// Project/todo catalog persisted through a key-value backend.
///
/// Construct once with [`TodoStore::open`] and release with
/// [`TodoStore::close`].
pub struct TodoStore<S: KeyValueStore> {
    backend: S,
    projects: Vec<Project>,
    current_project_id: Option<ProjectId>,
    save_failures: u64,
}

impl<S: KeyValueStore> TodoStore<S> {
    /// Loads the persisted catalog (or bootstraps a fresh one) from `backend`.
    ///
    /// Never fails: unreadable or corrupt data is discarded and replaced by a
    /// catalog holding only the `"Default"` project.
    pub fn open(backend: S) -> Self {
        let mut store = Self {
            backend,
            projects: Vec::new(),
            current_project_id: None,
            save_failures: 0,
        };
        store.load_data();
        store
    }

    /// Writes the catalog one last time and returns the backend.
    pub fn close(mut self) -> S {
        self.save();
        info!(
            "event=store_close module=store status=ok projects={} save_failures={}",
            self.projects.len(),
            self.save_failures
        );
        self.backend
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Direct backend access for values stored next to the catalog (such as
    /// preferences). Writing `CATALOG_STORAGE_KEY` through it is overwritten
    /// by the next store mutation.
    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Number of catalog writes that failed since `open`.
    pub fn save_failures(&self) -> u64 {
        self.save_failures
    }

    /// Creates the `"Default"` project and makes it current, unless it exists.
    pub fn create_default_project(&mut self) {
        if self.project_by_name(DEFAULT_PROJECT_NAME).is_some() {
            return;
        }
        let project = Project::new(DEFAULT_PROJECT_NAME);
        info!(
            "event=default_project_create module=store status=ok project_id={}",
            project.id()
        );
        self.current_project_id = Some(project.id().clone());
        self.projects.push(project);
        self.save();
    }

    /// Creates a project. The current project is not changed.
    ///
    /// # Errors
    /// - `InvalidProjectName` for blank names.
    /// - `DuplicateProjectName` when the name is taken.
    pub fn add_project(&mut self, name: &str) -> StoreResult<&Project> {
        validate_project_name(name)?;
        if self.project_by_name(name).is_some() {
            warn!("event=project_add module=store status=rejected reason=duplicate_name");
            return Err(StoreError::DuplicateProjectName(name.to_string()));
        }

        let project = Project::new(name);
        info!(
            "event=project_add module=store status=ok project_id={}",
            project.id()
        );
        let index = self.projects.len();
        self.projects.push(project);
        self.save();
        Ok(&self.projects[index])
    }

    /// Removes a project and returns it.
    ///
    /// When the removed project was current, the first remaining project
    /// becomes current; if none remain the default project is bootstrapped.
    ///
    /// # Errors
    /// - `ProjectNotFound` for unknown ids.
    /// - `DefaultProjectProtected` for the `"Default"` project.
    pub fn delete_project(&mut self, id: &ProjectId) -> StoreResult<Project> {
        let index = self.project_index(id)?;
        if self.projects[index].name() == DEFAULT_PROJECT_NAME {
            warn!(
                "event=project_delete module=store status=rejected reason=default_protected project_id={id}"
            );
            return Err(StoreError::DefaultProjectProtected);
        }

        let removed = self.projects.remove(index);
        if self.current_project_id.as_ref() == Some(id) {
            self.current_project_id = self.projects.first().map(|project| project.id().clone());
        }
        info!(
            "event=project_delete module=store status=ok project_id={} todos={}",
            id,
            removed.todo_count()
        );
        if self.projects.is_empty() {
            self.create_default_project();
        } else {
            self.save();
        }
        Ok(removed)
    }

    /// Renames a project. Renaming to its current name succeeds.
    ///
    /// # Errors
    /// - `ProjectNotFound`, `InvalidProjectName`, `DefaultProjectProtected`,
    ///   or `DuplicateProjectName` when another project holds `new_name`.
    pub fn rename_project(&mut self, id: &ProjectId, new_name: &str) -> StoreResult<()> {
        let index = self.project_index(id)?;
        validate_project_name(new_name)?;
        if self.projects[index].name() == DEFAULT_PROJECT_NAME && new_name != DEFAULT_PROJECT_NAME
        {
            return Err(StoreError::DefaultProjectProtected);
        }
        if self
            .projects
            .iter()
            .any(|project| project.name() == new_name && project.id() != id)
        {
            warn!(
                "event=project_rename module=store status=rejected reason=duplicate_name project_id={id}"
            );
            return Err(StoreError::DuplicateProjectName(new_name.to_string()));
        }

        self.projects[index].set_name(new_name);
        info!("event=project_rename module=store status=ok project_id={id}");
        self.save();
        Ok(())
    }

    /// Makes `id` the current project.
    pub fn set_current_project(&mut self, id: &ProjectId) -> StoreResult<()> {
        self.project_index(id)?;
        self.current_project_id = Some(id.clone());
        debug!("event=project_select module=store status=ok project_id={id}");
        self.save();
        Ok(())
    }

    /// Returns an owned copy of all projects in catalog order.
    pub fn all_projects(&self) -> Vec<Project> {
        self.projects.clone()
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get_project_by_id(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id() == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.name() == name)
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project_id
            .as_ref()
            .and_then(|id| self.get_project_by_id(id))
    }

    pub fn current_project_id(&self) -> Option<&ProjectId> {
        self.current_project_id.as_ref()
    }

    /// Creates a todo inside a project and returns it.
    ///
    /// # Errors
    /// - `ProjectNotFound` for unknown projects.
    /// - `Validation` for blank titles or unparseable due dates.
    pub fn add_todo_to_project(
        &mut self,
        project_id: &ProjectId,
        draft: NewTodo,
    ) -> StoreResult<&Todo> {
        let index = self.project_index(project_id)?;
        let todo = Todo::new(draft)?;
        let todo_id = todo.id().clone();
        self.projects[index].add_todo(todo);
        info!(
            "event=todo_add module=store status=ok project_id={project_id} todo_id={todo_id}"
        );
        self.save();

        self.projects[index]
            .get_todo_by_id(&todo_id)
            .ok_or(StoreError::TodoNotFound {
                project_id: project_id.clone(),
                todo_id,
            })
    }

    /// Removes a todo from a project and returns it.
    pub fn delete_todo_from_project(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
    ) -> StoreResult<Todo> {
        let index = self.project_index(project_id)?;
        let removed = self.projects[index]
            .remove_todo_by_id(todo_id)
            .ok_or_else(|| StoreError::TodoNotFound {
                project_id: project_id.clone(),
                todo_id: todo_id.clone(),
            })?;
        info!(
            "event=todo_delete module=store status=ok project_id={project_id} todo_id={todo_id}"
        );
        self.save();
        Ok(removed)
    }

    /// Applies the fields present in `patch`.
    ///
    /// Every present field is validated before any of them is applied. An
    /// empty patch only checks that the todo exists and writes nothing.
    pub fn update_todo_in_project(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
        patch: TodoPatch,
    ) -> StoreResult<()> {
        if patch.is_empty() {
            let index = self.project_index(project_id)?;
            return self.projects[index]
                .get_todo_by_id(todo_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::TodoNotFound {
                    project_id: project_id.clone(),
                    todo_id: todo_id.clone(),
                });
        }
        self.with_todo_mut(project_id, todo_id, "todo_update", |todo| {
            if let Some(title) = patch.title.as_deref() {
                validate_title(title)?;
            }
            let due_date = patch.due_date.map(DueDateInput::resolve).transpose()?;

            if let Some(title) = patch.title {
                todo.set_title(title)?;
            }
            if let Some(description) = patch.description {
                todo.set_description(description);
            }
            if let Some(due_date) = due_date {
                todo.set_due_date(due_date)?;
            }
            if let Some(priority) = patch.priority {
                todo.set_priority(priority);
            }
            if let Some(notes) = patch.notes {
                todo.set_notes(notes);
            }
            if let Some(completed) = patch.completed {
                todo.set_completed(completed);
            }
            Ok(())
        })
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_todo_complete(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
    ) -> StoreResult<bool> {
        self.with_todo_mut(project_id, todo_id, "todo_toggle", |todo| {
            todo.toggle_complete();
            Ok(todo.is_completed())
        })
    }

    pub fn add_checklist_item(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
        item: &str,
    ) -> StoreResult<()> {
        self.with_todo_mut(project_id, todo_id, "checklist_add", |todo| {
            todo.add_checklist_item(item);
            Ok(())
        })
    }

    /// Flips the checklist entry at `index` and returns its new state.
    pub fn toggle_checklist_item(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
        index: usize,
    ) -> StoreResult<bool> {
        self.with_todo_mut(project_id, todo_id, "checklist_toggle", |todo| {
            let len = todo.checklist().len();
            if !todo.toggle_checklist_item(index) {
                return Err(StoreError::ChecklistIndexOutOfRange { index, len });
            }
            Ok(todo.checklist()[index].completed)
        })
    }

    pub fn remove_checklist_item(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
        index: usize,
    ) -> StoreResult<ChecklistItem> {
        self.with_todo_mut(project_id, todo_id, "checklist_remove", |todo| {
            let len = todo.checklist().len();
            todo.remove_checklist_item(index)
                .ok_or(StoreError::ChecklistIndexOutOfRange { index, len })
        })
    }

    fn with_todo_mut<T>(
        &mut self,
        project_id: &ProjectId,
        todo_id: &TodoId,
        event: &str,
        apply: impl FnOnce(&mut Todo) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let index = self.project_index(project_id)?;
        let todo = self.projects[index]
            .get_todo_by_id_mut(todo_id)
            .ok_or_else(|| StoreError::TodoNotFound {
                project_id: project_id.clone(),
                todo_id: todo_id.clone(),
            })?;
        let output = apply(todo).inspect_err(|err| {
            warn!(
                "event={event} module=store status=rejected project_id={project_id} todo_id={todo_id} error={err}"
            );
        })?;
        info!("event={event} module=store status=ok project_id={project_id} todo_id={todo_id}");
        self.save();
        Ok(output)
    }

    fn project_index(&self, id: &ProjectId) -> StoreResult<usize> {
        self.projects
            .iter()
            .position(|project| project.id() == id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }

    fn load_data(&mut self) {
        self.projects.clear();
        self.current_project_id = None;

        let mut repaired = match self.read_catalog() {
            Some(record) => self.rehydrate(record),
            None => false,
        };

        if self.projects.is_empty() {
            self.create_default_project();
            info!("event=catalog_load module=store status=bootstrapped projects=1");
            return;
        }

        if self.current_project().is_none() {
            self.current_project_id = self.projects.first().map(|project| project.id().clone());
            repaired = true;
        }
        if self.project_by_name(DEFAULT_PROJECT_NAME).is_none() {
            self.projects.push(Project::new(DEFAULT_PROJECT_NAME));
            repaired = true;
        }
        if repaired {
            self.save();
        }
        info!(
            "event=catalog_load module=store status=ok projects={} repaired={}",
            self.projects.len(),
            repaired
        );
    }

    fn read_catalog(&self) -> Option<CatalogRecord> {
        let blob = match self.backend.get(CATALOG_STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("event=catalog_read module=store status=empty");
                return None;
            }
            Err(err) => {
                error!(
                    "event=catalog_read module=store status=error error_code=backend_read_failed error={err}"
                );
                return None;
            }
        };

        match decode_catalog(&blob) {
            Ok(record) => Some(record),
            Err(err) => {
                error!(
                    "event=catalog_read module=store status=error error_code=catalog_corrupt bytes={} error={}",
                    blob.len(),
                    err
                );
                None
            }
        }
    }

    /// Rebuilds entities from `record`. Returns whether anything was dropped.
    fn rehydrate(&mut self, record: CatalogRecord) -> bool {
        let mut repaired = false;
        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();

        for project_record in record.projects {
            if project_record.name.trim().is_empty()
                || seen_ids.contains(&project_record.id)
                || seen_names.contains(&project_record.name)
            {
                warn!(
                    "event=project_rehydrate module=store status=skipped project_id={}",
                    project_record.id
                );
                repaired = true;
                continue;
            }
            seen_ids.insert(project_record.id.clone());
            seen_names.insert(project_record.name.clone());

            let expected_todos = project_record.todos.len();
            let project = project_from_record(project_record);
            repaired |= project.todo_count() != expected_todos;
            self.projects.push(project);
        }

        self.current_project_id = record.current_project_id.map(ProjectId::from_persisted);
        repaired
    }

    fn save(&mut self) {
        let blob = match encode_catalog(&self.projects, self.current_project_id.as_ref()) {
            Ok(blob) => blob,
            Err(err) => {
                self.save_failures += 1;
                error!(
                    "event=catalog_save module=store status=error error_code=encode_failed error={err}"
                );
                return;
            }
        };

        match self.backend.set(CATALOG_STORAGE_KEY, &blob) {
            Ok(()) => debug!(
                "event=catalog_save module=store status=ok projects={} bytes={}",
                self.projects.len(),
                blob.len()
            ),
            Err(err) => {
                self.save_failures += 1;
                error!(
                    "event=catalog_save module=store status=error error_code=backend_write_failed error={err}"
                );
            }
        }
    }
}

fn validate_project_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidProjectName);
    }
    Ok(())
}
