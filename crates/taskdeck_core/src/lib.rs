//! Core domain logic for TaskDeck.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::ids::{ProjectId, TodoId};
pub use model::project::Project;
pub use model::todo::{
    format_due_date, parse_due_date, ChecklistItem, DueDateInput, NewTodo, Priority, Todo,
    TodoValidationError,
};
pub use repo::kv_repo::{
    KeyValueStore, MemoryKeyValueStore, RepoError, RepoResult, SqliteKeyValueStore,
};
pub use service::preferences::{load_theme, reset_theme, save_theme, Theme, THEME_STORAGE_KEY};
pub use service::todo_store::{
    StoreError, StoreResult, TodoPatch, TodoStore, CATALOG_STORAGE_KEY, DEFAULT_PROJECT_NAME,
};

/// Opens the SQLite-backed store described by `config`.
///
/// # Errors
/// - Returns a repository error when the database cannot be opened or
///   migrated. Catalog content problems never fail here; they fall back to a
///   fresh default catalog.
pub fn open_store(config: &CoreConfig) -> RepoResult<TodoStore<SqliteKeyValueStore>> {
    let conn = db::open_db(&config.data_path)?;
    let backend = SqliteKeyValueStore::try_new(conn)?;
    Ok(TodoStore::open(backend))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_store, CoreConfig, DEFAULT_PROJECT_NAME};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn open_store_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            data_path: dir.path().join("nested").join("catalog.sqlite3"),
            ..CoreConfig::default()
        };

        let store = open_store(&config).unwrap();
        assert_eq!(
            store.current_project().map(|project| project.name()),
            Some(DEFAULT_PROJECT_NAME)
        );
        assert!(config.data_path.exists());
    }
}
