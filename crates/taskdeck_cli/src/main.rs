//! Command-line entry point.
//!
//! # Responsibility
//! - Construct the store once, drive one store operation, then close it.
//! - Report every store failure on stderr with a non-zero exit code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdeck_core::{
    format_due_date, init_logging_from_config, load_theme, open_store, reset_theme, save_theme,
    CoreConfig, NewTodo, Priority, Project, ProjectId, SqliteKeyValueStore, Theme, TodoId,
    TodoPatch, TodoStore,
};

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Projects and todos in a local store")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List projects; the current one is marked with `*`.
    Projects,
    AddProject {
        name: String,
    },
    RenameProject {
        id: String,
        name: String,
    },
    DeleteProject {
        id: String,
    },
    /// Make a project current.
    Use {
        id: String,
    },
    /// List todos of a project (current project by default).
    Todos {
        #[arg(long)]
        project: Option<String>,
    },
    AddTodo {
        title: String,
        /// RFC 3339 timestamp or YYYY-MM-DD.
        #[arg(long)]
        due: String,
        #[arg(long, default_value = "low", value_parser = parse_priority)]
        priority: Priority,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Mark a todo as completed (or open again with `--undo`).
    Done {
        todo: String,
        #[arg(long)]
        undo: bool,
        #[arg(long)]
        project: Option<String>,
    },
    RemoveTodo {
        todo: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Show the theme, set it to `light`/`dark`, or `--reset` it.
    Theme {
        value: Option<String>,
        #[arg(long, conflicts_with = "value")]
        reset: bool,
    },
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    value.parse::<Priority>().map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(CoreConfig::default_path);
    let config = CoreConfig::load(&config_path)?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let mut store = open_store(&config)
        .with_context(|| format!("failed to open store at {}", config.data_path.display()))?;
    let outcome = run(&mut store, cli.command);
    if let Err(err) = &outcome {
        log::warn!("event=cli_command module=cli status=error error={err}");
    }
    store.close();
    outcome
}

fn run(store: &mut TodoStore<SqliteKeyValueStore>, command: Command) -> Result<()> {
    match command {
        Command::Projects => {
            let current = store.current_project_id().cloned();
            for project in store.projects() {
                let marker = if Some(project.id()) == current.as_ref() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {}  {} ({} todos)",
                    project.id(),
                    project.name(),
                    project.todo_count()
                );
            }
        }
        Command::AddProject { name } => {
            let project = store.add_project(&name)?;
            println!("created project {} ({})", project.name(), project.id());
        }
        Command::RenameProject { id, name } => {
            store.rename_project(&ProjectId::from_persisted(id), &name)?;
            println!("renamed project to {name}");
        }
        Command::DeleteProject { id } => {
            let removed = store.delete_project(&ProjectId::from_persisted(id))?;
            println!("deleted project {}", removed.name());
        }
        Command::Use { id } => {
            store.set_current_project(&ProjectId::from_persisted(id))?;
        }
        Command::Todos { project } => {
            let project_id = resolve_project(store, project)?;
            let project = store
                .get_project_by_id(&project_id)
                .with_context(|| format!("project not found: {project_id}"))?;
            print_todos(project);
        }
        Command::AddTodo {
            title,
            due,
            priority,
            description,
            notes,
            project,
        } => {
            let project_id = resolve_project(store, project)?;
            let draft = NewTodo::new(title, due, priority)
                .with_description(description)
                .with_notes(notes);
            let todo = store.add_todo_to_project(&project_id, draft)?;
            println!("created todo {}", todo.id());
        }
        Command::Done {
            todo,
            undo,
            project,
        } => {
            let project_id = resolve_project(store, project)?;
            let patch = TodoPatch {
                completed: Some(!undo),
                ..TodoPatch::default()
            };
            store.update_todo_in_project(&project_id, &TodoId::from_persisted(todo), patch)?;
        }
        Command::RemoveTodo { todo, project } => {
            let project_id = resolve_project(store, project)?;
            let removed =
                store.delete_todo_from_project(&project_id, &TodoId::from_persisted(todo))?;
            println!("removed todo {}", removed.title());
        }
        Command::Theme { value, reset } => {
            let backend = store.backend_mut();
            if reset {
                reset_theme(backend)?;
                println!("theme reset to {}", load_theme(&*backend));
                return Ok(());
            }
            match value {
                Some(raw) => {
                    let theme = Theme::parse(&raw)
                        .with_context(|| format!("unknown theme `{raw}`; expected light|dark"))?;
                    save_theme(backend, theme)?;
                    println!("theme set to {theme}");
                }
                None => println!("{}", load_theme(&*backend)),
            }
        }
    }
    Ok(())
}

fn resolve_project(
    store: &TodoStore<SqliteKeyValueStore>,
    explicit: Option<String>,
) -> Result<ProjectId> {
    match explicit {
        Some(id) => Ok(ProjectId::from_persisted(id)),
        None => store
            .current_project_id()
            .cloned()
            .context("no current project"),
    }
}

fn print_todos(project: &Project) {
    println!("{}", project.name());
    for todo in project.todos() {
        let done = if todo.is_completed() { "x" } else { " " };
        println!(
            "[{done}] {}  {}  due {}  {}",
            todo.id(),
            todo.title(),
            format_due_date(&todo.due_date()),
            todo.priority()
        );
        for entry in todo.checklist() {
            let mark = if entry.completed { "x" } else { " " };
            println!("      [{mark}] {}", entry.item);
        }
    }
}
