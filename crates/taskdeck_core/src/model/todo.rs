//! Todo domain model.
//!
//! # Responsibility
//! - Define the task record owned by a project, including its checklist.
//! - Resolve due-date input into a concrete UTC timestamp.
//!
//! # Invariants
//! - `title` is never empty or whitespace-only.
//! - `due_date` is always a resolved timestamp; unparseable text is rejected
//!   before any field changes.
//! - `due_date` keeps millisecond precision and a four-digit UTC year, so its
//!   formatted text always parses back to the same instant.
//! - Checklist entries are addressed by position and keep insertion order.

use crate::model::ids::TodoId;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const NAIVE_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
/// Years that RFC 3339 can carry as four digits.
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Validation failure for todo fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// Due-date text could not be resolved to a timestamp.
    InvalidDueDate(String),
    /// Priority text is not one of `low|medium|high`.
    InvalidPriority(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "todo title cannot be empty"),
            Self::InvalidDueDate(value) => write!(f, "invalid due date `{value}`"),
            Self::InvalidPriority(value) => {
                write!(f, "invalid priority `{value}`; expected low|medium|high")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Closed priority scale for todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Returns the lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = TodoValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TodoValidationError::InvalidPriority(value.to_string())),
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One checklist line inside a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub item: String,
    pub completed: bool,
}

impl ChecklistItem {
    /// Creates an open (not completed) checklist line.
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            completed: false,
        }
    }
}

/// Due-date input accepted by constructors and setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueDateInput {
    /// Already-resolved timestamp.
    At(DateTime<Utc>),
    /// Text that still has to be parsed.
    Text(String),
}

impl DueDateInput {
    /// Resolves the input into a UTC timestamp truncated to milliseconds.
    ///
    /// # Errors
    /// - Returns `InvalidDueDate` when text input is not a supported format.
    /// - Returns `InvalidDueDate` when the UTC year falls outside 0000-9999,
    ///   since such a value could not be read back after formatting.
    pub fn resolve(self) -> Result<DateTime<Utc>, TodoValidationError> {
        let value = match self {
            Self::At(value) => value,
            Self::Text(text) => parse_due_date(&text)?,
        };
        if !SUPPORTED_YEARS.contains(&value.year()) {
            return Err(TodoValidationError::InvalidDueDate(format_due_date(&value)));
        }
        Ok(value.trunc_subsecs(3))
    }
}

impl From<DateTime<Utc>> for DueDateInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::At(value)
    }
}

impl From<&str> for DueDateInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DueDateInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Parses due-date text into a UTC timestamp.
///
/// Accepted shapes, tried in order:
/// - RFC 3339 with any offset (normalized to UTC).
/// - `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DDTHH:MM`, read as UTC.
/// - `YYYY-MM-DD`, read as midnight UTC.
pub fn parse_due_date(text: &str) -> Result<DateTime<Utc>, TodoValidationError> {
    let trimmed = text.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(value.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(value.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, DATE_ONLY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|value| value.and_utc())
        .ok_or_else(|| TodoValidationError::InvalidDueDate(text.to_string()))
}

/// Formats a due date as RFC 3339 with millisecond precision and `Z` suffix.
pub fn format_due_date(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Input for creating a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub due_date: DueDateInput,
    pub priority: Priority,
    pub notes: String,
    pub checklist: Vec<ChecklistItem>,
}

impl NewTodo {
    /// Creates input with empty description, notes and checklist.
    pub fn new(
        title: impl Into<String>,
        due_date: impl Into<DueDateInput>,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date: due_date.into(),
            priority,
            notes: String::new(),
            checklist: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_checklist(mut self, checklist: Vec<ChecklistItem>) -> Self {
        self.checklist = checklist;
        self
    }
}

/// A single task owned by a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id: TodoId,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    priority: Priority,
    notes: String,
    checklist: Vec<ChecklistItem>,
    completed: bool,
}

impl Todo {
    /// Creates an open todo with a freshly generated id.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `InvalidDueDate` when due-date text cannot be parsed.
    pub fn new(draft: NewTodo) -> Result<Self, TodoValidationError> {
        Self::with_id(TodoId::generate(), draft)
    }

    /// Creates an open todo with a caller-provided id.
    ///
    /// Used by rehydration, where identity already exists in storage.
    pub fn with_id(id: TodoId, draft: NewTodo) -> Result<Self, TodoValidationError> {
        validate_title(&draft.title)?;
        let due_date = draft.due_date.resolve()?;
        Ok(Self {
            id,
            title: draft.title,
            description: draft.description,
            due_date,
            priority: draft.priority,
            notes: draft.notes,
            checklist: draft.checklist,
            completed: false,
        })
    }

    pub fn id(&self) -> &TodoId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), TodoValidationError> {
        let title = title.into();
        validate_title(&title)?;
        self.title = title;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Replaces the due date, parsing text input first.
    ///
    /// The current value is left untouched when parsing fails.
    pub fn set_due_date(
        &mut self,
        due_date: impl Into<DueDateInput>,
    ) -> Result<(), TodoValidationError> {
        self.due_date = due_date.into().resolve()?;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub fn toggle_complete(&mut self) {
        self.completed = !self.completed;
    }

    /// Appends an open checklist entry.
    pub fn add_checklist_item(&mut self, item: impl Into<String>) {
        self.checklist.push(ChecklistItem::new(item));
    }

    /// Flips the entry at `index`. Returns `false` when out of range.
    pub fn toggle_checklist_item(&mut self, index: usize) -> bool {
        match self.checklist.get_mut(index) {
            Some(entry) => {
                entry.completed = !entry.completed;
                true
            }
            None => false,
        }
    }

    /// Removes the entry at `index`. Returns `None` when out of range.
    pub fn remove_checklist_item(&mut self, index: usize) -> Option<ChecklistItem> {
        if index < self.checklist.len() {
            Some(self.checklist.remove(index))
        } else {
            None
        }
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), TodoValidationError> {
    if title.trim().is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    Ok(())
}
