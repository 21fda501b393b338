//! Tasks and the service that mutates them.
//!
//! [`TaskService`] is the entry point for every task mutation. It routes
//! field edits through the [`HistoryLedger`] and, when a recurring task is
//! completed, asks the recurrence engine for the follow-up occurrence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::{FieldRestore, HistoryLedger, HistoryRecord};
use crate::publish::{self, UpcomingTask};
use crate::recurrence::{self, RecurrenceRule, RuleInput, DATE_FORMAT};
use crate::store::{Records, Store};

const DEFAULT_TASK_PRIORITY: &str = "P2";
const TASK_PRIORITIES: [&str; 5] = ["P0", "P1", "P2", "P3", "P4"];

fn default_task_priority() -> String {
    DEFAULT_TASK_PRIORITY.to_string()
}

/// Normalize a priority to `P0`..`P4`.
pub fn normalize_priority(priority: &str) -> Result<String> {
    let trimmed = priority.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("priority cannot be empty".to_string()));
    }

    let normalized = trimmed.to_ascii_uppercase();
    if TASK_PRIORITIES.iter().any(|value| value == &normalized) {
        Ok(normalized)
    } else {
        Err(Error::InvalidArgument(format!(
            "unknown task priority '{trimmed}' (expected P0-P4)"
        )))
    }
}

/// Task attributes tracked by the history ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Title,
    Notes,
    DueDate,
    Priority,
    Category,
    Completed,
}

impl TaskField {
    pub const ALL: [TaskField; 6] = [
        TaskField::Title,
        TaskField::Notes,
        TaskField::DueDate,
        TaskField::Priority,
        TaskField::Category,
        TaskField::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskField::Title => "title",
            TaskField::Notes => "notes",
            TaskField::DueDate => "due_date",
            TaskField::Priority => "priority",
            TaskField::Category => "category",
            TaskField::Completed => "completed",
        }
    }

    /// Re-type a stored text value for this field.
    pub fn parse_value(self, raw: Option<&str>) -> Result<FieldValue> {
        let Some(raw) = raw else {
            return Ok(FieldValue::Empty);
        };
        let corrupt = || Error::CorruptValue {
            field: self.as_str().to_string(),
            value: raw.to_string(),
        };

        match self {
            TaskField::Title | TaskField::Notes | TaskField::Category => {
                Ok(FieldValue::Text(raw.to_string()))
            }
            TaskField::Priority => normalize_priority(raw)
                .map(FieldValue::Text)
                .map_err(|_| corrupt()),
            TaskField::DueDate => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| corrupt()),
            TaskField::Completed => match raw {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(corrupt()),
            },
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskField {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        TaskField::ALL
            .into_iter()
            .find(|field| field.as_str() == raw.trim())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown task field '{}'", raw.trim())))
    }
}

/// Typed value of a tracked field
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    /// Text value, with blank text treated as empty.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(value)
        }
    }

    fn optional_text(value: Option<&String>) -> Self {
        value.map_or(FieldValue::Empty, |value| FieldValue::text(value.clone()))
    }

    /// Storage form; `None` for an empty value.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Empty => None,
            FieldValue::Text(value) => Some(value.clone()),
            FieldValue::Date(date) => Some(date.format(DATE_FORMAT).to_string()),
            FieldValue::Bool(value) => Some(value.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("(empty)"),
        }
    }
}

/// A task as held by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_task_priority")]
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<RecurrenceRule>,
}

impl Task {
    pub fn field_value(&self, field: TaskField) -> FieldValue {
        match field {
            TaskField::Title => FieldValue::Text(self.title.clone()),
            TaskField::Notes => FieldValue::optional_text(self.notes.as_ref()),
            TaskField::DueDate => self.due_date.map_or(FieldValue::Empty, FieldValue::Date),
            TaskField::Priority => FieldValue::Text(self.priority.clone()),
            TaskField::Category => FieldValue::optional_text(self.category.as_ref()),
            TaskField::Completed => FieldValue::Bool(self.completed),
        }
    }
}

fn generate_task_id() -> String {
    Ulid::new().to_string().to_ascii_lowercase()
}

/// Request to create a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub recurring: Option<RuleInput>,
}

/// Partial update; `Some(None)` clears an optional field
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<String>,
    pub category: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.completed.is_none()
    }

    fn changes(&self) -> Result<Vec<(TaskField, FieldValue)>> {
        let mut changes = Vec::new();
        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
            changes.push((TaskField::Title, FieldValue::Text(title.to_string())));
        }
        if let Some(notes) = &self.notes {
            changes.push((TaskField::Notes, FieldValue::optional_text(notes.as_ref())));
        }
        if let Some(due_date) = self.due_date {
            changes.push((TaskField::DueDate, due_date.map_or(FieldValue::Empty, FieldValue::Date)));
        }
        if let Some(priority) = &self.priority {
            changes.push((TaskField::Priority, FieldValue::Text(normalize_priority(priority)?)));
        }
        if let Some(category) = &self.category {
            changes.push((TaskField::Category, FieldValue::optional_text(category.as_ref())));
        }
        if let Some(completed) = self.completed {
            changes.push((TaskField::Completed, FieldValue::Bool(completed)));
        }
        Ok(changes)
    }
}

/// One field edit applied by [`TaskService::update`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldChange {
    pub field: TaskField,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// Result of [`TaskService::update`]
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub task: Task,
    pub changes: Vec<FieldChange>,
    /// Next occurrence created when a recurring task was completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<Task>,
}

/// Task operations over a store, with explicit settings instead of globals
pub struct TaskService<'a, S> {
    store: &'a S,
    max_history: usize,
    upcoming_days: u32,
}

impl<'a, S: Store> TaskService<'a, S> {
    pub fn new(store: &'a S, config: &Config) -> Self {
        Self {
            store,
            max_history: config.history.max_per_task,
            upcoming_days: config.publish.upcoming_days,
        }
    }

    pub fn create(&self, request: NewTask) -> Result<Task> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        let priority = match request.priority.as_deref() {
            Some(value) => normalize_priority(value)?,
            None => default_task_priority(),
        };
        let recurring = request
            .recurring
            .as_ref()
            .map(recurrence::validate)
            .transpose()?;
        let due_date = request
            .due_date
            .or_else(|| recurring.as_ref().and_then(|rule| rule.start_date));

        let now = stored_now();
        let task = Task {
            id: generate_task_id(),
            title: title.to_string(),
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
            due_date,
            priority,
            category: request.category.filter(|category| !category.trim().is_empty()),
            completed: false,
            created_at: now,
            updated_at: now,
            recurring,
        };
        self.store.insert_task(&task)?;
        tracing::debug!(task = %task.id, recurring = task.recurring.is_some(), "task created");
        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> Result<Task> {
        fetch(self.store, task_id)
    }

    pub fn list(&self, include_completed: bool) -> Result<Vec<Task>> {
        self.store.list_tasks(include_completed)
    }

    /// Apply a patch field by field, logging each real change. Completing a
    /// recurring task creates its next occurrence. Nothing is written unless
    /// every step succeeds.
    pub fn update(&self, task_id: &str, patch: &TaskPatch) -> Result<UpdateOutcome> {
        let requested = patch.changes()?;
        let (changes, follow_up) = self.store.transaction(|records| {
            let before = fetch(records, task_id)?;
            let ledger = HistoryLedger::with_limit(records, self.max_history);

            let mut changes = Vec::new();
            for (field, new_value) in requested {
                let old_value = before.field_value(field);
                if old_value == new_value {
                    continue;
                }
                records.write_task_field(task_id, field, new_value.to_text().as_deref())?;
                ledger.record(task_id, field, &old_value, &new_value)?;
                changes.push(FieldChange {
                    field,
                    old_value,
                    new_value,
                });
            }

            let completed_now = !before.completed && patch.completed == Some(true);
            let follow_up = match before.recurring {
                Some(rule) if completed_now => spawn_follow_up(records, task_id, rule)?,
                _ => None,
            };
            Ok((changes, follow_up))
        })?;

        if let Some(next) = &follow_up {
            tracing::debug!(task = task_id, next = %next.id, "next occurrence created");
        }
        Ok(UpdateOutcome {
            task: self.get(task_id)?,
            changes,
            follow_up,
        })
    }

    pub fn complete(&self, task_id: &str) -> Result<UpdateOutcome> {
        self.update(
            task_id,
            &TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        )
    }

    pub fn reopen(&self, task_id: &str) -> Result<UpdateOutcome> {
        self.update(
            task_id,
            &TaskPatch {
                completed: Some(false),
                ..TaskPatch::default()
            },
        )
    }

    /// Validate and attach a rule, replacing any existing one.
    pub fn set_recurrence(&self, task_id: &str, input: &RuleInput) -> Result<RecurrenceRule> {
        let rule = recurrence::validate(input)?;
        self.store.transaction(|records| {
            fetch(records, task_id)?;
            records.upsert_recurrence_rule(task_id, &rule)
        })?;
        Ok(rule)
    }

    /// Returns whether the task had a rule.
    pub fn clear_recurrence(&self, task_id: &str) -> Result<bool> {
        self.store.transaction(|records| {
            fetch(records, task_id)?;
            records.delete_recurrence_rule(task_id)
        })
    }

    /// Delete a task along with its rule and history.
    pub fn delete(&self, task_id: &str) -> Result<()> {
        if !self.store.delete_task(task_id)? {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }

    pub fn history(&self, task_id: &str, limit: Option<usize>) -> Result<Vec<HistoryRecord>> {
        self.get(task_id)?;
        HistoryLedger::with_limit(self.store, self.max_history).entries(task_id, limit)
    }

    pub fn undo(&self, task_id: &str) -> Result<FieldRestore> {
        self.store.transaction(|records| {
            fetch(records, task_id)?;
            HistoryLedger::with_limit(records, self.max_history).undo(task_id)
        })
    }

    pub fn redo(&self, task_id: &str) -> Result<FieldRestore> {
        self.store.transaction(|records| {
            fetch(records, task_id)?;
            HistoryLedger::with_limit(records, self.max_history).redo(task_id)
        })
    }

    /// Open tasks due on or before `today + upcoming_days`, overdue included.
    pub fn upcoming(&self, today: NaiveDate) -> Result<Vec<UpcomingTask>> {
        let tasks = self.store.list_tasks(false)?;
        Ok(publish::upcoming_tasks(&tasks, today, self.upcoming_days))
    }
}

/// Current time at the precision the store keeps.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn fetch<R: Records + ?Sized>(records: &R, task_id: &str) -> Result<Task> {
    records
        .get_task(task_id)?
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
}

/// Create the next occurrence of a just-completed task and move the rule to
/// it. An exhausted rule stays on the completed task.
fn spawn_follow_up(
    records: &dyn Records,
    task_id: &str,
    mut rule: RecurrenceRule,
) -> Result<Option<Task>> {
    let next = match records.read_task_field(task_id, TaskField::DueDate)? {
        Some(last_due) => recurrence::compute_next_from_text(&mut rule, &last_due)?,
        None => recurrence::compute_next(&mut rule, Local::now().date_naive()),
    };

    let Some(due_date) = next else {
        // Keep the exhausted count so the rule reads as finished.
        records.upsert_recurrence_rule(task_id, &rule)?;
        tracing::debug!(task = task_id, "recurrence finished");
        return Ok(None);
    };

    let completed = fetch(records, task_id)?;
    let now = stored_now();
    let follow_up = Task {
        id: generate_task_id(),
        title: completed.title,
        notes: completed.notes,
        due_date: Some(due_date),
        priority: completed.priority,
        category: completed.category,
        completed: false,
        created_at: now,
        updated_at: now,
        recurring: Some(rule),
    };
    records.insert_task(&follow_up)?;
    records.delete_recurrence_rule(task_id)?;
    Ok(Some(follow_up))
}
