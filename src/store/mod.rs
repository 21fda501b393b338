//! Record store contract.
//!
//! The ledger and the task service only see these traits. Field values and
//! history values cross this boundary as text (`None` is an empty value);
//! callers re-type them on read.
//!
//! Multi-step mutations (field write plus history append, follow-up insert
//! plus rule move) go through [`Store::transaction`] so they commit or roll
//! back as one unit.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::recurrence::RecurrenceRule;
use crate::task::{Task, TaskField};

mod sqlite;

pub use sqlite::SqliteStore;

/// A history row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: i64,
    pub task_id: String,
    pub field_changed: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Append-only per-task change log
pub trait HistoryStore {
    /// Append a row and return its id.
    fn insert_history_record(
        &self,
        task_id: &str,
        field: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> Result<i64>;

    /// Most recent row for the task by `changed_at`, ties broken by id.
    fn latest_history_record(&self, task_id: &str) -> Result<Option<HistoryRow>>;

    /// Keep the `keep` most recent rows for the task; returns rows deleted.
    fn prune_history_records(&self, task_id: &str, keep: usize) -> Result<usize>;

    /// Rows for the task, newest first.
    fn list_history_records(&self, task_id: &str, limit: Option<usize>) -> Result<Vec<HistoryRow>>;
}

/// Single-field access to a task
pub trait TaskFieldStore {
    fn read_task_field(&self, task_id: &str, field: TaskField) -> Result<Option<String>>;
    fn write_task_field(&self, task_id: &str, field: TaskField, value: Option<&str>) -> Result<()>;
}

/// Recurrence rules, at most one per task
pub trait RuleStore {
    fn upsert_recurrence_rule(&self, task_id: &str, rule: &RecurrenceRule) -> Result<()>;
    fn load_recurrence_rule(&self, task_id: &str) -> Result<Option<RecurrenceRule>>;
    /// Returns whether a rule existed.
    fn delete_recurrence_rule(&self, task_id: &str) -> Result<bool>;
}

/// Whole-task records
pub trait TaskStore {
    /// Insert the task together with its rule, if any.
    fn insert_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, task_id: &str) -> Result<Option<Task>>;
    fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>>;
    /// Delete the task; its rule and history go with it. Returns whether it existed.
    fn delete_task(&self, task_id: &str) -> Result<bool>;
}

/// Every record operation, usable inside or outside a transaction
pub trait Records: HistoryStore + TaskFieldStore + RuleStore + TaskStore {}

impl<T> Records for T where T: HistoryStore + TaskFieldStore + RuleStore + TaskStore {}

/// Everything the task service needs
pub trait Store: Records {
    /// Run `work` against a transactional view of the store. Its writes are
    /// committed when it returns `Ok` and rolled back otherwise.
    ///
    /// `work` must only go through the view it is given.
    fn transaction<T>(&self, work: impl FnOnce(&dyn Records) -> Result<T>) -> Result<T>;
}
