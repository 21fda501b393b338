//! Per-task field history with undo and redo.
//!
//! Basic semantics:
//! - Every real field change appends one record; equal old/new values are ignored
//! - At most `max_per_task` records are kept per task, newest by `changed_at`
//! - Undo and redo both act on the latest record only and append a record of
//!   their own, so undo followed by undo toggles between the last two values
//!   rather than walking further back

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::{HistoryRow, HistoryStore, TaskFieldStore};
use crate::task::{FieldValue, TaskField};

/// Records retained per task unless configured otherwise
pub const MAX_HISTORY_PER_TASK: usize = 20;

/// One logged field transition
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub task_id: String,
    pub field: TaskField,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
    pub changed_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let field: TaskField = row.field_changed.parse().map_err(|_| Error::CorruptValue {
            field: "field_changed".to_string(),
            value: row.field_changed.clone(),
        })?;
        Ok(Self {
            old_value: field.parse_value(row.old_value.as_deref())?,
            new_value: field.parse_value(row.new_value.as_deref())?,
            id: row.id,
            task_id: row.task_id,
            field,
            changed_at: row.changed_at,
        })
    }
}

/// Field and value written by an undo or redo
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldRestore {
    pub task_id: String,
    pub field: TaskField,
    pub value: FieldValue,
}

/// History operations over a store
pub struct HistoryLedger<'a, S: ?Sized> {
    store: &'a S,
    max_per_task: usize,
}

impl<'a, S> HistoryLedger<'a, S>
where
    S: HistoryStore + TaskFieldStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self::with_limit(store, MAX_HISTORY_PER_TASK)
    }

    pub fn with_limit(store: &'a S, max_per_task: usize) -> Self {
        Self {
            store,
            max_per_task: max_per_task.max(1),
        }
    }

    /// Log a field change. Returns `None` when the values are equal and
    /// nothing was written. The caller writes the field itself, in the same
    /// transaction.
    pub fn record(
        &self,
        task_id: &str,
        field: TaskField,
        old_value: &FieldValue,
        new_value: &FieldValue,
    ) -> Result<Option<HistoryRecord>> {
        if old_value == new_value {
            return Ok(None);
        }
        let previous = self.store.latest_history_record(task_id)?;
        self.append(task_id, previous.map(|row| row.changed_at), field, old_value, new_value)
            .map(Some)
    }

    /// Revert the latest record: write its old value back and log the
    /// inverse transition. Run inside a transaction so the write and the
    /// append land together.
    pub fn undo(&self, task_id: &str) -> Result<FieldRestore> {
        let latest = self.latest(task_id)?;
        self.store
            .write_task_field(task_id, latest.field, latest.old_value.to_text().as_deref())?;
        self.append(
            task_id,
            Some(latest.changed_at),
            latest.field,
            &latest.new_value,
            &latest.old_value,
        )?;
        tracing::debug!(task = task_id, field = %latest.field, value = %latest.old_value, "undo");

        Ok(FieldRestore {
            task_id: task_id.to_string(),
            field: latest.field,
            value: latest.old_value,
        })
    }

    /// Reapply the latest record: write its new value and log the same
    /// transition again.
    pub fn redo(&self, task_id: &str) -> Result<FieldRestore> {
        let latest = self.latest(task_id)?;
        self.store
            .write_task_field(task_id, latest.field, latest.new_value.to_text().as_deref())?;
        self.append(
            task_id,
            Some(latest.changed_at),
            latest.field,
            &latest.old_value,
            &latest.new_value,
        )?;
        tracing::debug!(task = task_id, field = %latest.field, value = %latest.new_value, "redo");

        Ok(FieldRestore {
            task_id: task_id.to_string(),
            field: latest.field,
            value: latest.new_value,
        })
    }

    /// Records for the task, newest first.
    pub fn entries(&self, task_id: &str, limit: Option<usize>) -> Result<Vec<HistoryRecord>> {
        self.store
            .list_history_records(task_id, limit)?
            .into_iter()
            .map(HistoryRecord::try_from)
            .collect()
    }

    fn latest(&self, task_id: &str) -> Result<HistoryRecord> {
        self.store
            .latest_history_record(task_id)?
            .ok_or_else(|| Error::NoHistory(task_id.to_string()))?
            .try_into()
    }

    /// `previous` is the `changed_at` of the task's latest record.
    fn append(
        &self,
        task_id: &str,
        previous: Option<DateTime<Utc>>,
        field: TaskField,
        old_value: &FieldValue,
        new_value: &FieldValue,
    ) -> Result<HistoryRecord> {
        let changed_at = next_timestamp(previous);
        let old_text = old_value.to_text();
        let new_text = new_value.to_text();

        let id = self.store.insert_history_record(
            task_id,
            field.as_str(),
            old_text.as_deref(),
            new_text.as_deref(),
            changed_at,
        )?;

        // Retention is maintenance; the append has already succeeded.
        match self.store.prune_history_records(task_id, self.max_per_task) {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(task = task_id, pruned, "history pruned"),
            Err(err) => tracing::warn!(task = task_id, error = %err, "history prune failed"),
        }

        Ok(HistoryRecord {
            id,
            task_id: task_id.to_string(),
            field,
            old_value: old_value.clone(),
            new_value: new_value.clone(),
            changed_at,
        })
    }
}

/// Current time at stored precision, strictly after `previous`.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match previous {
        Some(previous) if now <= previous => previous + Duration::microseconds(1),
        _ => now,
    }
}
