//! SQLite-backed record store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::recurrence::{DayCode, Frequency, IntervalUnit, RecurrenceEnd, RecurrenceRule, DATE_FORMAT};
use crate::task::{Task, TaskField};

use super::{HistoryRow, HistoryStore, Records, RuleStore, Store, TaskFieldStore, TaskStore};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const TASK_COLUMNS: &str =
    "id, title, notes, due_date, priority, category, completed, created_at, updated_at";

const RULE_COLUMNS: &str = "frequency, interval_value, interval_unit, by_day, by_month_day, \
     start_date, end_type, end_count, end_date, remaining";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "failed to open database");
            Error::StoreUnavailable(path.to_path_buf())
        })?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::OperationFailed("database mutex poisoned".to_string()))
    }

    fn with_session<T>(&self, work: impl FnOnce(&Session<'_>) -> Result<T>) -> Result<T> {
        let conn = self.conn()?;
        work(&Session { conn: &conn })
    }
}

impl Store for SqliteStore {
    fn transaction<T>(&self, work: impl FnOnce(&dyn Records) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        // Dropping `tx` on error rolls back.
        let value = work(&Session { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }
}

impl HistoryStore for SqliteStore {
    fn insert_history_record(
        &self,
        task_id: &str,
        field: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.with_session(|db| {
            db.insert_history_record(task_id, field, old_value, new_value, changed_at)
        })
    }

    fn latest_history_record(&self, task_id: &str) -> Result<Option<HistoryRow>> {
        self.with_session(|db| db.latest_history_record(task_id))
    }

    fn prune_history_records(&self, task_id: &str, keep: usize) -> Result<usize> {
        self.with_session(|db| db.prune_history_records(task_id, keep))
    }

    fn list_history_records(&self, task_id: &str, limit: Option<usize>) -> Result<Vec<HistoryRow>> {
        self.with_session(|db| db.list_history_records(task_id, limit))
    }
}

impl TaskFieldStore for SqliteStore {
    fn read_task_field(&self, task_id: &str, field: TaskField) -> Result<Option<String>> {
        self.with_session(|db| db.read_task_field(task_id, field))
    }

    fn write_task_field(&self, task_id: &str, field: TaskField, value: Option<&str>) -> Result<()> {
        self.with_session(|db| db.write_task_field(task_id, field, value))
    }
}

impl RuleStore for SqliteStore {
    fn upsert_recurrence_rule(&self, task_id: &str, rule: &RecurrenceRule) -> Result<()> {
        self.with_session(|db| db.upsert_recurrence_rule(task_id, rule))
    }

    fn load_recurrence_rule(&self, task_id: &str) -> Result<Option<RecurrenceRule>> {
        self.with_session(|db| db.load_recurrence_rule(task_id))
    }

    fn delete_recurrence_rule(&self, task_id: &str) -> Result<bool> {
        self.with_session(|db| db.delete_recurrence_rule(task_id))
    }
}

impl TaskStore for SqliteStore {
    fn insert_task(&self, task: &Task) -> Result<()> {
        self.transaction(|records| records.insert_task(task))
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_session(|db| db.get_task(task_id))
    }

    fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>> {
        self.with_session(|db| db.list_tasks(include_completed))
    }

    fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_session(|db| db.delete_task(task_id))
    }
}

/// Record operations on a locked connection, or on an open transaction
struct Session<'c> {
    conn: &'c Connection,
}

impl HistoryStore for Session<'_> {
    fn insert_history_record(
        &self,
        task_id: &str,
        field: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO task_history (task_id, field_changed, old_value, new_value, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![task_id, field, old_value, new_value, format_timestamp(changed_at)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_history_record(&self, task_id: &str) -> Result<Option<HistoryRow>> {
        Ok(self.list_history_records(task_id, Some(1))?.into_iter().next())
    }

    fn prune_history_records(&self, task_id: &str, keep: usize) -> Result<usize> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let deleted = self.conn.execute(
            "DELETE FROM task_history
             WHERE task_id = ?1
               AND id NOT IN (
                 SELECT id FROM task_history
                 WHERE task_id = ?1
                 ORDER BY changed_at DESC, id DESC
                 LIMIT ?2
               )",
            params![task_id, keep],
        )?;
        Ok(deleted)
    }

    fn list_history_records(&self, task_id: &str, limit: Option<usize>) -> Result<Vec<HistoryRow>> {
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, field_changed, old_value, new_value, changed_at
             FROM task_history
             WHERE task_id = ?1
             ORDER BY changed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let raw = stmt
            .query_map(params![task_id, limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(id, task_id, field_changed, old_value, new_value, changed_at)| {
                Ok(HistoryRow {
                    id,
                    task_id,
                    field_changed,
                    old_value,
                    new_value,
                    changed_at: parse_timestamp("changed_at", &changed_at)?,
                })
            })
            .collect()
    }
}

impl TaskFieldStore for Session<'_> {
    fn read_task_field(&self, task_id: &str, field: TaskField) -> Result<Option<String>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", column_for(field));
        let value = if field == TaskField::Completed {
            self.conn
                .query_row(&sql, [task_id], |row| row.get::<_, bool>(0))
                .optional()?
                .map(|completed| Some(completed.to_string()))
        } else {
            self.conn
                .query_row(&sql, [task_id], |row| row.get::<_, Option<String>>(0))
                .optional()?
        };
        value.ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    fn write_task_field(&self, task_id: &str, field: TaskField, value: Option<&str>) -> Result<()> {
        let sql = format!(
            "UPDATE tasks SET {} = ?1, updated_at = ?2 WHERE id = ?3",
            column_for(field)
        );
        let now = format_timestamp(Utc::now());
        let updated = match field {
            TaskField::Completed => {
                let completed = match value {
                    Some("true") | Some("1") => true,
                    Some("false") | Some("0") | None => false,
                    Some(other) => {
                        return Err(Error::CorruptValue {
                            field: field.as_str().to_string(),
                            value: other.to_string(),
                        })
                    }
                };
                self.conn.execute(&sql, params![completed, now, task_id])?
            }
            TaskField::Title if value.is_none() => {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
            _ => self.conn.execute(&sql, params![value, now, task_id])?,
        };
        if updated == 0 {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }
}

impl RuleStore for Session<'_> {
    fn upsert_recurrence_rule(&self, task_id: &str, rule: &RecurrenceRule) -> Result<()> {
        upsert_rule(self.conn, task_id, rule)
    }

    fn load_recurrence_rule(&self, task_id: &str) -> Result<Option<RecurrenceRule>> {
        load_rule(self.conn, task_id)
    }

    fn delete_recurrence_rule(&self, task_id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM recurrence_rules WHERE task_id = ?1", [task_id])?;
        Ok(deleted > 0)
    }
}

impl TaskStore for Session<'_> {
    /// Not atomic on its own; [`SqliteStore::insert_task`] wraps it in a
    /// transaction.
    fn insert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                task.id,
                task.title,
                task.notes,
                task.due_date.map(format_date),
                task.priority,
                task.category,
                task.completed,
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
            ],
        )?;
        if let Some(rule) = &task.recurring {
            upsert_rule(self.conn, &task.id, rule)?;
        }
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [task_id],
                RawTask::from_row,
            )
            .optional()?;
        raw.map(|raw| raw.into_task(self.conn)).transpose()
    }

    fn list_tasks(&self, include_completed: bool) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE ?1 OR completed = 0
             ORDER BY completed, due_date IS NULL, due_date, title, id"
        ))?;
        let raw = stmt
            .query_map([include_completed], RawTask::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(|raw| raw.into_task(self.conn)).collect()
    }

    fn delete_task(&self, task_id: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [task_id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
impl SqliteStore {
    /// Make every history insert fail until [`Self::accept_history_inserts`].
    pub(crate) fn reject_history_inserts(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "CREATE TRIGGER reject_history BEFORE INSERT ON task_history
             BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;",
        )?;
        Ok(())
    }

    pub(crate) fn accept_history_inserts(&self) -> Result<()> {
        self.conn()?.execute_batch("DROP TRIGGER reject_history;")?;
        Ok(())
    }
}

struct RawTask {
    id: String,
    title: String,
    notes: Option<String>,
    due_date: Option<String>,
    priority: String,
    category: Option<String>,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl RawTask {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            notes: row.get(2)?,
            due_date: row.get(3)?,
            priority: row.get(4)?,
            category: row.get(5)?,
            completed: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_task(self, conn: &Connection) -> Result<Task> {
        let recurring = load_rule(conn, &self.id)?;
        Ok(Task {
            due_date: self
                .due_date
                .as_deref()
                .map(|raw| parse_date("due_date", raw))
                .transpose()?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            title: self.title,
            notes: self.notes,
            priority: self.priority,
            category: self.category,
            completed: self.completed,
            recurring,
        })
    }
}

fn column_for(field: TaskField) -> &'static str {
    match field {
        TaskField::Title => "title",
        TaskField::Notes => "notes",
        TaskField::DueDate => "due_date",
        TaskField::Priority => "priority",
        TaskField::Category => "category",
        TaskField::Completed => "completed",
    }
}

fn upsert_rule(conn: &Connection, task_id: &str, rule: &RecurrenceRule) -> Result<()> {
    let by_day = if rule.by_day.is_empty() {
        None
    } else {
        Some(
            rule.by_day
                .iter()
                .map(|day| day.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    };
    let (end_count, end_date) = match rule.end {
        RecurrenceEnd::Never => (None, None),
        RecurrenceEnd::After { count } => (Some(count), None),
        RecurrenceEnd::On { date } => (None, Some(format_date(date))),
    };

    conn.execute(
        &format!(
            "INSERT INTO recurrence_rules (task_id, {RULE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(task_id) DO UPDATE SET
               frequency = excluded.frequency,
               interval_value = excluded.interval_value,
               interval_unit = excluded.interval_unit,
               by_day = excluded.by_day,
               by_month_day = excluded.by_month_day,
               start_date = excluded.start_date,
               end_type = excluded.end_type,
               end_count = excluded.end_count,
               end_date = excluded.end_date,
               remaining = excluded.remaining"
        ),
        params![
            task_id,
            rule.frequency.as_str(),
            rule.interval,
            rule.unit.map(IntervalUnit::as_str),
            by_day,
            rule.by_month_day,
            rule.start_date.map(format_date),
            rule.end.kind(),
            end_count,
            end_date,
            rule.remaining,
        ],
    )?;
    Ok(())
}

struct RawRule {
    frequency: String,
    interval: u32,
    unit: Option<String>,
    by_day: Option<String>,
    by_month_day: Option<u8>,
    start_date: Option<String>,
    end_type: String,
    end_count: Option<u32>,
    end_date: Option<String>,
    remaining: Option<u32>,
}

fn load_rule(conn: &Connection, task_id: &str) -> Result<Option<RecurrenceRule>> {
    let raw = conn
        .query_row(
            &format!("SELECT {RULE_COLUMNS} FROM recurrence_rules WHERE task_id = ?1"),
            [task_id],
            |row| {
                Ok(RawRule {
                    frequency: row.get(0)?,
                    interval: row.get(1)?,
                    unit: row.get(2)?,
                    by_day: row.get(3)?,
                    by_month_day: row.get(4)?,
                    start_date: row.get(5)?,
                    end_type: row.get(6)?,
                    end_count: row.get(7)?,
                    end_date: row.get(8)?,
                    remaining: row.get(9)?,
                })
            },
        )
        .optional()?;
    raw.map(RawRule::into_rule).transpose()
}

impl RawRule {
    fn into_rule(self) -> Result<RecurrenceRule> {
        let frequency = self
            .frequency
            .parse::<Frequency>()
            .map_err(|_| corrupt("frequency", &self.frequency))?;
        let unit = self
            .unit
            .as_deref()
            .map(|raw| raw.parse::<IntervalUnit>().map_err(|_| corrupt("interval_unit", raw)))
            .transpose()?;
        let by_day = self
            .by_day
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|code| !code.is_empty())
            .map(|code| code.parse::<DayCode>().map_err(|_| corrupt("by_day", code)))
            .collect::<Result<Vec<_>>>()?;
        let start_date = self
            .start_date
            .as_deref()
            .map(|raw| parse_date("start_date", raw))
            .transpose()?;

        let end = match self.end_type.as_str() {
            "never" => RecurrenceEnd::Never,
            "after" => RecurrenceEnd::After {
                count: self.end_count.ok_or_else(|| corrupt("end_count", "NULL"))?,
            },
            "on" => {
                let raw = self.end_date.as_deref().ok_or_else(|| corrupt("end_date", "NULL"))?;
                RecurrenceEnd::On {
                    date: parse_date("end_date", raw)?,
                }
            }
            other => return Err(corrupt("end_type", other)),
        };

        Ok(RecurrenceRule {
            frequency,
            interval: self.interval,
            unit,
            by_day,
            by_month_day: self.by_month_day,
            start_date,
            end,
            remaining: self.remaining,
        })
    }
}

fn corrupt(field: &str, value: &str) -> Error {
    Error::CorruptValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| corrupt(field, raw))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| corrupt(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn sample_task(id: &str, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            notes: None,
            due_date: None,
            priority: "P2".to_string(),
            category: None,
            completed: false,
            created_at: now,
            updated_at: now,
            recurring: None,
        }
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn rule_survives_storage() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut task = sample_task("t1", "Mow lawn");
        let mut rule = RecurrenceRule::new(Frequency::Custom).with_end(RecurrenceEnd::On {
            date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        });
        rule.interval = 10;
        rule.unit = Some(IntervalUnit::Days);
        rule.by_day = vec![DayCode::Sat, DayCode::Sun];
        rule.start_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        task.recurring = Some(rule.clone());
        store.insert_task(&task).unwrap();

        assert_eq!(store.load_recurrence_rule("t1").unwrap(), Some(rule.clone()));
        assert_eq!(store.get_task("t1").unwrap().unwrap().recurring, Some(rule));

        let replacement = RecurrenceRule::new(Frequency::Monthly).with_end(RecurrenceEnd::After { count: 4 });
        store.upsert_recurrence_rule("t1", &replacement).unwrap();
        assert_eq!(store.load_recurrence_rule("t1").unwrap(), Some(replacement));

        assert!(store.delete_recurrence_rule("t1").unwrap());
        assert!(!store.delete_recurrence_rule("t1").unwrap());
        assert_eq!(store.load_recurrence_rule("t1").unwrap(), None);
    }

    #[test]
    fn task_fields_are_text_at_the_boundary() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_task(&sample_task("t1", "Feed cat")).unwrap();

        assert_eq!(
            store.read_task_field("t1", TaskField::Completed).unwrap().as_deref(),
            Some("false")
        );
        store.write_task_field("t1", TaskField::Completed, Some("true")).unwrap();
        store.write_task_field("t1", TaskField::DueDate, Some("2024-05-06")).unwrap();
        store.write_task_field("t1", TaskField::Notes, None).unwrap();

        let task = store.get_task("t1").unwrap().unwrap();
        assert!(task.completed);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 5, 6));
        assert_eq!(store.read_task_field("t1", TaskField::Notes).unwrap(), None);

        assert!(matches!(
            store.read_task_field("missing", TaskField::Title),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            store.write_task_field("missing", TaskField::Title, Some("x")),
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            store.write_task_field("t1", TaskField::Title, None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn transaction_commits_or_rolls_back_as_a_unit() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_task(&sample_task("t1", "Sweep")).unwrap();

        let result: Result<()> = store.transaction(|records| {
            records.write_task_field("t1", TaskField::Title, Some("Mop"))?;
            records.insert_history_record("t1", "title", Some("Sweep"), Some("Mop"), base_time())?;
            Err(Error::OperationFailed("interrupted".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get_task("t1").unwrap().unwrap().title, "Sweep");
        assert!(store.latest_history_record("t1").unwrap().is_none());

        store.reject_history_inserts().unwrap();
        let result = store.transaction(|records| {
            records.write_task_field("t1", TaskField::Title, Some("Mop"))?;
            records.insert_history_record("t1", "title", Some("Sweep"), Some("Mop"), base_time())
        });
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.get_task("t1").unwrap().unwrap().title, "Sweep");

        store.accept_history_inserts().unwrap();
        store
            .transaction(|records| records.write_task_field("t1", TaskField::Title, Some("Mop")))
            .unwrap();
        assert_eq!(store.get_task("t1").unwrap().unwrap().title, "Mop");
    }

    #[test]
    fn prune_keeps_most_recent_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_task(&sample_task("t1", "Vacuum")).unwrap();
        store.insert_task(&sample_task("t2", "Dust")).unwrap();

        for i in 0..8 {
            let at = base_time() + Duration::minutes(i);
            let old = i.to_string();
            let new = (i + 1).to_string();
            store
                .insert_history_record("t1", "title", Some(&old), Some(&new), at)
                .unwrap();
        }
        store
            .insert_history_record("t2", "title", Some("a"), Some("b"), base_time())
            .unwrap();

        assert_eq!(store.prune_history_records("t1", 3).unwrap(), 5);
        let rows = store.list_history_records("t1", None).unwrap();
        let news: Vec<_> = rows.iter().map(|row| row.new_value.clone().unwrap()).collect();
        assert_eq!(news, vec!["8", "7", "6"]);
        assert_eq!(store.list_history_records("t2", None).unwrap().len(), 1);

        let latest = store.latest_history_record("t1").unwrap().unwrap();
        assert_eq!(latest.old_value.as_deref(), Some("7"));
        assert_eq!(latest.changed_at, base_time() + Duration::minutes(7));
    }

    #[test]
    fn deleting_task_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut task = sample_task("t1", "Clean gutters");
        task.recurring = Some(RecurrenceRule::new(Frequency::Yearly));
        store.insert_task(&task).unwrap();
        store
            .insert_history_record("t1", "title", Some("a"), Some("b"), base_time())
            .unwrap();

        assert!(store.delete_task("t1").unwrap());
        assert!(store.get_task("t1").unwrap().is_none());
        assert!(store.latest_history_record("t1").unwrap().is_none());
        assert!(store.load_recurrence_rule("t1").unwrap().is_none());
        assert!(!store.delete_task("t1").unwrap());
    }

    #[test]
    fn list_orders_by_due_date_and_hides_completed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut later = sample_task("a", "Later");
        later.due_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        let mut sooner = sample_task("b", "Sooner");
        sooner.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let undated = sample_task("c", "Whenever");
        let mut done = sample_task("d", "Done");
        done.completed = true;
        for task in [&later, &sooner, &undated, &done] {
            store.insert_task(task).unwrap();
        }

        let open: Vec<_> = store
            .list_tasks(false)
            .unwrap()
            .into_iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(open, vec!["b", "a", "c"]);
        assert_eq!(store.list_tasks(true).unwrap().len(), 4);
    }

    #[test]
    fn file_database_persists_across_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("homedo.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_task(&sample_task("t1", "Check smoke alarm")).unwrap();
            assert_eq!(store.db_path(), Some(path.as_path()));
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_task("t1").unwrap().unwrap().title, "Check smoke alarm");
    }
}
