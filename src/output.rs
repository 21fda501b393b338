//! Command output: a JSON envelope for scripts, or a short text report.
//!
//! Every command builds a [`Report`] from the records it touched. In JSON
//! mode only the envelope is printed; the report contributes its publish
//! failures and hint.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::history::{FieldRestore, HistoryRecord};
use crate::publish::UpcomingTask;
use crate::recurrence::DATE_FORMAT;
use crate::task::{FieldChange, Task};

pub const SCHEMA_VERSION: &str = "homedo.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Outcome reported in the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    /// Nothing to do, such as undo on an empty history
    Noop,
    Error,
}

/// Text rendering of a command result
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(&'static str, String)>,
    lines: Vec<String>,
    publish_errors: Vec<String>,
    hint: Option<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, label: &'static str, value: impl Into<String>) -> &mut Self {
        self.fields.push((label, value.into()));
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Labeled fields for one task.
    pub fn task(&mut self, task: &Task) -> &mut Self {
        self.field("id", task.id.clone());
        self.field("title", task.title.clone());
        if let Some(due) = task.due_date {
            self.field("due", due.format(DATE_FORMAT).to_string());
        }
        self.field("priority", task.priority.clone());
        if let Some(category) = &task.category {
            self.field("category", category.clone());
        }
        self.field("status", if task.completed { "done" } else { "open" });
        if let Some(rule) = &task.recurring {
            self.field("repeats", rule.describe());
        }
        self
    }

    /// One checklist row per task.
    pub fn task_row(&mut self, task: &Task) -> &mut Self {
        let mark = if task.completed { "x" } else { " " };
        let mut row = format!("[{mark}] {} {} ({})", task.id, task.title, task.priority);
        if let Some(due) = task.due_date {
            row.push_str(&format!(" due {}", due.format(DATE_FORMAT)));
        }
        if let Some(rule) = &task.recurring {
            row.push_str(&format!(", {}", rule.describe()));
        }
        self.line(row)
    }

    pub fn change(&mut self, change: &FieldChange) -> &mut Self {
        self.line(format!(
            "{}: {} -> {}",
            change.field, change.old_value, change.new_value
        ))
    }

    pub fn record(&mut self, record: &HistoryRecord) -> &mut Self {
        self.line(format!(
            "{} {}: {} -> {}",
            record.changed_at.format("%Y-%m-%d %H:%M:%S"),
            record.field,
            record.old_value,
            record.new_value
        ))
    }

    pub fn restore(&mut self, restore: &FieldRestore) -> &mut Self {
        self.field("task", restore.task_id.clone());
        self.field(restore.field.as_str(), restore.value.to_string())
    }

    pub fn upcoming(&mut self, task: &UpcomingTask) -> &mut Self {
        let flag = if task.overdue { " (overdue)" } else { "" };
        self.line(format!(
            "{} {}{flag}",
            task.due_date.format(DATE_FORMAT),
            task.title
        ))
    }

    /// Failures from the upcoming-list publisher; the command itself succeeded.
    pub fn publish_errors(&mut self, errors: Vec<String>) -> &mut Self {
        self.publish_errors.extend(errors);
        self
    }

    pub fn hint(&mut self, command: impl Into<String>) -> &mut Self {
        self.hint = Some(command.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = vec![self.title.clone()];
        let width = self
            .fields
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        for (label, value) in &self.fields {
            out.push(format!("  {label:<width$}  {value}"));
        }
        if !self.lines.is_empty() {
            out.push(String::new());
            out.extend(self.lines.iter().map(|line| format!("  {line}")));
        }
        for error in &self.publish_errors {
            out.push(format!("publish failed: {error}"));
        }
        if let Some(hint) = &self.hint {
            out.push(format!("hint: {hint}"));
        }
        out.join("\n")
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    publish_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Print a command result. `status` is [`Status::Success`] or [`Status::Noop`].
pub fn emit<T: Serialize>(
    options: OutputOptions,
    command: &str,
    status: Status,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status,
            data: Some(data),
            error: None,
            publish_errors: report.publish_errors.clone(),
            hint: report.hint.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{}", report.render());
    }
    Ok(())
}

/// Print a failed command: the JSON envelope on stdout, or text on stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            publish_errors: Vec::new(),
            hint,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::TaskNotFound(_) => Some("homedo task list --all"),
        Error::Validation(_) => Some("homedo repeat set --help"),
        Error::InvalidConfig(_) => Some("fix config.toml then retry"),
        Error::StoreUnavailable(_) => Some("check --db or HOMEDO_DB"),
        _ => None,
    }
}
