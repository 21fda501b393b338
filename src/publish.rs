//! Upcoming-task publishing for external integrations.
//!
//! The list of open tasks due soon is computed here and handed to a
//! [`TaskListSink`]. The bundled sink writes JSON lines to stdout or a file;
//! a message-bus bridge consumes the same envelope.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::Task;

pub const EVENT_SCHEMA_VERSION: &str = "homedo.event.v1";

/// An open task due within the publishing horizon
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpcomingTask {
    pub id: String,
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeats: Option<String>,
    pub overdue: bool,
}

/// Open tasks due on or before `today + days`, sorted by due date then title.
pub fn upcoming_tasks(tasks: &[Task], today: NaiveDate, days: u32) -> Vec<UpcomingTask> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);

    let mut upcoming: Vec<UpcomingTask> = tasks
        .iter()
        .filter(|task| !task.completed)
        .filter_map(|task| {
            let due_date = task.due_date.filter(|due| *due <= horizon)?;
            Some(UpcomingTask {
                id: task.id.clone(),
                title: task.title.clone(),
                due_date,
                priority: task.priority.clone(),
                category: task.category.clone(),
                repeats: task.recurring.as_ref().map(|rule| rule.describe()),
                overdue: due_date < today,
            })
        })
        .collect();

    upcoming.sort_by(|left, right| {
        left.due_date
            .cmp(&right.due_date)
            .then_with(|| left.title.cmp(&right.title))
            .then_with(|| left.id.cmp(&right.id))
    });
    upcoming
}

/// Receives each freshly computed upcoming list
pub trait TaskListSink {
    fn publish(&mut self, tasks: &[UpcomingTask]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkDestination {
    Stdout,
    File(PathBuf),
}

impl SinkDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(SinkDestination::Stdout);
            }
            Some(SinkDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<JsonLinesSink> {
        match self {
            SinkDestination::Stdout => Ok(JsonLinesSink::stdout()),
            SinkDestination::File(path) => JsonLinesSink::file(path),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    schema_version: &'static str,
    event: &'static str,
    timestamp: DateTime<Utc>,
    count: usize,
    tasks: &'a [UpcomingTask],
}

/// Sink that writes one JSON line per published list
pub struct JsonLinesSink {
    writer: Box<dyn Write + Send>,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Append to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }
}

impl TaskListSink for JsonLinesSink {
    fn publish(&mut self, tasks: &[UpcomingTask]) -> Result<()> {
        let envelope = Envelope {
            schema_version: EVENT_SCHEMA_VERSION,
            event: "upcoming_tasks",
            timestamp: Utc::now(),
            count: tasks.len(),
            tasks,
        };
        let serialized = serde_json::to_vec(&envelope)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}
