//! homedo publish command implementation.

use chrono::Local;
use serde::Serialize;

use crate::cli::{load_context, GlobalOptions};
use crate::error::{Error, Result};
use crate::output::{emit, Report, Status};
use crate::publish::{SinkDestination, TaskListSink};
use crate::recurrence;

pub struct PublishOptions {
    pub today: Option<String>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct PublishOutput {
    destination: String,
    count: usize,
    overdue: usize,
}

pub fn run_publish(options: PublishOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let destination = ctx.destination(&options.global).ok_or_else(|| {
        Error::InvalidArgument(
            "no publish destination; pass --events or set publish.destination".to_string(),
        )
    })?;
    let today = match options.today.as_deref() {
        Some(raw) => recurrence::parse_date(raw)?,
        None => Local::now().date_naive(),
    };

    let upcoming = ctx.service().upcoming(today)?;
    destination.open()?.publish(&upcoming)?;
    tracing::debug!(count = upcoming.len(), %today, "published upcoming tasks");

    let destination = match destination {
        SinkDestination::Stdout => "-".to_string(),
        SinkDestination::File(path) => path.display().to_string(),
    };
    let overdue = upcoming.iter().filter(|task| task.overdue).count();

    let mut report = Report::new("Upcoming tasks published");
    report
        .field("destination", destination.clone())
        .field("tasks", upcoming.len().to_string())
        .field("overdue", overdue.to_string());
    for task in &upcoming {
        report.upcoming(task);
    }

    emit(
        options.global.output(Some(&ctx.config)),
        "publish",
        Status::Success,
        &PublishOutput {
            destination,
            count: upcoming.len(),
            overdue,
        },
        &report,
    )
}
