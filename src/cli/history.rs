//! homedo history, undo, and redo commands.

use serde::Serialize;

use crate::cli::{load_context, GlobalOptions, Publisher};
use crate::error::{Error, Result};
use crate::history::{FieldRestore, HistoryRecord};
use crate::output::{emit, Report, Status};

pub struct HistoryOptions {
    pub id: String,
    pub limit: Option<usize>,
    pub global: GlobalOptions,
}

pub struct RestoreOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct HistoryOutput {
    task_id: String,
    total: usize,
    records: Vec<HistoryRecord>,
}

#[derive(Serialize)]
struct RestoreOutput {
    task_id: String,
    restored: Option<FieldRestore>,
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn command(self) -> &'static str {
        match self {
            Direction::Undo => "undo",
            Direction::Redo => "redo",
        }
    }
}

pub fn run_history(options: HistoryOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let records = ctx.service().history(&options.id, options.limit)?;

    let mut report = Report::new(format!("History for {}", options.id));
    report.field("records", records.len().to_string());
    for record in &records {
        report.record(record);
    }
    if !records.is_empty() {
        report.hint(format!("homedo undo {}", options.id));
    }

    emit(
        options.global.output(Some(&ctx.config)),
        "history",
        Status::Success,
        &HistoryOutput {
            task_id: options.id,
            total: records.len(),
            records,
        },
        &report,
    )
}

pub fn run_undo(options: RestoreOptions) -> Result<()> {
    run_restore(options, Direction::Undo)
}

pub fn run_redo(options: RestoreOptions) -> Result<()> {
    run_restore(options, Direction::Redo)
}

fn run_restore(options: RestoreOptions, direction: Direction) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let output = options.global.output(Some(&ctx.config));
    let command = direction.command();

    let publisher = Publisher::start(&ctx, &options.global)?;
    let service = ctx.service();
    let result = match direction {
        Direction::Undo => service.undo(&options.id),
        Direction::Redo => service.redo(&options.id),
    };

    let restore = match result {
        Ok(restore) => restore,
        Err(Error::NoHistory(task_id)) => {
            publisher.finish();
            let mut report = Report::new(format!("Nothing to {command}"));
            report.field("task", task_id.clone());
            return emit(
                output,
                command,
                Status::Noop,
                &RestoreOutput {
                    task_id,
                    restored: None,
                },
                &report,
            );
        }
        Err(err) => return Err(err),
    };
    publisher.trigger();
    let publish_errors = publisher.finish();

    let header = match direction {
        Direction::Undo => "Change undone",
        Direction::Redo => "Change redone",
    };
    let mut report = Report::new(header);
    report.restore(&restore).publish_errors(publish_errors);

    emit(
        output,
        command,
        Status::Success,
        &RestoreOutput {
            task_id: options.id,
            restored: Some(restore),
        },
        &report,
    )
}
