//! homedo task command implementations.

use chrono::NaiveDate;
use serde::Serialize;

use crate::cli::{load_context, GlobalOptions, Publisher, RuleArgs};
use crate::error::{Error, Result};
use crate::config::Config;
use crate::output::{emit, Report, Status};
use crate::recurrence;
use crate::task::{NewTask, Task, TaskPatch, UpdateOutcome};

pub struct AddOptions {
    pub title: String,
    pub notes: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub repeat: Option<String>,
    pub rule: RuleArgs,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub all: bool,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub clear_notes: bool,
    pub due: Option<String>,
    pub clear_due: bool,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub clear_category: bool,
    pub global: GlobalOptions,
}

pub struct DoneOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct ReopenOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct RmOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskOutput {
    task: Task,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct TaskDeleteOutput {
    id: String,
    deleted: bool,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let due_date = parse_due(options.due.as_deref())?;
    let recurring = options
        .repeat
        .as_deref()
        .map(|frequency| options.rule.to_input(frequency));

    let publisher = Publisher::start(&ctx, &options.global)?;
    let task = ctx.service().create(NewTask {
        title: options.title,
        notes: options.notes,
        due_date,
        priority: options.priority,
        category: options.category,
        recurring,
    })?;
    publisher.trigger();
    let publish_errors = publisher.finish();

    let mut report = Report::new("Task created");
    report.task(&task).publish_errors(publish_errors);

    emit(
        options.global.output(Some(&ctx.config)),
        "task add",
        Status::Success,
        &TaskOutput { task },
        &report,
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let tasks = ctx.service().list(options.all)?;

    let mut report = Report::new(format!("{} tasks", tasks.len()));
    for task in &tasks {
        report.task_row(task);
    }
    if tasks.is_empty() {
        report.hint("homedo task add \"...\" --due YYYY-MM-DD");
    }

    emit(
        options.global.output(Some(&ctx.config)),
        "task list",
        Status::Success,
        &TaskListOutput {
            total: tasks.len(),
            tasks,
        },
        &report,
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let task = ctx.service().get(&options.id)?;

    let mut report = Report::new(format!("Task {}", task.title));
    report.task(&task);
    if let Some(notes) = &task.notes {
        report.line(notes.clone());
    }

    emit(
        options.global.output(Some(&ctx.config)),
        "task show",
        Status::Success,
        &TaskOutput { task },
        &report,
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let patch = TaskPatch {
        title: options.title,
        notes: clearable(options.notes, options.clear_notes),
        due_date: match (options.due.as_deref(), options.clear_due) {
            (_, true) => Some(None),
            (Some(raw), false) => Some(Some(parse_date_arg("due", raw)?)),
            (None, false) => None,
        },
        priority: options.priority,
        category: clearable(options.category, options.clear_category),
        completed: None,
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to edit; pass at least one field flag".to_string(),
        ));
    }

    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    let outcome = ctx.service().update(&options.id, &patch)?;
    if !outcome.changes.is_empty() {
        publisher.trigger();
    }
    let publish_errors = publisher.finish();

    let header = if outcome.changes.is_empty() {
        "Task unchanged"
    } else {
        "Task updated"
    };
    emit_outcome(&options.global, &ctx.config, "task edit", header, &outcome, publish_errors)
}

pub fn run_done(options: DoneOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    let outcome = ctx.service().complete(&options.id)?;
    if !outcome.changes.is_empty() {
        publisher.trigger();
    }
    let publish_errors = publisher.finish();

    emit_outcome(&options.global, &ctx.config, "task done", "Task done", &outcome, publish_errors)
}

pub fn run_reopen(options: ReopenOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    let outcome = ctx.service().reopen(&options.id)?;
    if !outcome.changes.is_empty() {
        publisher.trigger();
    }
    let publish_errors = publisher.finish();

    emit_outcome(
        &options.global,
        &ctx.config,
        "task reopen",
        "Task reopened",
        &outcome,
        publish_errors,
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let ctx = load_context(&options.global)?;
    let publisher = Publisher::start(&ctx, &options.global)?;
    ctx.service().delete(&options.id)?;
    publisher.trigger();
    let publish_errors = publisher.finish();

    let mut report = Report::new("Task deleted");
    report.field("id", options.id.clone()).publish_errors(publish_errors);

    emit(
        options.global.output(Some(&ctx.config)),
        "task rm",
        Status::Success,
        &TaskDeleteOutput {
            id: options.id,
            deleted: true,
        },
        &report,
    )
}

fn emit_outcome(
    global: &GlobalOptions,
    config: &Config,
    command: &str,
    header: &str,
    outcome: &UpdateOutcome,
    publish_errors: Vec<String>,
) -> Result<()> {
    let mut report = Report::new(header);
    report.task(&outcome.task);
    for change in &outcome.changes {
        report.change(change);
    }
    if let Some(follow_up) = &outcome.follow_up {
        report.line(format!("next occurrence: {}", follow_up.id));
        report.task_row(follow_up);
    }
    report.publish_errors(publish_errors);
    if !outcome.changes.is_empty() {
        report.hint(format!("homedo undo {}", outcome.task.id));
    }

    emit(global.output(Some(config)), command, Status::Success, outcome, &report)
}

fn clearable(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn parse_due(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|raw| parse_date_arg("due", raw)).transpose()
}

fn parse_date_arg(label: &str, raw: &str) -> Result<NaiveDate> {
    recurrence::parse_date(raw)
        .map_err(|err| Error::InvalidArgument(format!("invalid --{label}: {err}")))
}
