//! Command-line interface for homedo
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};

use crate::config::{self, Config};
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::publish::{SinkDestination, TaskListSink};
use crate::store::SqliteStore;
use crate::task::TaskService;

mod history;
mod publish;
mod repeat;
mod task;

pub use repeat::RuleArgs;

/// homedo - household to-do list
///
/// Recurring chores, per-field change history, and undo/redo.
#[derive(Parser, Debug)]
#[command(name = "homedo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the SQLite database (overrides store.path)
    #[arg(long, global = true, env = "HOMEDO_DB")]
    pub db: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, env = "HOMEDO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Publish upcoming tasks to `-` (stdout) or a file (overrides publish.destination)
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Recurrence rules
    #[command(subcommand)]
    Repeat(RepeatCommands),

    /// Show the change history of a task
    History {
        /// Task ID
        id: String,

        /// Show at most this many records, newest first
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Revert the change in the task's latest history record
    Undo {
        /// Task ID
        id: String,
    },

    /// Re-apply the change in the task's latest history record
    Redo {
        /// Task ID
        id: String,
    },

    /// Publish the upcoming-task list once
    Publish {
        /// Reference date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<String>,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Priority P0-P4
        #[arg(long)]
        priority: Option<String>,

        /// Category such as kitchen or garden
        #[arg(long)]
        category: Option<String>,

        /// Make the task recurring: daily, weekday, weekly, biweekly, monthly, yearly, custom
        #[arg(long)]
        repeat: Option<String>,

        #[command(flatten)]
        rule: RuleArgs,
    },

    /// List open tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Show a task
    Show {
        /// Task ID
        id: String,
    },

    /// Edit task fields
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        #[arg(long)]
        clear_notes: bool,

        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        #[arg(long)]
        clear_due: bool,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,

        #[arg(long)]
        clear_category: bool,
    },

    /// Mark a task done, creating the next occurrence of a recurring task
    Done {
        /// Task ID
        id: String,
    },

    /// Mark a task open again
    Reopen {
        /// Task ID
        id: String,
    },

    /// Delete a task with its rule and history
    Rm {
        /// Task ID
        id: String,
    },
}

/// Recurrence subcommands
#[derive(Subcommand, Debug)]
pub enum RepeatCommands {
    /// Attach or replace a task's recurrence rule
    Set {
        /// Task ID
        id: String,

        /// daily, weekday, weekly, biweekly, monthly, yearly, custom
        frequency: String,

        #[command(flatten)]
        rule: RuleArgs,
    },

    /// Remove a task's recurrence rule
    Clear {
        /// Task ID
        id: String,
    },

    /// Preview occurrences of a rule without touching the store
    Next {
        /// daily, weekday, weekly, biweekly, monthly, yearly, custom
        frequency: String,

        /// Last due date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Number of occurrences to preview
        #[arg(long, default_value_t = 1)]
        times: usize,

        #[command(flatten)]
        rule: RuleArgs,
    },
}

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    fn events_to_stdout(&self, config: Option<&Config>) -> bool {
        let destination = self
            .events
            .as_deref()
            .or_else(|| config.and_then(|config| config.publish.destination.as_deref()));
        matches!(
            SinkDestination::parse(destination),
            Some(SinkDestination::Stdout)
        )
    }

    /// Command output settings; stdout is left to the event stream when it
    /// is the publish destination.
    pub fn output(&self, config: Option<&Config>) -> OutputOptions {
        let events_to_stdout = self.events_to_stdout(config);
        OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        }
    }
}

/// Config and store shared by commands that touch tasks
pub struct CommandContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
}

impl CommandContext {
    pub fn service(&self) -> TaskService<'_, SqliteStore> {
        TaskService::new(self.store.as_ref(), &self.config)
    }

    pub fn destination(&self, global: &GlobalOptions) -> Option<SinkDestination> {
        SinkDestination::parse(
            global
                .events
                .as_deref()
                .or(self.config.publish.destination.as_deref()),
        )
    }
}

pub fn load_context(global: &GlobalOptions) -> Result<CommandContext> {
    let config_path = match &global.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let config = Config::load_or_default(&config_path)?;
    let db_path = match &global.db {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };
    tracing::debug!(config = %config_path.display(), db = %db_path.display(), "loading context");

    let store = SqliteStore::open(&db_path)?;
    Ok(CommandContext {
        config,
        store: Arc::new(store),
    })
}

/// Debounced upcoming-list publisher for mutating commands.
///
/// Inactive when no destination is configured.
pub struct Publisher {
    active: Option<ActivePublisher>,
}

struct ActivePublisher {
    runtime: tokio::runtime::Runtime,
    debouncer: Debouncer,
    failures: Arc<Mutex<Vec<String>>>,
}

impl Publisher {
    pub fn start(ctx: &CommandContext, global: &GlobalOptions) -> Result<Self> {
        let Some(destination) = ctx.destination(global) else {
            return Ok(Self { active: None });
        };

        let mut sink = destination.open()?;
        let store = Arc::clone(&ctx.store);
        let config = ctx.config.clone();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let debouncer = {
            let _guard = runtime.enter();
            Debouncer::spawn(
                Duration::from_millis(config.publish.debounce_ms),
                move || {
                    let service = TaskService::new(store.as_ref(), &config);
                    let result = service
                        .upcoming(Local::now().date_naive())
                        .and_then(|upcoming| sink.publish(&upcoming));
                    if let Err(err) = result {
                        if let Ok(mut failures) = seen.lock() {
                            failures.push(format!("publish failed: {err}"));
                        }
                        return Err(err.into());
                    }
                    Ok(())
                },
            )
        };

        Ok(Self {
            active: Some(ActivePublisher {
                runtime,
                debouncer,
                failures,
            }),
        })
    }

    pub fn trigger(&self) {
        if let Some(active) = &self.active {
            active.debouncer.trigger();
        }
    }

    /// Flush pending publishes. Returns publish failures for the command output.
    pub fn finish(self) -> Vec<String> {
        let Some(active) = self.active else {
            return Vec::new();
        };
        let ActivePublisher {
            runtime,
            debouncer,
            failures,
        } = active;
        let flushes = runtime.block_on(debouncer.shutdown());
        tracing::debug!(flushes, "publisher finished");
        failures
            .lock()
            .map(|failures| failures.clone())
            .unwrap_or_default()
    }
}

impl Cli {
    /// Command name as reported in output envelopes, e.g. `task done`.
    pub fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { .. } => "task add",
                TaskCommands::List { .. } => "task list",
                TaskCommands::Show { .. } => "task show",
                TaskCommands::Edit { .. } => "task edit",
                TaskCommands::Done { .. } => "task done",
                TaskCommands::Reopen { .. } => "task reopen",
                TaskCommands::Rm { .. } => "task rm",
            },
            Commands::Repeat(cmd) => match cmd {
                RepeatCommands::Set { .. } => "repeat set",
                RepeatCommands::Clear { .. } => "repeat clear",
                RepeatCommands::Next { .. } => "repeat next",
            },
            Commands::History { .. } => "history",
            Commands::Undo { .. } => "undo",
            Commands::Redo { .. } => "redo",
            Commands::Publish { .. } => "publish",
        }
    }

    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            db: self.db.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    notes,
                    due,
                    priority,
                    category,
                    repeat,
                    rule,
                } => task::run_add(task::AddOptions {
                    title,
                    notes,
                    due,
                    priority,
                    category,
                    repeat,
                    rule,
                    global,
                }),
                TaskCommands::List { all } => task::run_list(task::ListOptions { all, global }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Edit {
                    id,
                    title,
                    notes,
                    clear_notes,
                    due,
                    clear_due,
                    priority,
                    category,
                    clear_category,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    notes,
                    clear_notes,
                    due,
                    clear_due,
                    priority,
                    category,
                    clear_category,
                    global,
                }),
                TaskCommands::Done { id } => task::run_done(task::DoneOptions { id, global }),
                TaskCommands::Reopen { id } => {
                    task::run_reopen(task::ReopenOptions { id, global })
                }
                TaskCommands::Rm { id } => task::run_rm(task::RmOptions { id, global }),
            },
            Commands::Repeat(cmd) => match cmd {
                RepeatCommands::Set {
                    id,
                    frequency,
                    rule,
                } => repeat::run_set(repeat::SetOptions {
                    id,
                    frequency,
                    rule,
                    global,
                }),
                RepeatCommands::Clear { id } => {
                    repeat::run_clear(repeat::ClearOptions { id, global })
                }
                RepeatCommands::Next {
                    frequency,
                    from,
                    times,
                    rule,
                } => repeat::run_next(repeat::NextOptions {
                    frequency,
                    from,
                    times,
                    rule,
                    global,
                }),
            },
            Commands::History { id, limit } => {
                history::run_history(history::HistoryOptions { id, limit, global })
            }
            Commands::Undo { id } => history::run_undo(history::RestoreOptions { id, global }),
            Commands::Redo { id } => history::run_redo(history::RestoreOptions { id, global }),
            Commands::Publish { today } => {
                publish::run_publish(publish::PublishOptions { today, global })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn stdout_events_silence_command_output() {
        let global = GlobalOptions {
            events: Some("-".to_string()),
            json: true,
            ..GlobalOptions::default()
        };
        let output = global.output(None);
        assert!(!output.json);
        assert!(output.quiet);

        let mut config = Config::default();
        config.publish.destination = Some("-".to_string());
        let global = GlobalOptions::default();
        assert!(global.output(Some(&config)).quiet);
        assert!(!global.output(None).quiet);
    }

    #[test]
    fn undo_and_redo_help_name_the_latest_record() {
        use clap::CommandFactory;
        let command = Cli::command();
        for name in ["undo", "redo"] {
            let about = command
                .find_subcommand(name)
                .and_then(|sub| sub.get_about())
                .map(|about| about.to_string())
                .unwrap();
            assert!(about.contains("latest history record"), "{name}: {about}");
        }
    }

    #[test]
    fn command_names_follow_subcommands() {
        let cli = Cli::try_parse_from(["homedo", "task", "done", "01hq"]).unwrap();
        assert_eq!(cli.command_name(), "task done");
        let cli = Cli::try_parse_from(["homedo", "--json", "redo", "01hq"]).unwrap();
        assert_eq!(cli.command_name(), "redo");
    }
}
