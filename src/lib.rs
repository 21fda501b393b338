//! homedo - household to-do library
//!
//! This library provides the core of the homedo CLI: recurring chores,
//! per-field change history, and undo/redo.
//!
//! # Core Concepts
//!
//! - **Recurrence rules**: how a task repeats and when it stops
//! - **History ledger**: bounded per-task log of field changes with toggle undo
//! - **Upcoming list**: open tasks due soon, published to external consumers
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `debounce`: Quiet-period batching of publish requests
//! - `error`: Error types and result aliases
//! - `history`: Field history, undo and redo
//! - `output`: Human and JSON command output
//! - `publish`: Upcoming-task list and its sinks
//! - `recurrence`: Rule validation and next-occurrence arithmetic
//! - `store`: Storage traits and the SQLite implementation
//! - `task`: Tasks and the service that mutates them

pub mod cli;
pub mod config;
pub mod debounce;
pub mod error;
pub mod history;
pub mod output;
pub mod publish;
pub mod recurrence;
pub mod store;
pub mod task;

pub use error::{Error, Result};
