//! Error types for homedo
//!
//! Exit codes:
//! - 0: Success (including "nothing to undo/redo")
//! - 2: User error (bad rule input, bad args, unknown task)
//! - 4: Operation failed (store, I/O, serialization)

use std::path::PathBuf;
use thiserror::Error;

use crate::recurrence::ValidationError;

/// Exit codes for the homedo CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for homedo operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid recurrence rule: {0}")]
    Validation(#[from] ValidationError),

    #[error("No history recorded for task {0}")]
    NoHistory(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Stored value for {field} is not valid: {value}")]
    CorruptValue { field: String, value: String },

    #[error("Cannot open store at {0}")]
    StoreUnavailable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::NoHistory(_)
            | Error::TaskNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::Storage(_)
            | Error::CorruptValue { .. }
            | Error::StoreUnavailable(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NoHistory(task_id) | Error::TaskNotFound(task_id) => {
                Some(serde_json::json!({ "task_id": task_id }))
            }
            Error::CorruptValue { field, value } => {
                Some(serde_json::json!({ "field": field, "value": value }))
            }
            Error::StoreUnavailable(path) => {
                Some(serde_json::json!({ "path": path.to_string_lossy() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for homedo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
