use std::path::PathBuf;

use thiserror::Error;

/// Load and validation failures. Any of these aborts the run before a task starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no config file found (tried: {tried})")]
    NotFound { tried: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("config root must be a table/object")]
    NotAnObject,

    #[error("config declares no tasks")]
    NoTasks,

    #[error("task #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("task '{0}' declares no outputs")]
    NoOutputs(String),

    #[error("output '{output}' is claimed by tasks [{task_ids}] without a matching allowSharedOutputs entry")]
    OutputConflict { output: String, task_ids: String },

    #[error("invalid value for {field}: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("{field} = {value} exceeds the maximum of {max} seconds")]
    TooLarge { field: String, value: f64, max: f64 },

    #[error("invalid qualityGate.{field}: warn={warn} fail={fail} (expected 0 <= warn <= fail <= 1)")]
    InvalidThreshold { field: &'static str, warn: f64, fail: f64 },

    #[error("invalid qualityGate.eventPathPattern: {0}")]
    InvalidPattern(String),
}
