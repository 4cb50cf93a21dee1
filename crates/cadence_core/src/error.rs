use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskStatus;

pub type Result<T> = std::result::Result<T, CadenceError>;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("task `{id}` not found")]
    NotFound { id: String },

    #[error("task `{id}` already exists")]
    DuplicateTask { id: String },

    #[error("task `{id}` has no pending occurrence to complete")]
    NoPendingOccurrence { id: String },

    /// Old per-date tracking (`currentPeriodCompletions`) needs an explicit migration.
    #[error("task `{id}` uses the legacy currentPeriodCompletions format")]
    UnsupportedLegacyFormat { id: String },

    #[error("task `{id}` is {status:?} and cannot be completed")]
    Inactive { id: String, status: TaskStatus },

    #[error("invalid recurrence configuration: {0}")]
    InvalidConfiguration(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("unable to watch task store: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed task data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Unavailable(String),
}
