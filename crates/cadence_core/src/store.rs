use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::task::RecurringTask;

/// Storage collaborator. The engine never performs I/O itself; the service
/// loads once and saves the whole list after every mutation.
pub trait TaskStore: Send + Sync {
    fn load(&self) -> Result<Vec<RecurringTask>, StoreError>;
    fn save(&self, tasks: &[RecurringTask]) -> Result<(), StoreError>;

    /// File backing the store, if any, for change watching.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Task list persisted as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TaskStore for JsonFileStore {
    fn load(&self) -> Result<Vec<RecurringTask>, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "task file missing, starting empty");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, tasks: &[RecurringTask]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }
        let mut payload = serde_json::to_string_pretty(tasks).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        payload.push('\n');

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Volatile store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<RecurringTask>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<RecurringTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Makes every following `save` fail until switched off again.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<RecurringTask> {
        self.tasks.lock().clone()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<Vec<RecurringTask>, StoreError> {
        Ok(self.tasks.lock().clone())
    }

    fn save(&self, tasks: &[RecurringTask]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejected the write".into()));
        }
        *self.tasks.lock() = tasks.to_vec();
        Ok(())
    }
}
