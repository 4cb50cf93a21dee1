use std::ffi::OsStr;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, FixedOffset};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tracing::instrument;

use crate::{
    completion::{self, CompletionOutcome},
    error::{CadenceError, Result},
    initializer,
    notifications::{self, NotificationRequest, NotificationSink},
    occurrence::OccurrenceRecord,
    store::{JsonFileStore, MemoryStore, TaskStore},
    sweeper,
    task::RecurringTask,
};

/// Owns the in-memory task collection and persists it after every change.
///
/// All mutations run under a single write lock so a reminder sweep and a
/// user completion cannot interleave their read-then-write sequences.
pub struct TaskService {
    store: Box<dyn TaskStore>,
    tasks: RwLock<Vec<RecurringTask>>,
    watcher: Option<RecommendedWatcher>,
    stale: Arc<AtomicBool>,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

pub struct TaskServiceBuilder {
    store: Option<Box<dyn TaskStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

impl TaskServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            notification_sink: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_json_file(self, path: impl AsRef<Path>) -> Self {
        self.with_store(Box::new(JsonFileStore::new(path)))
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TaskService> {
        let service = TaskService {
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            tasks: RwLock::new(Vec::new()),
            watcher: None,
            stale: Arc::new(AtomicBool::new(false)),
            notification_sink: self.notification_sink,
        };
        service.reload()?;
        Ok(service)
    }
}

impl Default for TaskServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService {
    pub fn builder() -> TaskServiceBuilder {
        TaskServiceBuilder::new()
    }

    pub fn reload(&self) -> Result<()> {
        let loaded = self.store.load()?;
        tracing::debug!(count = loaded.len(), "loaded tasks");
        *self.tasks.write() = loaded;
        Ok(())
    }

    pub fn tasks(&self) -> Vec<RecurringTask> {
        self.tasks.read().clone()
    }

    pub fn get(&self, id: &str) -> Result<RecurringTask> {
        self.tasks
            .read()
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Seeds the occurrence history of a new task and stores it.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub fn create(
        &self,
        mut task: RecurringTask,
        now: DateTime<FixedOffset>,
    ) -> Result<RecurringTask> {
        let mut tasks = self.tasks.write();
        if tasks.iter().any(|existing| existing.id == task.id) {
            return Err(CadenceError::DuplicateTask { id: task.id });
        }
        initializer::seed(&mut task, now)?;
        tasks.push(task.clone());
        self.store.save(&tasks)?;
        Ok(task)
    }

    #[instrument(skip(self))]
    pub fn complete(&self, id: &str, now: DateTime<FixedOffset>) -> Result<CompletionOutcome> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))?;
        let outcome = completion::complete(task, now)?;
        if outcome == CompletionOutcome::TaskFinished {
            if let Some(sink) = &self.notification_sink {
                sink.clear_for_task(task);
            }
        }
        self.store.save(&tasks)?;
        Ok(outcome)
    }

    /// Reclassifies overdue occurrences across every task. Saves only when
    /// something changed.
    #[instrument(skip(self))]
    pub fn sweep_missed(&self, now: DateTime<FixedOffset>) -> Result<usize> {
        let mut tasks = self.tasks.write();
        let swept: usize = tasks
            .iter_mut()
            .map(|task| sweeper::sweep_missed(task, now))
            .sum();
        if swept > 0 {
            tracing::info!(swept, "marked overdue occurrences as missed");
            self.store.save(&tasks)?;
        }
        Ok(swept)
    }

    pub fn current_due(
        &self,
        id: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<OccurrenceRecord>> {
        let tasks = self.tasks.read();
        let task = tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(completion::current_due_occurrence(task, now).cloned())
    }

    pub fn next_pending(&self, id: &str) -> Result<Option<OccurrenceRecord>> {
        let tasks = self.tasks.read();
        let task = tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(completion::next_pending_occurrence(task).cloned())
    }

    /// Collects reminders that are due and hands them to the notification sink, if any.
    pub fn dispatch_reminders(
        &self,
        now: DateTime<FixedOffset>,
        lead: Duration,
    ) -> Vec<NotificationRequest> {
        let reminders: Vec<NotificationRequest> = self
            .tasks
            .read()
            .iter()
            .filter_map(|task| notifications::reminder_due(task, now, lead))
            .collect();
        if let Some(sink) = &self.notification_sink {
            for reminder in &reminders {
                sink.schedule(reminder.clone());
            }
        }
        reminders
    }

    /// Watches the directory holding the task file and flags the in-memory
    /// list as stale whenever that file is created, modified or removed.
    /// A no-op for stores without a backing file.
    pub fn watch(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let Some(location) = self.store.location() else {
            return Ok(());
        };
        let target = match location.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        let file_name = location.file_name().map(OsStr::to_os_string);
        let stale = Arc::clone(&self.stale);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) if touches_task_file(&event, file_name.as_deref()) => {
                    tracing::debug!(?event, "task store changed on disk");
                    stale.store(true, Ordering::SeqCst);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "task store watcher failed"),
            })?;
        watcher.watch(&target, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// True once the watcher has seen the task file change since the last reload.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Reloads from the store if the task file changed. Returns whether a
    /// reload happened; on failure the list stays flagged as stale.
    pub fn refresh_if_stale(&self) -> Result<bool> {
        if !self.stale.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        if let Err(err) = self.reload() {
            self.stale.store(true, Ordering::SeqCst);
            return Err(err);
        }
        tracing::info!("reloaded tasks after external change");
        Ok(true)
    }
}

fn touches_task_file(event: &Event, file_name: Option<&OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name))
}

fn not_found(id: &str) -> CadenceError {
    CadenceError::NotFound { id: id.to_string() }
}
