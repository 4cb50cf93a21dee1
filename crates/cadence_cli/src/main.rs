mod config;

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use cadence_core::{
    completion::next_pending_occurrence,
    notifications::{NotificationRequest, NotificationSink},
    task::RecurringTask,
    TaskService,
};
use chrono::{DateTime, FixedOffset, Local};
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

const USAGE: &str = "usage: cadence <list | complete <task-id> | sweep | remind | watch>";

/// Delivers reminders to the log; desktop notifiers plug in through the same trait.
/// Each occurrence is announced once per process.
#[derive(Default)]
struct LogSink {
    announced: Mutex<HashSet<(String, DateTime<FixedOffset>)>>,
}

impl NotificationSink for LogSink {
    fn schedule(&self, notification: NotificationRequest) {
        let key = (notification.task_id.clone(), notification.scheduled_for);
        if !self.announced.lock().insert(key) {
            return;
        }
        info!(
            task_id = %notification.task_id,
            title = %notification.title,
            at = %notification.scheduled_for,
            "{}",
            notification.body
        );
    }

    fn clear_for_task(&self, task: &RecurringTask) {
        info!(task_id = %task.id, "clearing reminders");
        self.announced.lock().retain(|(id, _)| id != &task.id);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let config = AppConfig::from_env().unwrap_or_default();
    if let Err(err) = run(config, std::env::args().skip(1).collect()) {
        eprintln!("cadence: {err:#}");
        std::process::exit(1);
    }
}

fn run(config: AppConfig, args: Vec<String>) -> Result<()> {
    let mut service = TaskService::builder()
        .with_json_file(&config.tasks_file)
        .with_notification_sink(Box::new(LogSink::default()))
        .build()
        .with_context(|| format!("failed to load {}", config.tasks_file.display()))?;
    let now = Local::now().fixed_offset();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["list"] => {
            for task in service.tasks() {
                println!("{}", describe(&task));
            }
        }
        ["complete", id] => {
            let outcome = service
                .complete(id, now)
                .with_context(|| format!("unable to complete `{id}`"))?;
            let task = service.get(id)?;
            println!("{outcome:?}: {}", describe(&task));
        }
        ["sweep"] => {
            let swept = service.sweep_missed(now).context("missed sweep failed")?;
            println!("{swept} occurrence(s) marked missed");
        }
        ["remind"] => {
            let reminders = service.dispatch_reminders(now, config.reminder_lead());
            for reminder in &reminders {
                println!("{} - {}", reminder.title, reminder.body);
            }
        }
        ["watch"] => {
            service.watch().context("unable to watch the task file")?;
            info!(path = %config.tasks_file.display(), "watching for changes");
            loop {
                match service.refresh_if_stale() {
                    Ok(_) => {
                        let now = Local::now().fixed_offset();
                        service.sweep_missed(now).context("missed sweep failed")?;
                        service.dispatch_reminders(now, config.reminder_lead());
                    }
                    Err(err) => warn!(%err, "task file unreadable, skipping this tick"),
                }
                std::thread::sleep(config.poll_interval());
            }
        }
        _ => bail!(USAGE),
    }
    Ok(())
}

fn describe(task: &RecurringTask) -> String {
    let progress = if task.recurring_max_count > 0 {
        format!("{}/{}", task.completion_count, task.recurring_max_count)
    } else {
        task.completion_count.to_string()
    };
    let next = next_pending_occurrence(task)
        .map(|record| record.scheduled_time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<12} {:<10} done {:<6} next {}  {}",
        task.id,
        format!("{:?}", task.status).to_lowercase(),
        progress,
        next,
        task.name
    )
}
