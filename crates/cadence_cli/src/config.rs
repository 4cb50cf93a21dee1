use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) tasks_file: PathBuf,
    pub(crate) reminder_lead_minutes: i64,
    pub(crate) poll_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("CADENCE_TASKS_FILE") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                info!(path = %trimmed, "using task file from environment");
                config.tasks_file = PathBuf::from(trimmed);
            }
        }
        if let Some(lead) = lookup("CADENCE_REMINDER_LEAD_MINUTES") {
            if let Ok(value) = lead.trim().parse::<i64>() {
                config.reminder_lead_minutes = value.max(0);
            }
        }
        if let Some(poll) = lookup("CADENCE_POLL_SECONDS") {
            if let Ok(value) = poll.trim().parse::<u64>() {
                config.poll_interval_secs = value.max(1);
            }
        }
        config
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::minutes(self.reminder_lead_minutes)
    }

    /// Pause between ticks of the `watch` loop.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tasks_file: PathBuf::from("tasks.json"),
            reminder_lead_minutes: 15,
            poll_interval_secs: 60,
        }
    }
}
