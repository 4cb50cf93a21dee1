use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::completion::next_pending_occurrence;
use crate::task::{RecurringTask, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRequest {
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub scheduled_for: DateTime<FixedOffset>,
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, notification: NotificationRequest);
    fn clear_for_task(&self, task: &RecurringTask);
}

/// Returns a reminder when the task's next actionable time falls inside
/// `[scheduled - lead, scheduled + event duration]`.
pub fn reminder_due(
    task: &RecurringTask,
    now: DateTime<FixedOffset>,
    lead: Duration,
) -> Option<NotificationRequest> {
    let scheduled_for = if task.is_recurring {
        if task.status != TaskStatus::Active {
            return None;
        }
        next_pending_occurrence(task)?.scheduled_time
    } else {
        if task.status != TaskStatus::Pending {
            return None;
        }
        task.end_time
    };

    let opens = scheduled_for - lead;
    let closes = scheduled_for + task.event_duration();
    if now < opens || now > closes {
        return None;
    }

    let body = if now < scheduled_for {
        format!("Starts at {}", scheduled_for.format("%Y-%m-%d %H:%M"))
    } else {
        format!("Due since {}", scheduled_for.format("%Y-%m-%d %H:%M"))
    };
    Some(NotificationRequest {
        task_id: task.id.clone(),
        title: task.name.clone(),
        body,
        scheduled_for,
    })
}
