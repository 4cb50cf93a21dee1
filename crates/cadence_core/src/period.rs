use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::error::Result;
use crate::generator::week_start;
use crate::task::RecurringTask;

/// Half-open calendar week `[sunday 00:00, next sunday 00:00)` containing `now`,
/// expressed in the task's own offset.
pub fn current_week(
    task: &RecurringTask,
    now: DateTime<FixedOffset>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = week_start(now.with_timezone(task.end_time.offset()))?;
    Ok((start, start + Duration::days(7)))
}

/// Whether the weekday period containing `at` is resolved: nothing in it is
/// still pending and at least one occurrence was completed.
///
/// Only weekday-constrained weekly tasks have multi-occurrence periods; every
/// other configuration returns `false`.
pub fn is_period_complete(task: &RecurringTask, at: DateTime<FixedOffset>) -> Result<bool> {
    if !task.uses_weekday_periods() {
        return Ok(false);
    }
    let (start, end) = current_week(task, at)?;
    let (pending, completed) = task
        .occurrence_history
        .iter()
        .filter(|record| record.scheduled_time >= start && record.scheduled_time < end)
        .fold((0usize, 0usize), |(pending, completed), record| {
            (
                pending + usize::from(record.is_pending()),
                completed + usize::from(record.is_completed()),
            )
        });
    debug!(task_id = %task.id, %start, pending, completed, "evaluated weekday period");
    Ok(pending == 0 && completed > 0)
}
