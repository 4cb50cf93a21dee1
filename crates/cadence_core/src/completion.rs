//! The state machine run when a user completes a task.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CadenceError, Result};
use crate::generator::{next_occurrence, parse_weekdays, week_start, weekday_batch};
use crate::occurrence::OccurrenceRecord;
use crate::period::{current_week, is_period_complete};
use crate::task::{RecurringTask, RecurringType, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionOutcome {
    /// A whole period resolved and the next one was generated.
    PeriodAdvanced,
    /// The task reached its final state; nothing further is generated.
    TaskFinished,
    /// One occurrence of a weekday period was completed, others remain.
    SubOccurrenceAdvanced,
}

/// First pending occurrence that is already due at `now`, in history order.
pub fn current_due_occurrence(
    task: &RecurringTask,
    now: DateTime<FixedOffset>,
) -> Option<&OccurrenceRecord> {
    task.occurrence_history
        .iter()
        .find(|record| record.is_pending() && record.scheduled_time <= now)
}

/// Earliest pending occurrence regardless of time.
pub fn next_pending_occurrence(task: &RecurringTask) -> Option<&OccurrenceRecord> {
    task.occurrence_history
        .iter()
        .filter(|record| record.is_pending())
        .min_by_key(|record| record.scheduled_time)
}

/// Completes the occurrence that is due (or the earliest pending one) and
/// advances the task.
///
/// The task is only modified when the whole transition succeeds.
pub fn complete(task: &mut RecurringTask, now: DateTime<FixedOffset>) -> Result<CompletionOutcome> {
    if !task.is_recurring {
        task.status = TaskStatus::Completed;
        info!(task_id = %task.id, "completed one-off task");
        return Ok(CompletionOutcome::TaskFinished);
    }
    if task.has_legacy_tracking() {
        return Err(CadenceError::UnsupportedLegacyFormat {
            id: task.id.clone(),
        });
    }
    if task.status != TaskStatus::Active {
        return Err(CadenceError::Inactive {
            id: task.id.clone(),
            status: task.status,
        });
    }
    if task.interval() == 0 && task.recurring_type() != RecurringType::Unknown {
        return Err(CadenceError::InvalidConfiguration(format!(
            "task `{}` has a zero recurrence interval",
            task.id
        )));
    }

    let mut draft = task.clone();
    let index = locate_occurrence(&draft, now).ok_or_else(|| CadenceError::NoPendingOccurrence {
        id: draft.id.clone(),
    })?;
    draft.occurrence_history[index].mark_completed(now);
    let scheduled = draft.occurrence_history[index].scheduled_time;
    debug!(task_id = %draft.id, %scheduled, "marked occurrence completed");

    let outcome = if draft.uses_weekday_periods() {
        advance_weekday_period(&mut draft, scheduled, now)?
    } else {
        advance_single_period(&mut draft)?
    };
    *task = draft;
    Ok(outcome)
}

fn locate_occurrence(task: &RecurringTask, now: DateTime<FixedOffset>) -> Option<usize> {
    task.occurrence_history
        .iter()
        .position(|record| record.is_pending() && record.scheduled_time <= now)
        .or_else(|| {
            task.occurrence_history
                .iter()
                .enumerate()
                .filter(|(_, record)| record.is_pending())
                .min_by_key(|(_, record)| record.scheduled_time)
                .map(|(idx, _)| idx)
        })
}

/// `scheduled` is the slot that was just completed; the period evaluated is
/// the week containing it, so finishing next week's slot early never closes
/// the current one a second time.
fn advance_weekday_period(
    task: &mut RecurringTask,
    scheduled: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
) -> Result<CompletionOutcome> {
    let resolved = is_period_complete(task, scheduled)?;
    if !resolved {
        if let Some(next) = next_pending_occurrence(task).map(|record| record.scheduled_time) {
            task.set_next_actionable(next);
            debug!(task_id = %task.id, %next, "weekday period still open");
            return Ok(CompletionOutcome::SubOccurrenceAdvanced);
        }
        debug!(task_id = %task.id, "no pending occurrence left, closing weekday period");
    }

    task.completion_count += 1;
    if finish_if_exhausted(task) {
        return Ok(CompletionOutcome::TaskFinished);
    }

    let weekdays = parse_weekdays(&task.recurring_weekdays)?;
    let next_sunday = next_batch_sunday(task, now)?;
    let batch = weekday_batch(
        next_sunday.date_naive(),
        &weekdays,
        task.end_time.time(),
        *task.end_time.offset(),
    )?;
    let first = batch.first().copied().ok_or_else(|| {
        CadenceError::InvalidConfiguration(format!("task `{}` produced an empty week", task.id))
    })?;
    task.occurrence_history
        .extend(batch.into_iter().map(OccurrenceRecord::pending));
    task.set_next_actionable(first);
    info!(
        task_id = %task.id,
        completion_count = task.completion_count,
        next = %first,
        "weekday period resolved"
    );
    Ok(CompletionOutcome::PeriodAdvanced)
}

/// Sunday after the week containing `now`, pushed later if occurrences
/// already exist beyond it.
fn next_batch_sunday(
    task: &RecurringTask,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>> {
    let (_, after_now) = current_week(task, now)?;
    let latest = task
        .occurrence_history
        .iter()
        .map(|record| record.scheduled_time)
        .max();
    match latest {
        Some(latest) if latest >= after_now => {
            Ok(week_start(latest.with_timezone(after_now.offset()))? + Duration::days(7))
        }
        _ => Ok(after_now),
    }
}

fn advance_single_period(task: &mut RecurringTask) -> Result<CompletionOutcome> {
    task.completion_count += 1;
    if finish_if_exhausted(task) {
        return Ok(CompletionOutcome::TaskFinished);
    }

    let next = next_occurrence(
        task.end_time,
        task.recurring_type(),
        task.interval(),
        &task.recurring_weekdays,
    )?;
    task.occurrence_history.push(OccurrenceRecord::pending(next));
    task.set_next_actionable(next);
    info!(
        task_id = %task.id,
        completion_count = task.completion_count,
        %next,
        "period completed"
    );
    Ok(CompletionOutcome::PeriodAdvanced)
}

fn finish_if_exhausted(task: &mut RecurringTask) -> bool {
    if !task.max_count_reached() {
        return false;
    }
    task.status = TaskStatus::Completed;
    info!(
        task_id = %task.id,
        completion_count = task.completion_count,
        "recurring task reached its maximum count"
    );
    true
}
