use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use tracing::{debug, info};

use crate::error::{CadenceError, Result};
use crate::generator::{at_local, parse_weekdays, week_start, weekday_batch};
use crate::occurrence::OccurrenceRecord;
use crate::task::{RecurringTask, TaskStatus};

/// Builds the first period of occurrences for a freshly created recurring task.
///
/// `task.end_time` is the caller's first scheduled time. Weekday-constrained
/// weekly tasks get one occurrence per listed weekday of the week containing
/// it, minus days already behind `now`; every other task gets a single
/// occurrence at `end_time`.
pub fn initialize(
    task: &RecurringTask,
    now: DateTime<FixedOffset>,
) -> Result<Vec<OccurrenceRecord>> {
    if !task.uses_weekday_periods() {
        return Ok(vec![OccurrenceRecord::pending(task.end_time)]);
    }

    let weekdays = parse_weekdays(&task.recurring_weekdays)?;
    let offset = *task.end_time.offset();
    let time_of_day = task.end_time.time();
    let sunday = week_start(task.end_time)?.date_naive();
    let today = at_local(
        now.with_timezone(&offset).date_naive(),
        NaiveTime::MIN,
        offset,
    )?;

    let mut batch: Vec<DateTime<FixedOffset>> =
        weekday_batch(sunday, &weekdays, time_of_day, offset)?
            .into_iter()
            .filter(|at| {
                let keep = *at >= today;
                if !keep {
                    debug!(%at, "skipping weekday already behind today");
                }
                keep
            })
            .collect();

    if batch.is_empty() {
        debug!(task_id = %task.id, "current week already passed, seeding the following week");
        batch = weekday_batch(sunday + Duration::days(7), &weekdays, time_of_day, offset)?;
    }

    Ok(batch.into_iter().map(OccurrenceRecord::pending).collect())
}

/// Applies creation defaults and assigns the initial occurrence history.
pub fn seed(task: &mut RecurringTask, now: DateTime<FixedOffset>) -> Result<()> {
    if !task.is_recurring {
        return Ok(());
    }
    if task.has_legacy_tracking() {
        return Err(CadenceError::UnsupportedLegacyFormat {
            id: task.id.clone(),
        });
    }
    match task.recurring_interval {
        None => task.recurring_interval = Some(1),
        Some(0) => {
            return Err(CadenceError::InvalidConfiguration(format!(
                "task `{}` has a zero recurrence interval",
                task.id
            )))
        }
        Some(_) => {}
    }
    if task.status == TaskStatus::Pending {
        task.status = TaskStatus::Active;
    }

    let history = initialize(task, now)?;
    if let Some(first) = history.first() {
        task.set_next_actionable(first.scheduled_time);
    }
    info!(
        task_id = %task.id,
        occurrences = history.len(),
        end_time = %task.end_time,
        "seeded occurrence history"
    );
    task.occurrence_history = history;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RecurringType;

    fn ts(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn scheduled(history: &[OccurrenceRecord]) -> Vec<DateTime<FixedOffset>> {
        history.iter().map(|record| record.scheduled_time).collect()
    }

    #[test]
    fn single_occurrence_for_plain_types() {
        let task = RecurringTask::recurring(
            "daily",
            "Stretch",
            RecurringType::Daily,
            ts("2025-01-01T09:00:00+00:00"),
        );
        let history = initialize(&task, ts("2024-12-31T20:00:00+00:00")).unwrap();
        assert_eq!(scheduled(&history), vec![ts("2025-01-01T09:00:00+00:00")]);
        assert!(history[0].is_pending());
    }

    #[test]
    fn weekday_batch_covers_whole_week_when_created_on_sunday() {
        let task = RecurringTask::recurring(
            "gym",
            "Gym",
            RecurringType::Weekly,
            ts("2025-01-08T18:00:00+01:00"),
        )
        .with_weekdays([5, 1, 3]);
        let history = initialize(&task, ts("2025-01-05T10:00:00+01:00")).unwrap();
        assert_eq!(
            scheduled(&history),
            vec![
                ts("2025-01-06T18:00:00+01:00"),
                ts("2025-01-08T18:00:00+01:00"),
                ts("2025-01-10T18:00:00+01:00"),
            ]
        );
    }

    #[test]
    fn weekday_batch_skips_days_before_today_but_keeps_today() {
        let task = RecurringTask::recurring(
            "gym",
            "Gym",
            RecurringType::Weekly,
            ts("2025-01-08T06:00:00+00:00"),
        )
        .with_weekdays([1, 3, 5]);
        // Wednesday evening: Monday is gone, Wednesday's slot has passed but is still today.
        let history = initialize(&task, ts("2025-01-08T20:00:00+00:00")).unwrap();
        assert_eq!(
            scheduled(&history),
            vec![ts("2025-01-08T06:00:00+00:00"), ts("2025-01-10T06:00:00+00:00")]
        );
    }

    #[test]
    fn weekday_batch_rolls_to_next_week_when_current_week_is_spent() {
        let task = RecurringTask::recurring(
            "gym",
            "Gym",
            RecurringType::Weekly,
            ts("2025-01-06T06:00:00+00:00"),
        )
        .with_weekdays([1, 3]);
        let history = initialize(&task, ts("2025-01-11T12:00:00+00:00")).unwrap();
        assert_eq!(
            scheduled(&history),
            vec![ts("2025-01-13T06:00:00+00:00"), ts("2025-01-15T06:00:00+00:00")]
        );
    }

    #[test]
    fn seed_defaults_interval_and_syncs_end_time() {
        let mut task = RecurringTask::recurring(
            "gym",
            "Gym",
            RecurringType::Weekly,
            ts("2025-01-06T06:00:00+00:00"),
        )
        .with_weekdays([1, 3]);
        seed(&mut task, ts("2025-01-07T12:00:00+00:00")).unwrap();
        assert_eq!(task.recurring_interval, Some(1));
        assert_eq!(task.occurrence_history.len(), 1);
        assert_eq!(task.end_time, ts("2025-01-08T06:00:00+00:00"));
        assert_eq!(task.due_date, Some(task.end_time));
    }

    #[test]
    fn seed_rejects_zero_interval_and_legacy_data() {
        let start = ts("2025-01-06T06:00:00+00:00");
        let mut zero =
            RecurringTask::recurring("z", "z", RecurringType::Daily, start).with_interval(0);
        assert!(matches!(
            seed(&mut zero, start),
            Err(CadenceError::InvalidConfiguration(_))
        ));

        let mut legacy = RecurringTask::recurring("l", "l", RecurringType::Daily, start);
        legacy.current_period_completions = Some(vec!["2025-01-06".into()]);
        assert!(matches!(
            seed(&mut legacy, start),
            Err(CadenceError::UnsupportedLegacyFormat { .. })
        ));
    }
}
