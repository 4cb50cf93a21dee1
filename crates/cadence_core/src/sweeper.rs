use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::task::RecurringTask;

/// Marks every pending occurrence whose event window ended before `now` as missed.
///
/// Returns how many occurrences changed. Counters, task status and the
/// occurrence list length are left alone.
pub fn sweep_missed(task: &mut RecurringTask, now: DateTime<FixedOffset>) -> usize {
    let duration = task.event_duration();
    let mut swept = 0;
    for record in task
        .occurrence_history
        .iter_mut()
        .filter(|record| record.is_pending())
    {
        if record.window_end(duration) < now {
            debug!(task_id = %task.id, scheduled = %record.scheduled_time, "occurrence missed");
            record.mark_missed();
            swept += 1;
        }
    }
    swept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{complete, CompletionOutcome};
    use crate::initializer::seed;
    use crate::task::{RecurringType, TaskStatus};

    fn ts(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    fn gym() -> RecurringTask {
        let mut task = RecurringTask::recurring(
            "gym",
            "Gym",
            RecurringType::Weekly,
            ts("2025-01-06T18:00:00+00:00"),
        )
        .with_weekdays([1, 3, 5])
        .with_event_duration(60);
        seed(&mut task, ts("2025-01-05T12:00:00+00:00")).unwrap();
        task
    }

    #[test]
    fn respects_event_duration() {
        let mut task = gym();
        // Monday's session runs until 19:00.
        assert_eq!(sweep_missed(&mut task, ts("2025-01-06T19:00:00+00:00")), 0);
        assert_eq!(sweep_missed(&mut task, ts("2025-01-06T19:00:01+00:00")), 1);
        assert!(task.occurrence_history[0].is_missed());
        assert!(task.occurrence_history[1].is_pending());
    }

    #[test]
    fn second_sweep_is_a_no_op() {
        let mut task = gym();
        let now = ts("2025-01-09T00:00:00+00:00");
        assert_eq!(sweep_missed(&mut task, now), 2);
        let snapshot = task.clone();
        assert_eq!(sweep_missed(&mut task, now), 0);
        assert_eq!(task, snapshot);
    }

    #[test]
    fn leaves_counters_and_status_alone() {
        let mut task = gym();
        sweep_missed(&mut task, ts("2025-02-01T00:00:00+00:00"));
        assert_eq!(task.completion_count, 0);
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.occurrence_history.len(), 3);
        assert!(task.occurrence_history.iter().all(|record| record.is_missed()));
    }

    #[test]
    fn completion_after_sweep_moves_to_next_pending() {
        let mut task = gym();
        assert_eq!(sweep_missed(&mut task, ts("2025-01-07T00:00:00+00:00")), 1);
        let outcome = complete(&mut task, ts("2025-01-08T18:30:00+00:00")).unwrap();
        assert_eq!(outcome, CompletionOutcome::SubOccurrenceAdvanced);
        assert!(task.occurrence_history[1].is_completed());
        assert_eq!(task.end_time, ts("2025-01-10T18:00:00+00:00"));
    }
}
