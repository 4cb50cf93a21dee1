use std::fs;

use cadence_core::{
    task::{RecurringTask, RecurringType, TaskStatus},
    CadenceError, CompletionOutcome, TaskService,
};
use chrono::{DateTime, Duration, FixedOffset};
use tempfile::tempdir;

fn ts(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).expect("valid timestamp")
}

#[test]
fn completions_survive_reload_from_disk() {
    let temp = tempdir().expect("tempdir");
    let tasks_file = temp.path().join("data/tasks.json");

    let service = TaskService::builder()
        .with_json_file(&tasks_file)
        .build()
        .expect("build task service");

    service
        .create(
            RecurringTask::recurring(
                "journal",
                "Evening journal",
                RecurringType::Daily,
                ts("2025-01-01T21:00:00+01:00"),
            )
            .with_max_count(2),
            ts("2025-01-01T08:00:00+01:00"),
        )
        .expect("create daily task");
    service
        .create(
            RecurringTask::recurring(
                "gym",
                "Gym",
                RecurringType::Weekly,
                ts("2025-01-06T18:00:00+01:00"),
            )
            .with_weekdays([1, 3, 5])
            .with_event_duration(90),
            ts("2025-01-05T12:00:00+01:00"),
        )
        .expect("create weekly task");

    assert_eq!(
        service
            .complete("journal", ts("2025-01-01T21:30:00+01:00"))
            .expect("first completion"),
        CompletionOutcome::PeriodAdvanced
    );
    assert_eq!(
        service
            .complete("journal", ts("2025-01-02T21:10:00+01:00"))
            .expect("second completion"),
        CompletionOutcome::TaskFinished
    );
    assert_eq!(
        service
            .complete("gym", ts("2025-01-06T19:00:00+01:00"))
            .expect("monday session"),
        CompletionOutcome::SubOccurrenceAdvanced
    );
    // Wednesday's session is skipped entirely.
    assert_eq!(
        service
            .sweep_missed(ts("2025-01-09T00:00:00+01:00"))
            .expect("sweep"),
        1
    );

    let raw = fs::read_to_string(&tasks_file).expect("read tasks file");
    for field in [
        "isRecurring",
        "recurringType",
        "recurringInterval",
        "recurringWeekdays",
        "recurringMaxCount",
        "completionCount",
        "occurrenceHistory",
        "scheduledTime",
        "completedAt",
        "endTime",
        "eventDuration",
    ] {
        assert!(raw.contains(field), "persisted data should contain {field}");
    }

    drop(service);
    let reloaded = TaskService::builder()
        .with_json_file(&tasks_file)
        .build()
        .expect("reload task service");

    let gym = reloaded.get("gym").expect("gym exists");
    assert_eq!(gym.end_time, ts("2025-01-08T18:00:00+01:00"));
    assert!(gym.occurrence_history[1].is_missed());

    // Friday closes the week even though Wednesday was missed.
    assert_eq!(
        reloaded
            .complete("gym", ts("2025-01-10T18:30:00+01:00"))
            .expect("friday session"),
        CompletionOutcome::PeriodAdvanced
    );
    let gym = reloaded.get("gym").expect("gym exists");
    assert_eq!(gym.completion_count, 1);
    assert_eq!(gym.end_time, ts("2025-01-13T18:00:00+01:00"));
    assert_eq!(gym.occurrence_history.len(), 6);

    let journal = reloaded.get("journal").expect("journal exists");
    assert_eq!(journal.completion_count, 2);
    assert_eq!(journal.status, TaskStatus::Completed);
    assert_eq!(journal.end_time, ts("2025-01-02T21:00:00+01:00"));
    assert_eq!(journal.occurrence_history.len(), 2);
    assert!(journal
        .occurrence_history
        .iter()
        .all(|record| !record.is_pending()));

    let reminders =
        reloaded.dispatch_reminders(ts("2025-01-13T17:50:00+01:00"), Duration::minutes(15));
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].task_id, "gym");
}

#[test]
fn legacy_records_are_refused_not_migrated() {
    let temp = tempdir().expect("tempdir");
    let tasks_file = temp.path().join("tasks.json");
    fs::write(
        &tasks_file,
        r#"[{
            "id": "old",
            "name": "Old habit",
            "isRecurring": true,
            "recurringType": "weekly",
            "recurringWeekdays": [2, 4],
            "status": "active",
            "endTime": "2024-06-04T07:00:00+00:00",
            "currentPeriodCompletions": ["2024-06-04"]
        }]"#,
    )
    .expect("write fixture");

    let service = TaskService::builder()
        .with_json_file(&tasks_file)
        .build()
        .expect("build task service");
    let before = fs::read_to_string(&tasks_file).expect("read fixture");

    let err = service
        .complete("old", ts("2024-06-06T07:30:00+00:00"))
        .unwrap_err();
    assert!(matches!(err, CadenceError::UnsupportedLegacyFormat { .. }));
    assert_eq!(fs::read_to_string(&tasks_file).expect("reread"), before);
}
