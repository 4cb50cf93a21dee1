use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::occurrence::OccurrenceRecord;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurringType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Anything else found on disk. The generator falls back to daily.
    #[serde(other)]
    Unknown,
}

/// Recurring tasks move through `Active | Completed | Paused | Cancelled`;
/// one-off tasks only use `Pending | Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
    Paused,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTask {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_type: Option<RecurringType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<u32>,
    #[serde(default)]
    pub recurring_weekdays: Vec<u8>,
    #[serde(default)]
    pub recurring_max_count: u32,
    #[serde(default)]
    pub completion_count: u32,
    pub status: TaskStatus,
    /// Next actionable occurrence.
    pub end_time: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<FixedOffset>>,
    /// Minutes.
    #[serde(default)]
    pub event_duration: u32,
    #[serde(default)]
    pub occurrence_history: Vec<OccurrenceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_completions: Option<Vec<String>>,
    /// Fields owned by other parts of the task record, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecurringTask {
    pub fn recurring(
        id: impl Into<String>,
        name: impl Into<String>,
        recurring_type: RecurringType,
        first_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_recurring: true,
            recurring_type: Some(recurring_type),
            recurring_interval: None,
            recurring_weekdays: Vec::new(),
            recurring_max_count: 0,
            completion_count: 0,
            status: TaskStatus::Active,
            end_time: first_time,
            due_date: None,
            event_duration: 0,
            occurrence_history: Vec::new(),
            current_period_completions: None,
            extra: Map::new(),
        }
    }

    pub fn one_off(
        id: impl Into<String>,
        name: impl Into<String>,
        end_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            is_recurring: false,
            recurring_type: None,
            status: TaskStatus::Pending,
            ..Self::recurring(id, name, RecurringType::Daily, end_time)
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.recurring_interval = Some(interval);
        self
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = u8>) -> Self {
        self.recurring_weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.recurring_max_count = max_count;
        self
    }

    pub fn with_event_duration(mut self, minutes: u32) -> Self {
        self.event_duration = minutes;
        self
    }

    pub fn interval(&self) -> u32 {
        self.recurring_interval.unwrap_or(1)
    }

    pub fn recurring_type(&self) -> RecurringType {
        self.recurring_type.unwrap_or(RecurringType::Unknown)
    }

    /// Weekly tasks restricted to specific weekdays treat each calendar week as one period.
    pub fn uses_weekday_periods(&self) -> bool {
        self.is_recurring
            && self.recurring_type == Some(RecurringType::Weekly)
            && !self.recurring_weekdays.is_empty()
    }

    pub fn event_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.event_duration))
    }

    pub fn max_count_reached(&self) -> bool {
        self.recurring_max_count > 0 && self.completion_count >= self.recurring_max_count
    }

    pub fn has_legacy_tracking(&self) -> bool {
        self.current_period_completions.is_some()
    }

    pub(crate) fn set_next_actionable(&mut self, at: DateTime<FixedOffset>) {
        self.end_time = at;
        self.due_date = Some(at);
    }
}
