use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

/// One scheduled instance of a recurring task.
///
/// On disk the record keeps the flat `status` / `completedAt` pair; in memory
/// the completion time lives inside [`OccurrenceStatus::Completed`] so it can
/// never be set for any other status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OccurrenceRecordRepr", into = "OccurrenceRecordRepr")]
pub struct OccurrenceRecord {
    pub scheduled_time: DateTime<FixedOffset>,
    pub status: OccurrenceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceStatus {
    Pending,
    Completed { at: DateTime<FixedOffset> },
    Missed,
    Skipped,
}

impl OccurrenceRecord {
    pub fn pending(scheduled_time: DateTime<FixedOffset>) -> Self {
        Self {
            scheduled_time,
            status: OccurrenceStatus::Pending,
            notes: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, OccurrenceStatus::Pending)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, OccurrenceStatus::Completed { .. })
    }

    pub fn is_missed(&self) -> bool {
        matches!(self.status, OccurrenceStatus::Missed)
    }

    pub fn completed_at(&self) -> Option<DateTime<FixedOffset>> {
        match self.status {
            OccurrenceStatus::Completed { at } => Some(at),
            _ => None,
        }
    }

    /// End of the event window that starts at `scheduled_time`.
    pub fn window_end(&self, event_duration: Duration) -> DateTime<FixedOffset> {
        self.scheduled_time + event_duration
    }

    pub(crate) fn mark_completed(&mut self, at: DateTime<FixedOffset>) {
        self.status = OccurrenceStatus::Completed { at };
    }

    pub(crate) fn mark_missed(&mut self) {
        self.status = OccurrenceStatus::Missed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StatusTag {
    Pending,
    Completed,
    Missed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OccurrenceRecordRepr {
    scheduled_time: DateTime<FixedOffset>,
    status: StatusTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl TryFrom<OccurrenceRecordRepr> for OccurrenceRecord {
    type Error = String;

    fn try_from(repr: OccurrenceRecordRepr) -> Result<Self, Self::Error> {
        let status = match (repr.status, repr.completed_at) {
            (StatusTag::Completed, Some(at)) => OccurrenceStatus::Completed { at },
            (StatusTag::Completed, None) => {
                return Err(format!(
                    "completed occurrence at {} is missing completedAt",
                    repr.scheduled_time
                ))
            }
            (tag, Some(_)) => {
                return Err(format!(
                    "occurrence at {} has completedAt but status {:?}",
                    repr.scheduled_time, tag
                ))
            }
            (StatusTag::Pending, None) => OccurrenceStatus::Pending,
            (StatusTag::Missed, None) => OccurrenceStatus::Missed,
            (StatusTag::Skipped, None) => OccurrenceStatus::Skipped,
        };
        Ok(Self {
            scheduled_time: repr.scheduled_time,
            status,
            notes: repr.notes,
        })
    }
}

impl From<OccurrenceRecord> for OccurrenceRecordRepr {
    fn from(record: OccurrenceRecord) -> Self {
        let (status, completed_at) = match record.status {
            OccurrenceStatus::Pending => (StatusTag::Pending, None),
            OccurrenceStatus::Completed { at } => (StatusTag::Completed, Some(at)),
            OccurrenceStatus::Missed => (StatusTag::Missed, None),
            OccurrenceStatus::Skipped => (StatusTag::Skipped, None),
        };
        Self {
            scheduled_time: record.scheduled_time,
            status,
            completed_at,
            notes: record.notes,
        }
    }
}
