//! Calendar arithmetic for producing the next occurrence of a recurring task.
//!
//! Month and year steps clamp the day of month to the last valid day of the
//! target month: 2025-01-31 plus one month is 2025-02-28, and 2024-02-29 plus
//! one year is 2025-02-28. This is the rule `NaiveDate::checked_add_months`
//! applies; a year step is twelve month steps. All arithmetic happens in the
//! anchor's own offset.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Weekday,
};
use tracing::{debug, warn};

use crate::error::{CadenceError, Result};
use crate::task::RecurringType;

/// Computes the occurrence that follows `anchor`.
pub fn next_occurrence(
    anchor: DateTime<FixedOffset>,
    recurring_type: RecurringType,
    interval: u32,
    weekdays: &[u8],
) -> Result<DateTime<FixedOffset>> {
    if interval == 0 && recurring_type != RecurringType::Unknown {
        return Err(CadenceError::InvalidConfiguration(
            "recurrence interval must be at least 1".into(),
        ));
    }

    let next = match recurring_type {
        RecurringType::Daily => add_days(anchor, i64::from(interval))?,
        RecurringType::Weekly if weekdays.is_empty() => add_days(anchor, i64::from(interval) * 7)?,
        RecurringType::Weekly => next_matching_weekday(anchor, &parse_weekdays(weekdays)?)?,
        RecurringType::Monthly => shift_months(anchor, interval)?,
        RecurringType::Yearly => shift_years(anchor, interval)?,
        RecurringType::Unknown => {
            warn!(%anchor, "unknown recurrence type, falling back to daily");
            add_days(anchor, 1)?
        }
    };
    debug!(%anchor, %next, ?recurring_type, interval, "computed next occurrence");
    Ok(next)
}

/// Converts stored weekday numbers (0 = Sunday) into sorted, de-duplicated weekdays.
pub fn parse_weekdays(raw: &[u8]) -> Result<Vec<Weekday>> {
    let mut days = raw
        .iter()
        .map(|&value| weekday_from_sunday_index(value))
        .collect::<Result<Vec<_>>>()?;
    days.sort_by_key(Weekday::num_days_from_sunday);
    days.dedup();
    Ok(days)
}

fn weekday_from_sunday_index(value: u8) -> Result<Weekday> {
    let day = match value {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        other => {
            return Err(CadenceError::InvalidConfiguration(format!(
                "weekday {other} is outside 0..=6"
            )))
        }
    };
    Ok(day)
}

/// Sunday 00:00 of the calendar week containing `at`, in the same offset.
pub fn week_start(at: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    let date = at.date_naive();
    let sunday = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
    at_local(sunday, NaiveTime::MIN, *at.offset())
}

/// One timestamp per weekday of the week starting on `sunday`, in calendar order.
pub fn weekday_batch(
    sunday: NaiveDate,
    weekdays: &[Weekday],
    time_of_day: NaiveTime,
    offset: FixedOffset,
) -> Result<Vec<DateTime<FixedOffset>>> {
    if weekdays.is_empty() {
        return Err(CadenceError::InvalidConfiguration(
            "weekday batch requested with an empty weekday set".into(),
        ));
    }
    weekdays
        .iter()
        .map(|day| {
            let date = sunday + Duration::days(i64::from(day.num_days_from_sunday()));
            at_local(date, time_of_day, offset)
        })
        .collect()
}

pub(crate) fn at_local(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| {
            CadenceError::InvalidConfiguration(format!("{date} {time} is not representable"))
        })
}

fn next_matching_weekday(
    anchor: DateTime<FixedOffset>,
    weekdays: &[Weekday],
) -> Result<DateTime<FixedOffset>> {
    for offset in 1..=7 {
        let candidate = add_days(anchor, offset)?;
        if weekdays.contains(&candidate.weekday()) {
            return Ok(candidate);
        }
    }
    add_days(anchor, 7)
}

fn add_days(anchor: DateTime<FixedOffset>, days: i64) -> Result<DateTime<FixedOffset>> {
    anchor
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| out_of_range(anchor))
}

fn shift_months(anchor: DateTime<FixedOffset>, months: u32) -> Result<DateTime<FixedOffset>> {
    let date = anchor
        .date_naive()
        .checked_add_months(Months::new(months))
        .ok_or_else(|| out_of_range(anchor))?;
    at_local(date, anchor.time(), *anchor.offset())
}

fn shift_years(anchor: DateTime<FixedOffset>, years: u32) -> Result<DateTime<FixedOffset>> {
    let months = years.checked_mul(12).ok_or_else(|| out_of_range(anchor))?;
    shift_months(anchor, months)
}

fn out_of_range(anchor: DateTime<FixedOffset>) -> CadenceError {
    CadenceError::InvalidConfiguration(format!("next occurrence after {anchor} is out of range"))
}
