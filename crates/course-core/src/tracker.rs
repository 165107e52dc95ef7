use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Serialize;

use crate::schedule::CourseSchedule;

/// How a single calendar day renders against a course schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClassification {
    Completed,
    Holiday,
    Upcoming,
    OutOfRange,
}

impl DayClassification {
    pub fn as_key(self) -> &'static str {
        match self {
            DayClassification::Completed => "completed",
            DayClassification::Holiday => "holiday",
            DayClassification::Upcoming => "upcoming",
            DayClassification::OutOfRange => "out_of_range",
        }
    }
}

impl fmt::Display for DayClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for DayClassification {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" | "done" => Ok(DayClassification::Completed),
            "holiday" => Ok(DayClassification::Holiday),
            "upcoming" => Ok(DayClassification::Upcoming),
            "out_of_range" | "out-of-range" => Ok(DayClassification::OutOfRange),
            other => Err(anyhow!("unknown day classification: {other}")),
        }
    }
}

/// Every calendar date from `start` to `end` inclusive. Empty when
/// `start > end`.
pub fn enumerate_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Holiday membership is checked before range and clock, so an elapsed
/// holiday stays a holiday.
pub fn classify(date: NaiveDate, schedule: &CourseSchedule, today: NaiveDate) -> DayClassification {
    if schedule.is_holiday(date) {
        DayClassification::Holiday
    } else if !schedule.contains(date) {
        DayClassification::OutOfRange
    } else if date <= today {
        DayClassification::Completed
    } else {
        DayClassification::Upcoming
    }
}

pub fn count_completed(schedule: &CourseSchedule, today: NaiveDate) -> usize {
    if schedule.is_empty() || today < schedule.start() {
        return 0;
    }

    let last = schedule.end().min(today);
    enumerate_dates(schedule.start(), last)
        .filter(|day| !schedule.is_holiday(*day))
        .count()
}

/// Calendar days in the course, holidays included. Reversed ranges count 0.
pub fn count_total(schedule: &CourseSchedule) -> usize {
    let days = schedule
        .end()
        .signed_duration_since(schedule.start())
        .num_days()
        + 1;
    usize::try_from(days).unwrap_or(0)
}

pub fn holiday_count(schedule: &CourseSchedule) -> usize {
    schedule.holidays().len()
}

/// The aggregate numbers shown above the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_days: usize,
    pub completed_days: usize,
    pub holidays: usize,
    pub remaining_days: usize,
    pub percent_complete: f64,
}

impl ProgressSummary {
    #[tracing::instrument(skip(schedule))]
    pub fn compute(schedule: &CourseSchedule, today: NaiveDate) -> Self {
        let total_days = count_total(schedule);
        let completed_days = count_completed(schedule, today);
        let holidays = holiday_count(schedule);

        let teaching_days = total_days.saturating_sub(holidays);
        let remaining_days = teaching_days.saturating_sub(completed_days);
        let percent_complete = if teaching_days == 0 {
            0.0
        } else {
            completed_days as f64 * 100.0 / teaching_days as f64
        };

        tracing::debug!(
            total_days,
            completed_days,
            holidays,
            remaining_days,
            "computed course progress"
        );

        Self {
            total_days,
            completed_days,
            holidays,
            remaining_days,
            percent_complete,
        }
    }
}
