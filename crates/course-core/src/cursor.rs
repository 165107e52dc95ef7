use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::schedule::CourseSchedule;

/// The month the calendar is currently showing.
///
/// Field order matters: the derived ordering compares year first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ViewCursor {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavDirection {
    Previous,
    Next,
}

impl ViewCursor {
    /// `None` unless the month is 1-12 and chrono can represent it.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        (28..=31)
            .rev()
            .find_map(|day| NaiveDate::from_ymd_opt(self.year, self.month, day))
            .unwrap_or_else(|| self.first_day())
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn succ(self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year.saturating_add(1),
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(self) -> Self {
        if self.month <= 1 {
            Self {
                year: self.year.saturating_sub(1),
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for ViewCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day().format("%B %Y"))
    }
}

impl FromStr for ViewCursor {
    type Err = anyhow::Error;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow!("expected YYYY-MM, got: {s}"))?;
        let year: i32 = year.parse().with_context(|| format!("invalid year in {s}"))?;
        let month: u32 = month.parse().with_context(|| format!("invalid month in {s}"))?;
        Self::new(year, month).ok_or_else(|| anyhow!("month out of range in {s}"))
    }
}

/// Whether a move in `direction` would stay within the course's months.
pub fn can_navigate(
    cursor: ViewCursor,
    direction: NavDirection,
    schedule: &CourseSchedule,
) -> bool {
    match direction {
        NavDirection::Previous => cursor > ViewCursor::from_date(schedule.start()),
        NavDirection::Next => cursor < ViewCursor::from_date(schedule.end()),
    }
}

/// One month in `direction`, or the unchanged cursor at a bound.
#[tracing::instrument(skip(schedule))]
pub fn navigate(
    cursor: ViewCursor,
    direction: NavDirection,
    schedule: &CourseSchedule,
) -> ViewCursor {
    if !can_navigate(cursor, direction, schedule) {
        tracing::debug!(%cursor, ?direction, "navigation blocked at course bound");
        return cursor;
    }

    match direction {
        NavDirection::Previous => cursor.pred(),
        NavDirection::Next => cursor.succ(),
    }
}

/// The month containing `today`, regardless of the course range.
pub fn reset_to_today(today: NaiveDate) -> ViewCursor {
    ViewCursor::from_date(today)
}

/// Pulls `cursor` into the course's month range. Reversed schedules
/// leave it untouched.
pub fn clamp_to_schedule(cursor: ViewCursor, schedule: &CourseSchedule) -> ViewCursor {
    if schedule.is_empty() {
        return cursor;
    }

    let first = ViewCursor::from_date(schedule.start());
    let last = ViewCursor::from_date(schedule.end());
    cursor.clamp(first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn cursor(y: i32, m: u32) -> ViewCursor {
        ViewCursor::new(y, m).expect("valid cursor")
    }

    fn year_end_course() -> CourseSchedule {
        CourseSchedule::new(day(2024, 11, 18), day(2025, 2, 7), [])
    }

    #[test]
    fn next_walks_to_end_month_then_stops() {
        let schedule = year_end_course();
        let mut current = ViewCursor::from_date(schedule.start());
        let mut seen = vec![current];
        for _ in 0..10 {
            current = navigate(current, NavDirection::Next, &schedule);
            if seen.last() != Some(&current) {
                seen.push(current);
            }
        }

        assert_eq!(
            seen,
            vec![
                cursor(2024, 11),
                cursor(2024, 12),
                cursor(2025, 1),
                cursor(2025, 2)
            ]
        );
        assert!(!can_navigate(current, NavDirection::Next, &schedule));
        assert!(can_navigate(current, NavDirection::Previous, &schedule));
    }

    #[test]
    fn previous_walks_to_start_month_then_stops() {
        let schedule = year_end_course();
        let mut current = ViewCursor::from_date(schedule.end());
        for _ in 0..10 {
            current = navigate(current, NavDirection::Previous, &schedule);
        }
        assert_eq!(current, cursor(2024, 11));
        assert_eq!(
            navigate(current, NavDirection::Previous, &schedule),
            current
        );
    }

    #[test]
    fn single_month_course_blocks_both_directions() {
        let schedule = CourseSchedule::new(day(2025, 8, 1), day(2025, 8, 20), []);
        let current = cursor(2025, 8);
        assert_eq!(navigate(current, NavDirection::Next, &schedule), current);
        assert_eq!(navigate(current, NavDirection::Previous, &schedule), current);
    }

    #[test]
    fn cursor_outside_range_moves_back_toward_it() {
        let schedule = year_end_course();
        let current = cursor(2025, 6);
        assert!(!can_navigate(current, NavDirection::Next, &schedule));
        assert_eq!(
            navigate(current, NavDirection::Previous, &schedule),
            cursor(2025, 5)
        );
    }

    #[test]
    fn reset_to_today_is_not_clamped() {
        let schedule = year_end_course();
        let today = day(2026, 3, 9);
        let reset = reset_to_today(today);
        assert_eq!(reset, cursor(2026, 3));
        assert_eq!(clamp_to_schedule(reset, &schedule), cursor(2025, 2));
        assert_eq!(
            clamp_to_schedule(cursor(2020, 1), &schedule),
            cursor(2024, 11)
        );
    }

    #[test]
    fn month_lengths_follow_leap_years() {
        assert_eq!(cursor(2024, 2).days_in_month(), 29);
        assert_eq!(cursor(2025, 2).days_in_month(), 28);
        assert_eq!(cursor(2025, 12).days_in_month(), 31);
        assert_eq!(cursor(2025, 12).last_day(), day(2025, 12, 31));
    }

    #[test]
    fn parses_and_displays_months() {
        let parsed: ViewCursor = "2025-08".parse().expect("parse cursor");
        assert_eq!(parsed, cursor(2025, 8));
        assert_eq!(parsed.to_string(), "August 2025");
        assert!("2025-13".parse::<ViewCursor>().is_err());
        assert!("August".parse::<ViewCursor>().is_err());
    }

    #[test]
    fn rejects_years_chrono_cannot_represent() {
        assert!(ViewCursor::new(300_000, 1).is_none());
        assert!("300000-01".parse::<ViewCursor>().is_err());
        assert!("-300000-01".parse::<ViewCursor>().is_err());

        let latest = ViewCursor::from_date(NaiveDate::MAX);
        assert_eq!(latest.last_day(), NaiveDate::MAX);
        assert_eq!(latest.first_day().month(), 12);
    }
}
