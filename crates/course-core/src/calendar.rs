use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::cursor::{NavDirection, ViewCursor, can_navigate};
use crate::schedule::CourseSchedule;
use crate::tracker::{DayClassification, ProgressSummary, classify, enumerate_dates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub classification: DayClassification,
    pub is_today: bool,
}

/// Everything the rendering surface needs for one visible month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub cursor: ViewCursor,
    pub title: String,
    #[serde(skip)]
    pub week_start: Weekday,
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
    pub can_previous: bool,
    pub can_next: bool,
    pub summary: ProgressSummary,
}

impl MonthView {
    #[tracing::instrument(skip(schedule))]
    pub fn build(
        schedule: &CourseSchedule,
        cursor: ViewCursor,
        today: NaiveDate,
        week_start: Weekday,
    ) -> Self {
        let days = enumerate_dates(cursor.first_day(), cursor.last_day())
            .map(|date| CalendarDay {
                date,
                classification: classify(date, schedule, today),
                is_today: date == today,
            })
            .collect::<Vec<_>>();

        Self {
            cursor,
            title: cursor.to_string(),
            week_start,
            leading_blanks: leading_blanks(cursor.first_day(), week_start),
            days,
            can_previous: can_navigate(cursor, NavDirection::Previous, schedule),
            can_next: can_navigate(cursor, NavDirection::Next, schedule),
            summary: ProgressSummary::compute(schedule, today),
        }
    }

    /// Rows of seven cells; `None` pads the first and last week.
    pub fn weeks(&self) -> Vec<Vec<Option<&CalendarDay>>> {
        let mut cells: Vec<Option<&CalendarDay>> = Vec::new();
        cells.extend((0..self.leading_blanks).map(|_| None));
        cells.extend(self.days.iter().map(Some));
        while cells.len() % 7 != 0 {
            cells.push(None);
        }

        cells.chunks(7).map(<[_]>::to_vec).collect()
    }

    pub fn count(&self, classification: DayClassification) -> usize {
        self.days
            .iter()
            .filter(|day| day.classification == classification)
            .count()
    }
}

fn leading_blanks(first: NaiveDate, week_start: Weekday) -> u32 {
    let day_idx = first.weekday().num_days_from_monday();
    let start_idx = week_start.num_days_from_monday();
    (7 + day_idx - start_idx) % 7
}

pub fn week_start_day(raw: &str) -> Weekday {
    if raw.trim().eq_ignore_ascii_case("monday") {
        Weekday::Mon
    } else {
        Weekday::Sun
    }
}

pub fn weekday_labels(week_start: Weekday) -> Vec<&'static str> {
    let mut day = week_start;
    let mut labels = Vec::with_capacity(7);
    for _ in 0..7 {
        labels.push(match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        });
        day = day.succ();
    }
    labels
}
