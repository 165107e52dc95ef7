use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::datetime::parse_calendar_date;

/// A course row as returned by the course fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    pub starting_date: String,

    pub ending_date: String,

    #[serde(default)]
    pub holidays: Option<HolidayList>,
}

/// Holidays arrive either as a list or as the comma-joined string the
/// admin edit form writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HolidayList {
    Many(Vec<String>),
    Joined(String),
}

impl HolidayList {
    pub fn entries(&self) -> Vec<&str> {
        match self {
            HolidayList::Many(items) => items
                .iter()
                .flat_map(|item| split_holidays(item))
                .collect(),
            HolidayList::Joined(raw) => split_holidays(raw),
        }
    }
}

pub fn split_holidays(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

impl CourseRecord {
    /// Reads a course record from a JSON file, or stdin when `path` is `-`.
    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = if path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read course record from stdin")?;
            buf
        } else {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?
        };

        let record = Self::from_json(&text)
            .with_context(|| format!("invalid course record in {}", path.display()))?;
        info!(
            course = record.id.as_deref().unwrap_or("-"),
            "loaded course record"
        );
        Ok(record)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("failed to parse course record JSON")
    }

    #[tracing::instrument(skip(self, tz), fields(course = self.id.as_deref().unwrap_or("-")))]
    pub fn to_schedule(&self, tz: Tz) -> anyhow::Result<CourseSchedule> {
        let start =
            parse_calendar_date(&self.starting_date, tz).context("invalid starting_date")?;
        let end = parse_calendar_date(&self.ending_date, tz).context("invalid ending_date")?;

        let mut holidays = Vec::new();
        if let Some(list) = &self.holidays {
            for entry in list.entries() {
                let date = parse_calendar_date(entry, tz)
                    .with_context(|| format!("invalid holiday '{entry}'"))?;
                holidays.push(date);
            }
        }

        Ok(CourseSchedule::new(start, end, holidays))
    }
}

/// A course's calendar footprint: inclusive date range plus the holidays
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSchedule {
    start: NaiveDate,
    end: NaiveDate,
    holidays: BTreeSet<NaiveDate>,
}

impl CourseSchedule {
    /// Holidays outside `[start, end]` are dropped. A reversed range is
    /// kept as-is and behaves as empty.
    pub fn new<I>(start: NaiveDate, end: NaiveDate, holidays: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut kept = BTreeSet::new();
        let mut ignored = 0_usize;
        for day in holidays {
            if start <= day && day <= end {
                kept.insert(day);
            } else {
                ignored += 1;
            }
        }

        if ignored > 0 {
            debug!(%start, %end, ignored, "ignored holidays outside course range");
        }
        if start > end {
            debug!(%start, %end, "course range is reversed; treating as empty");
        }

        Self {
            start,
            end,
            holidays: kept,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn drops_holidays_outside_range() {
        let schedule = CourseSchedule::new(
            day(2025, 8, 1),
            day(2025, 8, 20),
            [day(2025, 7, 31), day(2025, 8, 7), day(2025, 8, 21)],
        );
        assert_eq!(schedule.holidays().len(), 1);
        assert!(schedule.is_holiday(day(2025, 8, 7)));
        assert!(!schedule.is_holiday(day(2025, 7, 31)));
    }

    #[test]
    fn duplicate_holidays_collapse() {
        let schedule = CourseSchedule::new(
            day(2025, 8, 1),
            day(2025, 8, 20),
            [day(2025, 8, 7), day(2025, 8, 7)],
        );
        assert_eq!(schedule.holidays().len(), 1);
    }

    #[test]
    fn record_with_null_holidays() {
        let record = CourseRecord::from_json(
            r#"{"starting_date":"2025-08-01","ending_date":"2025-08-20","holidays":null}"#,
        )
        .expect("parse record");
        let schedule = record.to_schedule(chrono_tz::UTC).expect("schedule");
        assert!(schedule.holidays().is_empty());
        assert_eq!(schedule.start(), day(2025, 8, 1));
    }

    #[test]
    fn record_with_joined_holiday_string() {
        let record = CourseRecord::from_json(
            r#"{"starting_date":"2025-08-01","ending_date":"2025-08-20","holidays":"2025-08-07, 2025-08-14, "}"#,
        )
        .expect("parse record");
        let schedule = record.to_schedule(chrono_tz::UTC).expect("schedule");
        assert_eq!(
            schedule.holidays().iter().copied().collect::<Vec<_>>(),
            vec![day(2025, 8, 7), day(2025, 8, 14)]
        );
    }

    #[test]
    fn malformed_holiday_fails_at_boundary() {
        let record = CourseRecord::from_json(
            r#"{"starting_date":"2025-08-01","ending_date":"2025-08-20","holidays":["08/07/2025"]}"#,
        )
        .expect("parse record");
        let err = record
            .to_schedule(chrono_tz::UTC)
            .expect_err("holiday should be rejected");
        assert!(format!("{err:#}").contains("08/07/2025"));
    }

    #[test]
    fn reversed_range_is_empty() {
        let schedule = CourseSchedule::new(day(2025, 8, 20), day(2025, 8, 1), [day(2025, 8, 10)]);
        assert!(schedule.is_empty());
        assert!(schedule.holidays().is_empty());
        assert!(!schedule.contains(day(2025, 8, 10)));
    }
}
