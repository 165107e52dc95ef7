use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use serde::Serialize;

use crate::calendar::{CalendarDay, MonthView, weekday_labels};
use crate::config::{Config, parse_switch};
use crate::tracker::{DayClassification, ProgressSummary};

const CELL_WIDTH: usize = 5;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match parse_switch(&color_cfg) {
            Some(true) => io::stdout().is_terminal(),
            Some(false) => false,
            None => return Err(anyhow!("invalid color setting: {color_cfg}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn print_json<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_summary(
        &mut self,
        title: Option<&str>,
        summary: &ProgressSummary,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_summary(&mut out, title, summary)
    }

    pub fn write_summary<W: Write>(
        &self,
        out: &mut W,
        title: Option<&str>,
        summary: &ProgressSummary,
    ) -> anyhow::Result<()> {
        if let Some(title) = title {
            writeln!(out, "course          {title}")?;
        }
        writeln!(out, "total days      {}", summary.total_days)?;
        writeln!(
            out,
            "completed days  {}",
            self.paint(&summary.completed_days.to_string(), "32")
        )?;
        writeln!(
            out,
            "holidays        {}",
            self.paint(&summary.holidays.to_string(), "31")
        )?;
        writeln!(out, "remaining days  {}", summary.remaining_days)?;
        writeln!(out, "progress        {:.1}%", summary.percent_complete)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, view), fields(month = %view.title))]
    pub fn print_month(&mut self, view: &MonthView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_month(&mut out, view)
    }

    pub fn write_month<W: Write>(&self, out: &mut W, view: &MonthView) -> anyhow::Result<()> {
        let width = CELL_WIDTH * 7;
        let prev = if view.can_previous { "<" } else { " " };
        let next = if view.can_next { ">" } else { " " };
        let title = format!("{prev} {} {next}", view.title);
        writeln!(out, "{title:^width$}")?;

        let header = weekday_labels(view.week_start)
            .into_iter()
            .map(|label| format!("{label:^width$}", width = CELL_WIDTH))
            .collect::<String>();
        writeln!(out, "{}", header.trim_end())?;

        for week in view.weeks() {
            let line = week
                .into_iter()
                .map(|cell| match cell {
                    Some(day) => self.cell(day),
                    None => " ".repeat(CELL_WIDTH),
                })
                .collect::<String>();
            writeln!(out, "{}", line.trim_end())?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{} completed  {} upcoming  {} holiday  [ ] today",
            self.paint("+", "32"),
            self.paint(".", "33"),
            self.paint("x", "31"),
        )?;
        self.write_summary(out, None, &view.summary)
    }

    #[tracing::instrument(skip(self, days), fields(count = days.len()))]
    pub fn print_dates(&mut self, days: &[CalendarDay]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_dates(&mut out, days)
    }

    pub fn write_dates<W: Write>(&self, out: &mut W, days: &[CalendarDay]) -> anyhow::Result<()> {
        writeln!(out, "{:<12}{:<10}{}", "date", "weekday", "status")?;
        for day in days {
            let status = day.classification.as_key();
            let status = match color_code(day.classification) {
                Some(code) => self.paint(status, code),
                None => status.to_string(),
            };
            let today = if day.is_today { "  (today)" } else { "" };
            writeln!(
                out,
                "{:<12}{:<10}{status}{today}",
                day.date.format("%Y-%m-%d").to_string(),
                day.date.format("%a").to_string(),
            )?;
        }
        Ok(())
    }

    fn cell(&self, day: &CalendarDay) -> String {
        let marker = match day.classification {
            DayClassification::Completed => "+",
            DayClassification::Upcoming => ".",
            DayClassification::Holiday => "x",
            DayClassification::OutOfRange => " ",
        };
        let number = day.date.format("%e").to_string();
        let text = if day.is_today {
            format!("[{number}{marker}]")
        } else {
            format!(" {number}{marker} ")
        };

        match color_code(day.classification) {
            Some(code) => self.paint(&text, code),
            None => text,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

fn color_code(classification: DayClassification) -> Option<&'static str> {
    match classification {
        DayClassification::Completed => Some("32"),
        DayClassification::Holiday => Some("31"),
        DayClassification::Upcoming => Some("33"),
        DayClassification::OutOfRange => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;
    use crate::cursor::ViewCursor;
    use crate::schedule::CourseSchedule;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn august_view() -> MonthView {
        let schedule = CourseSchedule::new(
            day(2025, 8, 1),
            day(2025, 8, 20),
            [day(2025, 8, 7), day(2025, 8, 14)],
        );
        MonthView::build(
            &schedule,
            ViewCursor::new(2025, 8).expect("valid cursor"),
            day(2025, 8, 10),
            Weekday::Sun,
        )
    }

    #[test]
    fn month_grid_marks_today_and_holidays() {
        let mut buf = Vec::new();
        Renderer::plain()
            .write_month(&mut buf, &august_view())
            .expect("render month");
        let text = String::from_utf8(buf).expect("utf8 output");

        assert!(text.contains("August 2025"));
        assert!(text.contains("[10+]"));
        assert!(text.contains("  7x "));
        assert!(text.contains(" 15. "));
        assert!(text.contains("completed days  9"));
        assert!(!text.contains('\x1b'));

        let grid_rows = text
            .lines()
            .skip(2)
            .take_while(|line| !line.is_empty())
            .count();
        assert_eq!(grid_rows, 6);
    }

    #[test]
    fn dates_listing_shows_each_status() {
        let view = august_view();
        let mut buf = Vec::new();
        Renderer::plain()
            .write_dates(&mut buf, &view.days[5..11])
            .expect("render dates");
        let text = String::from_utf8(buf).expect("utf8 output");

        assert!(text.contains("2025-08-07  Thu       holiday"));
        assert!(text.contains("2025-08-10  Sun       completed  (today)"));
        assert!(text.contains("2025-08-11  Mon       upcoming"));
    }

    #[test]
    fn color_setting_is_validated() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn color_setting_accepts_every_config_switch() {
        for value in ["y", "n", "yes", "off", "TRUE", "0"] {
            let mut cfg = Config::default();
            cfg.apply_overrides(vec![("color".to_string(), value.to_string())]);
            assert!(Renderer::new(&cfg).is_ok(), "color = {value}");
            assert!(cfg.get_bool("color").is_some());
        }
    }
}
