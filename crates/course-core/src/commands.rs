use anyhow::Context;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{CalendarDay, MonthView, week_start_day};
use crate::cli::{Command, CourseArgs, DatesArgs, MonthArgs, OutputFormat};
use crate::config::Config;
use crate::cursor::{NavDirection, ViewCursor, clamp_to_schedule, navigate, reset_to_today};
use crate::render::Renderer;
use crate::schedule::{CourseRecord, CourseSchedule};
use crate::tracker::{DayClassification, ProgressSummary, classify, enumerate_dates};

/// Per-invocation inputs every command shares. `today` is read once.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub cfg: &'a Config,
    pub tz: Tz,
    pub today: NaiveDate,
}

#[derive(Debug, Serialize)]
struct SummaryOutput<'a> {
    course: Option<&'a str>,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    #[serde(flatten)]
    summary: ProgressSummary,
}

#[tracing::instrument(skip(ctx, renderer))]
pub fn dispatch(
    ctx: &RunContext<'_>,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Summary(args) => cmd_summary(ctx, renderer, &args),
        Command::Month(args) => cmd_month(ctx, renderer, &args),
        Command::Dates(args) => cmd_dates(ctx, renderer, &args),
    }
}

fn load_schedule(
    ctx: &RunContext<'_>,
    args: &CourseArgs,
) -> anyhow::Result<(CourseRecord, CourseSchedule)> {
    let record = CourseRecord::load(&args.course)?;
    let schedule = record
        .to_schedule(ctx.tz)
        .with_context(|| format!("failed to read schedule from {}", args.course.display()))?;
    debug!(
        start = %schedule.start(),
        end = %schedule.end(),
        holidays = schedule.holidays().len(),
        "resolved course schedule"
    );
    Ok((record, schedule))
}

fn cmd_summary(
    ctx: &RunContext<'_>,
    renderer: &mut Renderer,
    args: &CourseArgs,
) -> anyhow::Result<()> {
    let (record, schedule) = load_schedule(ctx, args)?;
    let summary = ProgressSummary::compute(&schedule, ctx.today);
    info!(
        completed = summary.completed_days,
        total = summary.total_days,
        "course summary"
    );

    match args.format {
        OutputFormat::Json => renderer.print_json(&SummaryOutput {
            course: record.title.as_deref().or(record.id.as_deref()),
            start: schedule.start(),
            end: schedule.end(),
            today: ctx.today,
            summary,
        }),
        OutputFormat::Table => {
            renderer.print_summary(record.title.as_deref().or(record.id.as_deref()), &summary)
        }
    }
}

fn cmd_month(
    ctx: &RunContext<'_>,
    renderer: &mut Renderer,
    args: &MonthArgs,
) -> anyhow::Result<()> {
    let (_, schedule) = load_schedule(ctx, &args.course)?;
    let cursor = initial_cursor(ctx, &schedule, args.month);
    let cursor = step(cursor, NavDirection::Previous, args.prev, &schedule);
    let cursor = step(cursor, NavDirection::Next, args.next, &schedule);

    let week_start = week_start_day(&ctx.cfg.get("week.start").unwrap_or_default());
    let view = MonthView::build(&schedule, cursor, ctx.today, week_start);

    match args.course.format {
        OutputFormat::Json => renderer.print_json(&view),
        OutputFormat::Table => renderer.print_month(&view),
    }
}

fn cmd_dates(
    ctx: &RunContext<'_>,
    renderer: &mut Renderer,
    args: &DatesArgs,
) -> anyhow::Result<()> {
    let (_, schedule) = load_schedule(ctx, &args.course)?;
    let days = classified_days(&schedule, ctx.today, args.only);

    match args.course.format {
        OutputFormat::Json => renderer.print_json(&days),
        OutputFormat::Table => renderer.print_dates(&days),
    }
}

/// The course range with each day's classification, optionally keeping
/// only one kind.
pub fn classified_days(
    schedule: &CourseSchedule,
    today: NaiveDate,
    only: Option<DayClassification>,
) -> Vec<CalendarDay> {
    enumerate_dates(schedule.start(), schedule.end())
        .map(|date| CalendarDay {
            date,
            classification: classify(date, schedule, today),
            is_today: date == today,
        })
        .filter(|day| only.is_none_or(|only| day.classification == only))
        .collect()
}

/// An explicit `--month` wins; otherwise today's month, pulled into the
/// course range when `calendar.clamp_today` is on.
pub fn initial_cursor(
    ctx: &RunContext<'_>,
    schedule: &CourseSchedule,
    explicit: Option<ViewCursor>,
) -> ViewCursor {
    if let Some(cursor) = explicit {
        return cursor;
    }

    let cursor = reset_to_today(ctx.today);
    if ctx.cfg.get_bool("calendar.clamp_today").unwrap_or(false) {
        clamp_to_schedule(cursor, schedule)
    } else {
        cursor
    }
}

fn step(
    cursor: ViewCursor,
    direction: NavDirection,
    times: u32,
    schedule: &CourseSchedule,
) -> ViewCursor {
    let mut current = cursor;
    for _ in 0..times {
        let moved = navigate(current, direction, schedule);
        if moved == current {
            break;
        }
        current = moved;
    }
    current
}
