use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIME_CONFIG_FILE: &str =
  "course-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "COURSE_TRACKER_TIMEZONE";
const TIME_CONFIG_ENV_VAR: &str =
  "COURSE_TRACKER_TIME_CONFIG";
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Resolves the timezone "today" is read in.
///
/// Order: the rc `timezone` key, `$COURSE_TRACKER_TIMEZONE`, then a
/// `course-time.toml` file, then UTC. Invalid ids are logged and skipped.
#[tracing::instrument]
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  resolve_timezone_from(
    configured,
    std::env::var(TIMEZONE_ENV_VAR)
      .ok()
      .as_deref(),
    time_config_path()
  )
}

fn resolve_timezone_from(
  configured: Option<&str>,
  env_value: Option<&str>,
  config_path: Option<PathBuf>
) -> Tz {
  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "rc:timezone")
  {
    return tz;
  }

  if let Some(raw) = env_value
    && let Some(tz) =
      parse_timezone(raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(path) = config_path
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "DEFAULT_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
}

/// The clock: today's calendar date in `tz`. Read once per invocation
/// and passed down explicitly.
#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  date_in(Utc::now(), tz)
}

#[must_use]
pub fn date_in(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  dt.with_timezone(&tz).date_naive()
}

/// Parses a course date as handed over by the course fetch.
///
/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, in which case the
/// calendar date is taken in `tz`.
#[tracing::instrument(skip(tz), fields(input = raw))]
pub fn parse_calendar_date(
  raw: &str,
  tz: Tz
) -> anyhow::Result<NaiveDate> {
  let token = raw.trim();
  if token.is_empty() {
    return Err(anyhow!(
      "date cannot be empty"
    ));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  match DateTime::parse_from_rfc3339(
    token
  ) {
    | Ok(dt) => {
      Ok(date_in(
        dt.with_timezone(&Utc),
        tz
      ))
    }
    | Err(err) => {
      Err(anyhow!(
        "invalid date '{token}': \
         expected YYYY-MM-DD or RFC \
         3339 ({err})"
      ))
    }
  }
}

fn time_config_path() -> Option<PathBuf>
{
  if let Ok(raw) =
    std::env::var(TIME_CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir()
    .ok()
    .map(|dir| dir.join(TIME_CONFIG_FILE))
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    parse_calendar_date,
    resolve_timezone,
    resolve_timezone_from
  };
  use crate::config::Config;

  #[test]
  fn parses_plain_iso_date() {
    let parsed = parse_calendar_date(
      "2025-08-01",
      chrono_tz::UTC
    )
    .expect("parse date");
    assert_eq!(
      parsed,
      NaiveDate::from_ymd_opt(
        2025, 8, 1
      )
      .expect("valid date")
    );
  }

  #[test]
  fn rfc3339_timestamp_takes_date_in_timezone(
  ) {
    let tz: chrono_tz::Tz =
      "Asia/Kolkata"
        .parse()
        .expect("valid tz");
    let parsed = parse_calendar_date(
      "2025-07-31T20:00:00Z",
      tz
    )
    .expect("parse timestamp");
    assert_eq!(
      parsed,
      NaiveDate::from_ymd_opt(
        2025, 8, 1
      )
      .expect("valid date")
    );
  }

  #[test]
  fn rejects_malformed_dates() {
    assert!(
      parse_calendar_date(
        "2025-02-30",
        chrono_tz::UTC
      )
      .is_err()
    );
    assert!(
      parse_calendar_date(
        "   ",
        chrono_tz::UTC
      )
      .is_err()
    );
  }

  #[test]
  fn configured_timezone_wins() {
    let tz = resolve_timezone(Some(
      "Europe/Berlin"
    ));
    assert_eq!(tz.name(), "Europe/Berlin");
  }

  #[test]
  fn env_timezone_applies_without_rc_key(
  ) {
    let cfg = Config::default();
    let tz = resolve_timezone_from(
      cfg.get("timezone").as_deref(),
      Some("Asia/Kolkata"),
      None
    );
    assert_eq!(tz.name(), "Asia/Kolkata");
  }

  #[test]
  fn time_config_file_applies_without_rc_key(
  ) {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let path =
      dir.path().join("course-time.toml");
    std::fs::write(
      &path,
      "[time]\ntimezone = \"America/Denver\"\n"
    )
    .expect("write time config");

    let tz = resolve_timezone_from(
      None,
      None,
      Some(path)
    );
    assert_eq!(tz.name(), "America/Denver");
  }

  #[test]
  fn falls_back_to_utc() {
    let tz = resolve_timezone_from(
      None,
      Some("Not/AZone"),
      None
    );
    assert_eq!(tz.name(), "UTC");
  }
}
