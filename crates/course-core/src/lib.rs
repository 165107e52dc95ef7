pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod cursor;
pub mod datetime;
pub mod render;
pub mod schedule;
pub mod tracker;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting course tracker"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let tz = datetime::resolve_timezone(
    cfg.get("timezone").as_deref()
  );
  let today = match cli.today.as_deref()
  {
    | Some(raw) => {
      datetime::parse_calendar_date(
        raw, tz
      )
      .context("invalid --today value")?
    }
    | None => datetime::today_in(tz)
  };
  info!(%today, timezone = %tz.name(), "resolved clock");

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let ctx = commands::RunContext {
    cfg: &cfg,
    tz,
    today
  };

  commands::dispatch(
    &ctx,
    &mut renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
