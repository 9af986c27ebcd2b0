//! studyplan TUI: interactive terminal dashboard for the study planner.
//!
//! Tabs for the overview, the weekly schedule, a Pomodoro timer, the
//! performance log and the study assistant, built with `ratatui` + `crossterm`.

mod app;
mod screens;
mod session;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::{Result, WrapErr};

/// Path of the optional log file; the terminal itself is never logged to.
const LOG_ENV: &str = "STUDYPLAN_LOG";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let session = session::Session::open()?;
    app::run(session)
}

fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let Some(path) = std::env::var_os(LOG_ENV) else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("cannot open log file {}", path.to_string_lossy()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studyplan=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
