//! studyplan CLI: exam study planner.
//!
//! Builds a weekly study schedule from the topic list, tracks completion,
//! question-bank performance and Pomodoro sessions per local user, and
//! forwards questions to the study assistant.

mod commands;
mod output;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
