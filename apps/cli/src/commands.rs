//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use studyplan_assistant::{AssistantClient, GREETING};
use studyplan_core::pomodoro::{Phase, Pomodoro};
use studyplan_core::progress::{self, all_topics};
use studyplan_core::schedule::build_schedule;
use studyplan_core::seed::quote_of_the_day;
use studyplan_core::view::{ScheduleFilter, current_week};
use studyplan_shared::{
    AppConfig, ChatMessage, Difficulty, ScheduleConfig, UserId, UserRecord, init_config, load_config,
    validate_api_key,
};
use studyplan_storage::Storage;
use tracing::{info, warn};
use uuid::Uuid;

use crate::output;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// studyplan: plan exam preparation week by week.
#[derive(Parser)]
#[command(
    name = "studyplan",
    version,
    about = "Plan exam preparation week by week and track your progress.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// E-mail of the user to act as (overrides `defaults.user`).
    #[arg(short, long, global = true, env = "STUDYPLAN_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage local users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Show or configure the weekly schedule.
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Mark topics, rate them, or manage custom topics.
    Topic {
        #[command(subcommand)]
        action: TopicAction,
    },

    /// Show progress statistics.
    Stats,

    /// Question-bank performance log.
    Perf {
        #[command(subcommand)]
        action: PerfAction,
    },

    /// Run a Pomodoro timer in the terminal.
    Pomodoro {
        /// Number of focus phases to run.
        #[arg(short, long, default_value = "1")]
        cycles: u32,
    },

    /// Ask the study assistant a question.
    Ask {
        /// The question (remaining words are joined).
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Assistant conversation history.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Launch the interactive TUI.
    Tui,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum UserAction {
    /// Register a user with a fresh progress profile.
    Create {
        email: String,

        /// Display name (defaults to the e-mail's local part).
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// List registered users.
    List,
}

#[derive(Subcommand)]
pub(crate) enum ScheduleAction {
    /// Print the schedule, optionally a single week or filtered.
    Show {
        /// Only this week (1-based).
        #[arg(short, long)]
        week: Option<u32>,

        /// Case-insensitive theme search.
        #[arg(short, long)]
        search: Option<String>,

        /// Area tag filter (e.g. pediatria).
        #[arg(short, long)]
        area: Option<String>,
    },
    /// Change the study period or the per-day topic cap.
    Set {
        /// First day, YYYY-MM-DD.
        #[arg(long)]
        start: Option<String>,

        /// Last day, YYYY-MM-DD.
        #[arg(long)]
        end: Option<String>,

        /// Maximum topics per day.
        #[arg(long)]
        max: Option<i64>,
    },
}

#[derive(Subcommand)]
pub(crate) enum TopicAction {
    /// Add a custom topic to the end of the list.
    Add {
        theme: String,

        /// Area tag (defaults to revisao).
        #[arg(short, long, default_value = "")]
        area: String,
    },
    /// Remove a custom topic.
    Remove { theme: String },
    /// Mark a topic as studied.
    Done { theme: String },
    /// Clear a topic's completion.
    Undo { theme: String },
    /// Rate a topic: easy, medium or hard.
    Difficulty { theme: String, level: Difficulty },
}

#[derive(Subcommand)]
pub(crate) enum PerfAction {
    /// Log a question-bank session.
    Add {
        /// Topic or exam name.
        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        attempted: u32,

        #[arg(short, long)]
        correct: u32,

        /// Session date, YYYY-MM-DD (defaults to today).
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// List sessions, newest first.
    List,
    /// Delete a session by id.
    Remove { id: Uuid },
}

#[derive(Subcommand)]
pub(crate) enum ChatAction {
    /// Print recent messages.
    History {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Delete the conversation.
    Clear,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "studyplan=warn",
        1 => "studyplan=info",
        2 => "studyplan=debug",
        _ => "studyplan=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Loaded config, open database and the active user.
struct Session {
    config: AppConfig,
    storage: Storage,
    user: UserRecord,
}

async fn open_storage(config: &AppConfig, readonly: bool) -> Result<Storage> {
    let path = config.database_path()?;
    let storage = if readonly {
        Storage::open_readonly(&path).await?
    } else {
        Storage::open(&path).await?
    };
    Ok(storage)
}

/// Resolve the active user; `--user` wins over `defaults.user`.
async fn open_session(requested: Option<&str>, readonly: bool) -> Result<Session> {
    let config = load_config()?;
    let storage = open_storage(&config, readonly).await?;
    let requested = requested.or(config.defaults.user.as_deref());
    let user = storage.resolve_user(requested).await?;

    if !readonly {
        storage.touch_login(user.id).await?;
    }
    info!(user = %user.email, "session opened");

    Ok(Session {
        config,
        storage,
        user,
    })
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let user = cli.user.as_deref();
    match cli.command {
        Command::User { action } => match action {
            UserAction::Create { email, name } => cmd_user_create(&email, &name).await,
            UserAction::List => cmd_user_list().await,
        },
        Command::Schedule { action } => match action {
            ScheduleAction::Show { week, search, area } => {
                cmd_schedule_show(user, week, ScheduleFilter::new(search, area)).await
            }
            ScheduleAction::Set { start, end, max } => {
                cmd_schedule_set(user, start, end, max).await
            }
        },
        Command::Topic { action } => cmd_topic(user, action).await,
        Command::Stats => cmd_stats(user).await,
        Command::Perf { action } => match action {
            PerfAction::Add {
                topic,
                attempted,
                correct,
                date,
            } => cmd_perf_add(user, &topic, attempted, correct, date).await,
            PerfAction::List => cmd_perf_list(user).await,
            PerfAction::Remove { id } => cmd_perf_remove(user, id).await,
        },
        Command::Pomodoro { cycles } => cmd_pomodoro(user, cycles).await,
        Command::Ask { question } => cmd_ask(user, &question.join(" ")).await,
        Command::Chat { action } => match action {
            ChatAction::History { limit } => cmd_chat_history(user, limit).await,
            ChatAction::Clear => cmd_chat_clear(user).await,
        },
        Command::Tui => cmd_tui(user).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn cmd_user_create(email: &str, name: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, false).await?;
    let user = storage
        .create_user(email, name, &config.initial_schedule())
        .await?;

    println!();
    println!("  User created!");
    println!("  E-mail: {}", user.email);
    println!("  Name:   {}", user.display_name);
    println!("  ID:     {}", user.id);
    println!();
    Ok(())
}

async fn cmd_user_list() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, true).await?;
    let users = storage.list_users().await?;

    if users.is_empty() {
        println!("No users registered. Create one with `studyplan user create <email>`.");
        return Ok(());
    }

    let active = config.defaults.user.as_deref().map(str::to_lowercase);
    for user in users {
        let marker = if active.as_deref() == Some(user.email.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<32} {:<20} last login {}",
            user.email,
            user.display_name,
            user.last_login_at.with_timezone(&Local).format("%d/%m/%Y %H:%M")
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Schedule and topics
// ---------------------------------------------------------------------------

async fn cmd_schedule_show(
    user: Option<&str>,
    week: Option<u32>,
    filter: ScheduleFilter,
) -> Result<()> {
    let session = open_session(user, true).await?;
    let progress = session.storage.load_progress(session.user.id).await?;
    let weeks = build_schedule(&all_topics(&progress), &progress.schedule_config);

    if weeks.is_empty() {
        println!(
            "No schedule for {} .. {}. Check the dates with `studyplan schedule set`.",
            progress.schedule_config.start_date, progress.schedule_config.end_date
        );
        return Ok(());
    }

    let today = Local::now().date_naive();
    let current = current_week(&weeks, today).map(|i| weeks[i].index);

    let selected: Vec<_> = filter
        .apply(&weeks)
        .into_iter()
        .filter(|w| week.is_none_or(|n| w.index == n))
        .collect();

    if selected.is_empty() {
        println!("No weeks match.");
        return Ok(());
    }

    for w in selected {
        println!("{}", output::render_week(w, &progress, current == Some(w.index)));
    }
    Ok(())
}

async fn cmd_schedule_set(
    user: Option<&str>,
    start: Option<String>,
    end: Option<String>,
    max: Option<i64>,
) -> Result<()> {
    if start.is_none() && end.is_none() && max.is_none() {
        return Err(eyre!("nothing to change: pass --start, --end or --max"));
    }

    let session = open_session(user, false).await?;
    let (progress, _) = session
        .storage
        .update_progress(session.user.id, |p| {
            let current = &p.schedule_config;
            let next = ScheduleConfig {
                start_date: start.unwrap_or_else(|| current.start_date.clone()),
                end_date: end.unwrap_or_else(|| current.end_date.clone()),
                max_topics_per_day: max.unwrap_or(current.max_topics_per_day),
            };
            progress::set_schedule_config(p, next)
        })
        .await?;

    let cfg = &progress.schedule_config;
    println!(
        "Schedule set: {} .. {}, up to {} topic(s) per day.",
        cfg.start_date, cfg.end_date, cfg.max_topics_per_day
    );
    Ok(())
}

async fn cmd_topic(user: Option<&str>, action: TopicAction) -> Result<()> {
    let session = open_session(user, false).await?;
    let id = session.user.id;
    let storage = &session.storage;

    let message = match action {
        TopicAction::Add { theme, area } => {
            let (_, topic) = storage
                .update_progress(id, |p| progress::add_custom_topic(p, &theme, &area))
                .await?;
            format!("Added '{}' ({}).", topic.theme, topic.area)
        }
        TopicAction::Remove { theme } => {
            let (_, topic) = storage
                .update_progress(id, |p| progress::remove_custom_topic(p, &theme))
                .await?;
            format!("Removed '{}'.", topic.theme)
        }
        TopicAction::Done { theme } => {
            let theme = known_theme(storage, id, &theme).await?;
            storage
                .update_progress(id, |p| {
                    progress::set_completed(p, &theme, true, Utc::now());
                    Ok(())
                })
                .await?;
            format!("Marked '{theme}' as done.")
        }
        TopicAction::Undo { theme } => {
            let theme = known_theme(storage, id, &theme).await?;
            let (_, changed) = storage
                .update_progress(id, |p| Ok(progress::set_completed(p, &theme, false, Utc::now())))
                .await?;
            if changed {
                format!("'{theme}' is no longer marked as done.")
            } else {
                format!("'{theme}' was not marked as done.")
            }
        }
        TopicAction::Difficulty { theme, level } => {
            let theme = known_theme(storage, id, &theme).await?;
            storage
                .update_progress(id, |p| {
                    progress::set_difficulty(p, &theme, level);
                    Ok(())
                })
                .await?;
            format!(
                "'{theme}' rated {level:?}; next review after {} days.",
                level.review_interval_days()
            )
        }
    };

    println!("{message}");
    Ok(())
}

/// Exact theme name for `query`, matched case-insensitively against all topics.
async fn known_theme(storage: &Storage, user: UserId, query: &str) -> Result<String> {
    let progress = storage.load_progress(user).await?;
    let query = query.trim();
    let needle = query.to_lowercase();
    all_topics(&progress)
        .into_iter()
        .find(|t| t.theme.to_lowercase() == needle)
        .map(|t| t.theme)
        .ok_or_else(|| eyre!("unknown topic '{query}'"))
}

async fn cmd_stats(user: Option<&str>) -> Result<()> {
    let session = open_session(user, true).await?;
    let progress = session.storage.load_progress(session.user.id).await?;
    let today = Local::now().date_naive();
    let stats = progress::stats(&progress, today);

    println!();
    println!("  {} ({})", session.user.display_name, session.user.email);
    println!();
    print!("{}", output::render_stats(&stats, quote_of_the_day(today)));

    let due = progress::reviews_due(&progress, today);
    if !due.is_empty() {
        println!();
        println!("  Due for review:");
        for theme in due {
            println!("    - {theme}");
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

async fn cmd_perf_add(
    user: Option<&str>,
    topic: &str,
    attempted: u32,
    correct: u32,
    date: Option<NaiveDate>,
) -> Result<()> {
    let session = open_session(user, false).await?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let (_, entry) = session
        .storage
        .update_progress(session.user.id, |p| {
            progress::add_performance_entry(p, date, topic, attempted, correct)
        })
        .await?;

    println!(
        "Logged {}/{} ({}%) for '{}' on {}.",
        entry.correct,
        entry.attempted,
        entry.percentage(),
        entry.topic,
        entry.date.format("%d/%m/%Y")
    );
    Ok(())
}

async fn cmd_perf_list(user: Option<&str>) -> Result<()> {
    let session = open_session(user, true).await?;
    let progress = session.storage.load_progress(session.user.id).await?;
    print!(
        "{}",
        output::render_performance(&progress::sorted_performance_log(&progress))
    );
    Ok(())
}

async fn cmd_perf_remove(user: Option<&str>, id: Uuid) -> Result<()> {
    let session = open_session(user, false).await?;
    let (_, entry) = session
        .storage
        .update_progress(session.user.id, |p| progress::remove_performance_entry(p, id))
        .await?;
    println!("Removed entry for '{}' on {}.", entry.topic, entry.date.format("%d/%m/%Y"));
    Ok(())
}

// ---------------------------------------------------------------------------
// Pomodoro
// ---------------------------------------------------------------------------

async fn cmd_pomodoro(user: Option<&str>, cycles: u32) -> Result<()> {
    if cycles == 0 {
        return Err(eyre!("--cycles must be at least 1"));
    }

    let session = open_session(user, false).await?;
    let mut timer = Pomodoro::new(&session.config.pomodoro);
    let mut finished = 0;

    while finished < cycles {
        let bar = phase_bar(&timer);
        timer.start();

        let ended = loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = tokio::signal::ctrl_c() => {
                    bar.abandon_with_message("interrupted");
                    println!("Stopped after {finished} focus phase(s).");
                    return Ok(());
                }
            }

            let ended = timer.tick(Duration::from_secs(1));
            bar.set_position(timer.phase_length().as_secs() - timer.remaining().as_secs());
            bar.set_message(timer.format_remaining());
            if let Some(phase) = ended {
                break phase;
            }
        };
        bar.finish_and_clear();

        match ended {
            Phase::Focus => {
                finished += 1;
                let (_, total) = session
                    .storage
                    .update_progress(session.user.id, |p| Ok(progress::record_pomodoro(p)))
                    .await?;
                println!("Focus phase done ({finished}/{cycles}, {total} in total). Take a break.");
                if finished == cycles {
                    break;
                }
            }
            Phase::Break => println!("Break over. Back to focus."),
        }
    }
    Ok(())
}

fn phase_bar(timer: &Pomodoro) -> ProgressBar {
    let bar = ProgressBar::new(timer.phase_length().as_secs());
    let style = ProgressStyle::with_template("{prefix:>5} [{bar:40.cyan/blue}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(timer.phase().label());
    bar.set_message(timer.format_remaining());
    bar
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

async fn cmd_ask(user: Option<&str>, question: &str) -> Result<()> {
    let session = open_session(user, false).await?;
    let api_key = validate_api_key(&session.config)?;
    let client = AssistantClient::new(&session.config.assistant, api_key)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let reply = client.ask(question).await;
    spinner.finish_and_clear();
    let reply = reply?;

    let id = session.user.id;
    session
        .storage
        .append_chat_message(id, &ChatMessage::user(question.trim()))
        .await?;
    session
        .storage
        .append_chat_message(id, &ChatMessage::assistant(&reply))
        .await?;

    println!("{reply}");
    Ok(())
}

async fn cmd_chat_history(user: Option<&str>, limit: u32) -> Result<()> {
    let session = open_session(user, true).await?;
    let messages = session
        .storage
        .list_chat_messages(session.user.id, limit)
        .await?;

    if messages.is_empty() {
        println!("{GREETING}");
        return Ok(());
    }
    print!("{}", output::render_chat(&messages));
    Ok(())
}

async fn cmd_chat_clear(user: Option<&str>) -> Result<()> {
    let session = open_session(user, false).await?;
    let removed = session.storage.clear_chat(session.user.id).await?;
    println!("Deleted {removed} message(s).");
    Ok(())
}

// ---------------------------------------------------------------------------
// TUI and config
// ---------------------------------------------------------------------------

async fn cmd_tui(user: Option<&str>) -> Result<()> {
    // Prefer the binary installed next to this one, then PATH
    let sibling = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("studyplan-tui")))
        .filter(|path| path.exists());
    let program = sibling.unwrap_or_else(|| "studyplan-tui".into());

    info!(program = %program.display(), "launching TUI");

    let mut command = std::process::Command::new(&program);
    if let Some(email) = user {
        command.env("STUDYPLAN_USER", email);
    }

    let status = command
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .map_err(|e| eyre!("failed to launch {}: {e}", program.display()))?;

    if !status.success() {
        warn!(code = status.code().unwrap_or(-1), "TUI exited with an error");
        return Err(eyre!(
            "TUI exited with status: {}",
            status.code().unwrap_or(-1)
        ));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
