//! coachkit - terminal chat coach
//!
//! Chat with a coach that can hand out focus timers, checklists, day plans
//! and reminders, with proactive nudges when you go quiet or get stuck.

mod chat;
mod command;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use coachkit_core::db::Submission;
use coachkit_core::nudge::NudgeEngine;
use coachkit_core::{Config, Database, DirectiveParser};

#[derive(Parser)]
#[command(name = "coachkit")]
#[command(about = "Terminal chat coach with tool cards and nudges")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Start an interactive chat session (default)
    Chat {
        /// Replay replies from a JSON array of strings instead of calling a model
        #[arg(long)]
        replies: Option<PathBuf>,
    },

    /// Split an assistant reply read from stdin into text and tool card (JSON)
    Parse {
        /// Date used for day plans without one (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List nudge triggers with their priority and cooldown
    Triggers,

    /// Store a form submission read from stdin as JSON tagged by "kind"
    Submit,

    /// Show stored submission counts and today's counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        coachkit_core::logging::init(&config.logging).context("failed to initialize logging")?;

    match args.command.unwrap_or(Cmd::Chat { replies: None }) {
        Cmd::Chat { replies } => {
            let db = open_database()?;
            chat::run(config, db, replies).await
        }
        Cmd::Parse { date } => {
            let raw = read_stdin()?;
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let parsed = DirectiveParser::new().parse_at(&raw, today);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(())
        }
        Cmd::Triggers => {
            print_triggers(&config);
            Ok(())
        }
        Cmd::Submit => {
            let raw = read_stdin()?;
            let submission: Submission =
                serde_json::from_str(&raw).context("invalid submission JSON")?;
            let db = open_database()?;
            let id = db
                .insert_submission(&submission)
                .context("submission rejected")?;
            println!("Stored {} #{}", submission.table(), id);
            Ok(())
        }
        Cmd::Status => {
            let db = open_database()?;
            let counts = db.submission_counts()?;
            let stats = db.load_daily_stats(Local::now().date_naive())?;
            println!("Database: {}", Config::database_path().display());
            println!();
            println!("Submissions:");
            println!("  Contact messages:    {}", counts.contact_messages);
            println!("  Waitlist signups:    {}", counts.waitlist_signups);
            println!("  Expert applications: {}", counts.expert_applications);
            println!("  Quiz results:        {}", counts.quiz_results);
            println!();
            println!("Today ({}):", stats.date);
            println!("  Tasks completed:     {}", stats.completed_tasks);
            println!("  Focus sessions:      {}", stats.countdowns_completed);
            Ok(())
        }
    }
}

fn open_database() -> Result<Database> {
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(db)
}

fn read_stdin() -> Result<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read stdin")?;
    Ok(raw)
}

fn print_triggers(config: &Config) {
    let engine = NudgeEngine::new();
    for trigger in engine.triggers() {
        let disabled = config
            .nudges
            .disabled_triggers
            .iter()
            .any(|name| name == trigger.kind.as_str());
        println!(
            "{:<16} priority {}  cooldown {:<4} {}{}",
            trigger.kind.as_str(),
            trigger.priority,
            format_cooldown(trigger.cooldown),
            trigger.summary(),
            if disabled { "  [disabled]" } else { "" }
        );
    }
}

fn format_cooldown(cooldown: chrono::Duration) -> String {
    if cooldown.num_minutes() >= 60 && cooldown.num_minutes() % 60 == 0 {
        format!("{}h", cooldown.num_hours())
    } else {
        format!("{}m", cooldown.num_minutes())
    }
}
