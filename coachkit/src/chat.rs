//! Interactive chat loop.
//!
//! Reads lines from stdin and pumps session timers once a second, including
//! while a reply is outstanding. Output is driven entirely by a store
//! subscription, so timer-driven changes (ticks, nudges, auto-dismissals)
//! print the same way as typed commands.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use coachkit_core::activity::InputEvent;
use coachkit_core::render::{render_instance, render_message};
use coachkit_core::store::{SessionAction, SessionState};
use coachkit_core::tools::{CountdownAction, CountdownStatus, ToolAction, Transition};
use coachkit_core::{
    ChatSession, Clock, Config, Database, HttpReplyBackend, Locale, PendingReply, ReplyBackend,
    ScriptedBackend, SystemClock, ToolKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::{Command, HELP};

/// Reply request being awaited by the loop
type ReplyFuture = Pin<Box<dyn Future<Output = coachkit_core::Result<String>>>>;

/// What the loop does after an input line
enum Step {
    Continue,
    Send(PendingReply),
    Quit,
}

pub async fn run(config: Config, db: Database, replies: Option<PathBuf>) -> Result<()> {
    let backend: Arc<dyn ReplyBackend> = match replies {
        Some(path) => Arc::new(scripted_backend(&path)?),
        None => Arc::new(
            HttpReplyBackend::from_config(&config.reply)
                .context("failed to configure reply backend")?,
        ),
    };
    tracing::info!(backend = backend.name(), "Starting chat session");

    let clock = Arc::new(SystemClock);
    let today = clock.now().date_naive();
    let stats = db
        .load_daily_stats(today)
        .context("failed to load daily stats")?;
    let visited = db.has_any_visit().context("failed to read visit history")?;
    db.save_daily_stats(&stats)
        .context("failed to record visit")?;

    let mut session = ChatSession::new(&config, backend, clock)
        .context("failed to start chat session")?
        .with_daily_stats(stats)
        .with_first_visit(!visited);

    let truncate_chars = config.session.truncate_chars;
    session.subscribe(move |action, state| print_action(action, state, truncate_chars));

    println!("coachkit: type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut pending: Option<ReplyFuture> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let step = handle_input(&mut session, &line)?;
                db.save_daily_stats(&session.daily_stats())
                    .context("failed to save daily stats")?;
                match step {
                    Step::Continue => {}
                    Step::Send(reply) => pending = Some(Box::pin(reply.fetch())),
                    Step::Quit => break,
                }
            }
            result = next_reply(&mut pending) => {
                pending = None;
                finish_reply(&mut session, result);
            }
            _ = interval.tick() => {
                if let Err(e) = session.pump_timers() {
                    tracing::warn!(error = %e, "Timer delivery failed");
                }
            }
        }
    }

    // Let an outstanding reply land before leaving
    if let Some(reply) = pending.take() {
        finish_reply(&mut session, reply.await);
    }

    db.save_daily_stats(&session.daily_stats())
        .context("failed to save daily stats")?;
    tracing::info!("Chat session ended");
    Ok(())
}

/// Replies replayed in order from a JSON array of strings
fn scripted_backend(path: &PathBuf) -> Result<ScriptedBackend> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replies file {}", path.display()))?;
    let replies: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("replies file {} is not a JSON string array", path.display()))?;
    Ok(ScriptedBackend::new(replies.into_iter().map(Ok)))
}

async fn next_reply(pending: &mut Option<ReplyFuture>) -> coachkit_core::Result<String> {
    match pending {
        Some(reply) => reply.await,
        None => std::future::pending().await,
    }
}

fn finish_reply(session: &mut ChatSession, result: coachkit_core::Result<String>) {
    if let Err(e) = session.finish_send(result) {
        eprintln!("error: {e}");
    }
}

/// Handle one input line and record it as activity.
fn handle_input(session: &mut ChatSession, line: &str) -> coachkit_core::Result<Step> {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            session.update_activity(InputEvent::KeyPress)?;
            return Ok(Step::Continue);
        }
    };

    // Recording activity clears the live nudge, so nudge commands go first
    let answers_nudge = matches!(command, Command::Accept | Command::Dismiss);
    if !answers_nudge {
        session.update_activity(InputEvent::KeyPress)?;
    }
    let step = run_command(session, command);
    if answers_nudge {
        session.update_activity(InputEvent::KeyPress)?;
    }
    Ok(step)
}

fn run_command(session: &mut ChatSession, command: Command) -> Step {
    let result = match command {
        Command::Quit => return Step::Quit,
        Command::Help => {
            println!("{HELP}");
            Ok(None)
        }
        Command::Say(text) => return begin_send(session, &text),
        Command::Start(id) => session.start_countdown(&id).map(Some),
        Command::Pause(id) => session.pause_countdown(&id).map(Some),
        Command::Resume(id) => session.resume_countdown(&id).map(Some),
        Command::Reset(id) => session.reset_countdown(&id).map(Some),
        Command::Step { tool, step } => session.toggle_checklist_step(&tool, &step).map(Some),
        Command::Goto { tool, index } => session.start_checklist_step(&tool, index).map(Some),
        Command::Block { tool, block } => session.toggle_dayplan_block(&tool, &block).map(Some),
        Command::Confirm(id) => session.confirm_reminder(&id).map(Some),
        Command::Remind(id) => session.toggle_reminder(&id).map(Some),
        Command::Time { tool, time } => session.set_reminder_time(&tool, time).map(Some),
        Command::Delete(id) => session.delete_reminder(&id).map(Some),
        Command::Retire(id) => session.retire_tool(&id).map(Some),
        Command::Expand(id) => session.toggle_expanded(&id).map(|_| None),
        Command::Clear => session.clear_messages().map(|_| None),
        Command::Dismiss => session.dismiss_nudge().map(|_| None),
        Command::Accept => match session.accept_nudge() {
            Ok(Some(kind)) => {
                let prompt = tool_request(kind, session.locale());
                return begin_send(session, prompt);
            }
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        },
        Command::Tools => {
            print_tools(session);
            Ok(None)
        }
        Command::Stats => {
            let stats = session.daily_stats();
            println!(
                "{}: {} task(s) completed, {} focus session(s) finished",
                stats.date, stats.completed_tasks, stats.countdowns_completed
            );
            Ok(None)
        }
    };

    match result {
        Ok(Some(Transition::Ignored)) => println!("(nothing to do)"),
        Ok(_) => {}
        Err(e) => eprintln!("error: {e}"),
    }
    Step::Continue
}

fn begin_send(session: &mut ChatSession, content: &str) -> Step {
    match session.begin_send(content) {
        Ok(reply) => Step::Send(reply),
        Err(e) => {
            eprintln!("error: {e}");
            Step::Continue
        }
    }
}

/// Message sent on the user's behalf when they accept a nudge
fn tool_request(kind: ToolKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (ToolKind::Countdown, Locale::En) => "Let's start a focus timer.",
        (ToolKind::Countdown, Locale::Fr) => "On lance un minuteur de concentration.",
        (ToolKind::Checklist, Locale::En) => "Help me break this into small steps.",
        (ToolKind::Checklist, Locale::Fr) => "Aide-moi à découper ça en petites étapes.",
        (ToolKind::DayPlan, Locale::En) => "Help me plan my day.",
        (ToolKind::DayPlan, Locale::Fr) => "Aide-moi à planifier ma journée.",
        (ToolKind::Reminder, Locale::En) => "Set a reminder for me.",
        (ToolKind::Reminder, Locale::Fr) => "Crée-moi un rappel.",
    }
}

fn print_tools(session: &ChatSession) {
    let mut any = false;
    for instance in session.state().tools.iter().filter(|t| t.is_active) {
        any = true;
        for line in render_instance(instance) {
            println!("  {line}");
        }
    }
    if !any {
        println!("(no active tools)");
    }
}

fn print_action(action: &SessionAction, state: &SessionState, truncate_chars: usize) {
    match action {
        SessionAction::AppendMessage(message) => print_message(message, truncate_chars),
        SessionAction::ToggleExpanded { message_id } => {
            if let Some(message) = state.message(message_id) {
                print_message(message, truncate_chars);
            }
        }
        SessionAction::AddTool(instance) => {
            for line in render_instance(instance) {
                println!("  {line}");
            }
        }
        SessionAction::UpdateTool { id, action } => {
            let Some(instance) = state.tools.get(id) else {
                return;
            };
            // Running timers print once a minute
            if *action == ToolAction::Countdown(CountdownAction::Tick) {
                if let Some(countdown) = instance.as_countdown() {
                    let running = matches!(
                        countdown.status,
                        CountdownStatus::Running | CountdownStatus::Break
                    );
                    if running && countdown.remaining_seconds % 60 != 0 {
                        return;
                    }
                }
            }
            for line in render_instance(instance) {
                println!("  {line}");
            }
        }
        SessionAction::RetireTool { id } => println!("  {id} closed"),
        SessionAction::RemoveTool { id } => println!("  {id} deleted"),
        SessionAction::SetNudge(Some(nudge)) => {
            println!("* {}  (/accept or /dismiss)", nudge.message);
        }
        SessionAction::SetLoading(true) => println!("..."),
        SessionAction::ClearMessages => println!("(transcript cleared)"),
        SessionAction::SetNudge(None)
        | SessionAction::SetLoading(false)
        | SessionAction::AttachToolCard { .. } => {}
    }
}

fn print_message(message: &coachkit_core::Message, truncate_chars: usize) {
    let rendered = render_message(message, truncate_chars);
    if rendered.truncated {
        println!(
            "[{}] {}  (/expand {})",
            rendered.label, rendered.body, message.id
        );
    } else {
        println!("[{}] {}", rendered.label, rendered.body);
    }
}
