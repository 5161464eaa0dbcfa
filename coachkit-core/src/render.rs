//! Plain-text rendering of the transcript and tool cards.
//!
//! [`render_card`] is the one place that maps a [`ToolCard`] to its view.
//! Adding a tool type means adding an arm here; the match is exhaustive on
//! purpose so the compiler points at it.

use crate::tools::{
    countdown::format_remaining, ChecklistData, CountdownData, CountdownStatus, DayPlanData,
    ReminderData, ReminderStatus, ToolInstance,
};
use crate::types::{Message, Role, ToolCard};

const PROGRESS_WIDTH: usize = 20;

/// A message ready to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub label: &'static str,
    pub body: String,
    /// Body was cut short; expanding the message shows all of it
    pub truncated: bool,
}

/// Render a transcript entry, truncated to `max_chars` unless expanded.
pub fn render_message(message: &Message, max_chars: usize) -> RenderedMessage {
    let label = match message.role {
        Role::User => "you",
        Role::Assistant => "coach",
        Role::System => "notice",
    };

    let (body, truncated) = if message.expanded {
        (message.content.clone(), false)
    } else {
        truncate(&message.content, max_chars)
    };

    RenderedMessage {
        label,
        body,
        truncated,
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "…".
pub fn truncate(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((byte_index, _)) => {
            let mut cut = text[..byte_index].trim_end().to_string();
            cut.push('…');
            (cut, true)
        }
    }
}

/// `[#####-----]` style bar for a 0.0..=1.0 fraction
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Render the live state behind a card, with its id and retirement marker.
pub fn render_instance(instance: &ToolInstance) -> Vec<String> {
    let mut lines = render_card(&instance.data);
    if let Some(header) = lines.first_mut() {
        let suffix = if instance.is_active { "" } else { " (done)" };
        *header = format!("{header}  <{}>{suffix}", instance.id);
    }
    lines
}

/// Render a card's data, one string per line.
pub fn render_card(card: &ToolCard) -> Vec<String> {
    match card {
        ToolCard::Countdown(c) => countdown_lines(c),
        ToolCard::Checklist(c) => checklist_lines(c),
        ToolCard::DayPlan(p) => dayplan_lines(p),
        ToolCard::Reminder(r) => reminder_lines(r),
    }
}

fn countdown_lines(c: &CountdownData) -> Vec<String> {
    let title = if c.task.is_empty() {
        format!("Focus timer: {} min + {} min break", c.duration_minutes, c.break_minutes)
    } else {
        format!("Focus timer: {}", c.task)
    };
    let phase = match c.status {
        CountdownStatus::Break => "break",
        CountdownStatus::Completed => "done",
        _ => "focus",
    };
    vec![
        title,
        format!(
            "  {} {} {} ({})",
            format_remaining(c.remaining_seconds),
            progress_bar(c.phase_progress(), PROGRESS_WIDTH),
            phase,
            c.status.as_str()
        ),
    ]
}

fn checklist_lines(c: &ChecklistData) -> Vec<String> {
    let mut lines = vec![format!(
        "Checklist: {} ({}/{})",
        c.title,
        c.completed_count(),
        c.steps.len()
    )];
    for (index, step) in c.steps.iter().enumerate() {
        let mark = if step.completed { "x" } else { " " };
        let pointer = if c.active_step == Some(index) { ">" } else { " " };
        let estimate = step
            .estimated_minutes
            .map(|m| format!(" (~{m} min)"))
            .unwrap_or_default();
        lines.push(format!("{pointer} [{mark}] {}. {}{estimate}", index + 1, step.text));
    }
    if c.is_all_complete() {
        lines.push("  All done!".to_string());
    }
    lines
}

fn dayplan_lines(p: &DayPlanData) -> Vec<String> {
    let mut lines = vec![format!(
        "Day plan for {} {}",
        p.date.format("%a %d %b"),
        progress_bar(p.progress(), PROGRESS_WIDTH)
    )];
    for block in &p.blocks {
        let mark = if block.completed { "x" } else { " " };
        lines.push(format!(
            "  [{mark}] {} {:<8} {} ({})",
            block.start_time,
            block.duration_label,
            block.task,
            block.kind.as_str()
        ));
    }
    lines
}

fn reminder_lines(r: &ReminderData) -> Vec<String> {
    let status = match r.status() {
        ReminderStatus::Draft => "draft, confirm to save",
        ReminderStatus::Active => "on",
        ReminderStatus::Inactive => "off",
    };
    let when = r.time.as_deref().map(|t| format!(" at {t}")).unwrap_or_default();
    vec![format!("Reminder: {}{when} [{status}]", r.text)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), ("short".to_string(), false));
        let (cut, truncated) = truncate("déjà vu again", 4);
        assert!(truncated);
        assert_eq!(cut, "déjà…");
    }

    #[test]
    fn test_expanded_message_is_shown_in_full() {
        let mut message = Message::assistant("a".repeat(50), Utc::now());
        let rendered = render_message(&message, 10);
        assert!(rendered.truncated);
        assert_eq!(rendered.label, "coach");

        message.expanded = true;
        let rendered = render_message(&message, 10);
        assert!(!rendered.truncated);
        assert_eq!(rendered.body.len(), 50);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(2.0, 4), "[####]");
    }

    #[test]
    fn test_checklist_marks_active_step() {
        let card = ToolCard::Checklist(ChecklistData::new("Garage", ["Sort", "Sweep"]));
        let lines = render_card(&card);
        assert_eq!(lines[0], "Checklist: Garage (0/2)");
        assert!(lines[1].starts_with("> [ ] 1. Sort"));
        assert!(lines[2].starts_with("  [ ] 2. Sweep"));
    }

    #[test]
    fn test_countdown_line() {
        let card = ToolCard::Countdown(CountdownData::new(25, 5, "write report"));
        let lines = render_card(&card);
        assert_eq!(lines[0], "Focus timer: write report");
        assert!(lines[1].contains("25:00"));
        assert!(lines[1].contains("(ready)"));
    }
}
