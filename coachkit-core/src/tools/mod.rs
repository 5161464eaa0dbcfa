//! Tool card state machines
//!
//! Each tool card rendered in the transcript is backed by a [`ToolInstance`]
//! whose data is one of four machines:
//!
//! - [`countdown`]: focus timer with a mandatory break phase
//! - [`checklist`]: ordered steps with a derived active step
//! - [`dayplan`]: time blocks with completion progress
//! - [`reminder`]: draft → confirmed → active/inactive
//!
//! ## Transitions
//!
//! Machines never fail. A transition that is not valid from the current state
//! (e.g. `pause` on a timer that is already paused) returns
//! [`Transition::Ignored`] and leaves the state untouched; the UI may act on a
//! stale snapshot while a tick lands, and that must not be an error.
//!
//! Accepted transitions may emit [`ToolEvent`]s, which the session folds into
//! the daily counters read by the nudge engine.

pub mod checklist;
pub mod countdown;
pub mod dayplan;
pub mod registry;
pub mod reminder;

pub use checklist::{ChecklistData, ChecklistStep};
pub use countdown::{CountdownAction, CountdownData, CountdownStatus};
pub use dayplan::{BlockKind, DayPlanBlock, DayPlanData};
pub use registry::ToolInstanceRegistry;
pub use reminder::{ReminderData, ReminderStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ToolCard, ToolKind};

/// Side effects reported by tool machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEvent {
    /// Countdown left `ready`
    CountdownStarted,
    /// Focus phase ran out, break started
    PhaseComplete,
    /// Break ran out, countdown completed
    BreakComplete,
    /// A checklist step or day plan block was marked done
    TaskCompleted,
    /// Every checklist step is done
    ChecklistComplete,
    /// Every day plan block is done
    DayPlanComplete,
    /// A reminder draft was confirmed
    ReminderCreated,
}

/// Result of offering an action to a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Not valid from the current state; nothing changed
    Ignored,
    /// State changed, with any events emitted along the way
    Applied(Vec<ToolEvent>),
}

impl Transition {
    pub fn applied() -> Self {
        Transition::Applied(Vec::new())
    }

    pub fn emit(event: ToolEvent) -> Self {
        Transition::Applied(vec![event])
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn events(&self) -> &[ToolEvent] {
        match self {
            Transition::Ignored => &[],
            Transition::Applied(events) => events,
        }
    }
}

/// Interaction offered to a tool instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAction {
    Countdown(CountdownAction),
    ToggleStep(String),
    StartStep(usize),
    ToggleBlock(String),
    ConfirmReminder,
    ToggleReminder,
    SetReminderTime(Option<String>),
}

impl ToolAction {
    /// Tool type this action applies to
    pub fn target(&self) -> ToolKind {
        match self {
            ToolAction::Countdown(_) => ToolKind::Countdown,
            ToolAction::ToggleStep(_) | ToolAction::StartStep(_) => ToolKind::Checklist,
            ToolAction::ToggleBlock(_) => ToolKind::DayPlan,
            ToolAction::ConfirmReminder
            | ToolAction::ToggleReminder
            | ToolAction::SetReminderTime(_) => ToolKind::Reminder,
        }
    }
}

/// Apply an action to a card's live data.
///
/// An action aimed at a different tool type is ignored.
pub fn apply_action(data: &mut ToolCard, action: &ToolAction) -> Transition {
    match (data, action) {
        (ToolCard::Countdown(countdown), ToolAction::Countdown(a)) => countdown.apply(*a),
        (ToolCard::Checklist(checklist), ToolAction::ToggleStep(id)) => checklist.toggle_step(id),
        (ToolCard::Checklist(checklist), ToolAction::StartStep(index)) => {
            checklist.start_step(*index)
        }
        (ToolCard::DayPlan(plan), ToolAction::ToggleBlock(id)) => plan.toggle_block(id),
        (ToolCard::Reminder(reminder), ToolAction::ConfirmReminder) => reminder.confirm(),
        (ToolCard::Reminder(reminder), ToolAction::ToggleReminder) => reminder.toggle_active(),
        (ToolCard::Reminder(reminder), ToolAction::SetReminderTime(time)) => {
            reminder.set_time(time.clone())
        }
        (data, action) => {
            tracing::debug!(
                tool = %data.kind(),
                target = %action.target(),
                "Ignoring action aimed at another tool type"
            );
            Transition::Ignored
        }
    }
}

/// Live state behind a rendered tool card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInstance {
    /// Unique, type-prefixed id (e.g. "countdown-1f3a9c0e")
    pub id: String,
    pub data: ToolCard,
    pub created_at: DateTime<Utc>,
    /// False once retired; retired instances stay inspectable
    pub is_active: bool,
    /// Message whose card created this instance
    pub source_message_id: Option<String>,
}

impl ToolInstance {
    pub fn kind(&self) -> ToolKind {
        self.data.kind()
    }

    /// Whether this tool keeps the user busy (reminders are passive)
    pub fn occupies_focus(&self) -> bool {
        !matches!(self.data, ToolCard::Reminder(_))
    }

    /// Whether the machine reached its terminal state
    pub fn is_finished(&self) -> bool {
        match &self.data {
            ToolCard::Countdown(c) => c.status == CountdownStatus::Completed,
            ToolCard::Checklist(c) => c.is_all_complete(),
            ToolCard::DayPlan(p) => p.is_all_complete(),
            ToolCard::Reminder(_) => false,
        }
    }

    pub fn as_countdown(&self) -> Option<&CountdownData> {
        match &self.data {
            ToolCard::Countdown(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_checklist(&self) -> Option<&ChecklistData> {
        match &self.data {
            ToolCard::Checklist(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_dayplan(&self) -> Option<&DayPlanData> {
        match &self.data {
            ToolCard::DayPlan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_reminder(&self) -> Option<&ReminderData> {
        match &self.data {
            ToolCard::Reminder(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_action_is_ignored() {
        let mut card = ToolCard::Countdown(CountdownData::new(25, 5, "write"));
        let before = card.clone();

        let result = apply_action(&mut card, &ToolAction::ToggleStep("step-1".to_string()));
        assert_eq!(result, Transition::Ignored);
        assert_eq!(card, before);
    }

    #[test]
    fn test_action_dispatches_to_machine() {
        let mut card = ToolCard::Reminder(ReminderData::new("reminder-1", "stretch", None));
        let result = apply_action(&mut card, &ToolAction::ConfirmReminder);
        assert_eq!(result.events(), &[ToolEvent::ReminderCreated]);
    }

    #[test]
    fn test_action_targets() {
        assert_eq!(
            ToolAction::Countdown(CountdownAction::Tick).target(),
            ToolKind::Countdown
        );
        assert_eq!(ToolAction::StartStep(0).target(), ToolKind::Checklist);
        assert_eq!(
            ToolAction::ToggleBlock("block-1".into()).target(),
            ToolKind::DayPlan
        );
        assert_eq!(ToolAction::ToggleReminder.target(), ToolKind::Reminder);
    }
}
