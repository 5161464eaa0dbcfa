//! Countdown (focus timer) machine.
//!
//! ```text
//! ready ──start──▶ running ──0s──▶ break ──0s──▶ completed
//!                   │    ▲
//!              pause│    │resume
//!                   ▼    │
//!                   paused
//! ```
//!
//! `reset` is valid from every state and returns to `ready` with the full
//! focus duration. The break is mandatory: a focus phase never completes
//! without passing through it.
//!
//! The machine itself is clock-free. The session schedules a one-second tick
//! while [`CountdownData::is_ticking`] and feeds each delivery to
//! [`CountdownData::tick`].

use serde::{Deserialize, Serialize};

use super::{ToolEvent, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownStatus {
    Ready,
    Running,
    Paused,
    Break,
    Completed,
}

impl CountdownStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownStatus::Ready => "ready",
            CountdownStatus::Running => "running",
            CountdownStatus::Paused => "paused",
            CountdownStatus::Break => "break",
            CountdownStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownAction {
    Start,
    Pause,
    Resume,
    Reset,
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownData {
    pub duration_minutes: u32,
    pub break_minutes: u32,
    pub status: CountdownStatus,
    /// Invariant: `0 <= remaining_seconds <= phase_total_seconds()`
    pub remaining_seconds: u32,
    pub task: String,
}

impl CountdownData {
    pub fn new(duration_minutes: u32, break_minutes: u32, task: impl Into<String>) -> Self {
        Self {
            duration_minutes,
            break_minutes,
            status: CountdownStatus::Ready,
            remaining_seconds: duration_minutes * 60,
            task: task.into(),
        }
    }

    /// Length of the current phase in seconds
    pub fn phase_total_seconds(&self) -> u32 {
        match self.status {
            CountdownStatus::Break => self.break_minutes * 60,
            _ => self.duration_minutes * 60,
        }
    }

    /// Whether the session should be delivering ticks
    pub fn is_ticking(&self) -> bool {
        matches!(self.status, CountdownStatus::Running | CountdownStatus::Break)
    }

    /// Fraction of the current phase elapsed, in `[0, 1]`
    pub fn phase_progress(&self) -> f64 {
        let total = self.phase_total_seconds();
        if total == 0 {
            return 1.0;
        }
        1.0 - f64::from(self.remaining_seconds) / f64::from(total)
    }

    pub fn apply(&mut self, action: CountdownAction) -> Transition {
        match action {
            CountdownAction::Start => self.start(),
            CountdownAction::Pause => self.pause(),
            CountdownAction::Resume => self.resume(),
            CountdownAction::Reset => self.reset(),
            CountdownAction::Tick => self.tick(),
        }
    }

    pub fn start(&mut self) -> Transition {
        if self.status != CountdownStatus::Ready {
            return Transition::Ignored;
        }
        self.status = CountdownStatus::Running;
        Transition::emit(ToolEvent::CountdownStarted)
    }

    pub fn pause(&mut self) -> Transition {
        if self.status != CountdownStatus::Running {
            return Transition::Ignored;
        }
        self.status = CountdownStatus::Paused;
        Transition::applied()
    }

    pub fn resume(&mut self) -> Transition {
        if self.status != CountdownStatus::Paused {
            return Transition::Ignored;
        }
        self.status = CountdownStatus::Running;
        Transition::applied()
    }

    /// Back to `ready` with the full focus duration. Always accepted.
    pub fn reset(&mut self) -> Transition {
        self.status = CountdownStatus::Ready;
        self.remaining_seconds = self.duration_minutes * 60;
        Transition::applied()
    }

    /// Advance one second. Ignored unless running or on break.
    pub fn tick(&mut self) -> Transition {
        if !self.is_ticking() {
            return Transition::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Transition::applied();
        }

        match self.status {
            CountdownStatus::Running => {
                self.status = CountdownStatus::Break;
                self.remaining_seconds = self.break_minutes * 60;
                Transition::emit(ToolEvent::PhaseComplete)
            }
            _ => {
                self.status = CountdownStatus::Completed;
                Transition::emit(ToolEvent::BreakComplete)
            }
        }
    }
}

/// Format seconds as `MM:SS`
pub fn format_remaining(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
