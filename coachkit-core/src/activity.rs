//! User activity tracking.
//!
//! The tracker only keeps the time of the most recent input event. Clearing
//! the visible nudge on activity is the session's job
//! (see [`crate::session::ChatSession::update_activity`]).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Input event classes that count as engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    KeyPress,
    PointerMove,
    PointerDown,
    Scroll,
    Touch,
}

impl InputEvent {
    pub const ALL: [InputEvent; 5] = [
        InputEvent::KeyPress,
        InputEvent::PointerMove,
        InputEvent::PointerDown,
        InputEvent::Scroll,
        InputEvent::Touch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputEvent::KeyPress => "key_press",
            InputEvent::PointerMove => "pointer_move",
            InputEvent::PointerDown => "pointer_down",
            InputEvent::Scroll => "scroll",
            InputEvent::Touch => "touch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityTracker {
    last_activity: DateTime<Utc>,
    last_event: Option<InputEvent>,
}

impl ActivityTracker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            last_event: None,
        }
    }

    /// Record an input event at `now`.
    pub fn record(&mut self, event: InputEvent, now: DateTime<Utc>) {
        // Events can arrive slightly out of order from different sources.
        if now > self.last_activity {
            self.last_activity = now;
        }
        self.last_event = Some(event);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn last_event(&self) -> Option<InputEvent> {
        self.last_event
    }

    /// Time since the last event; never negative
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_activity).max(Duration::zero())
    }
}
