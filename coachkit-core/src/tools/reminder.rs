//! Reminder machine.
//!
//! A reminder starts as a draft the user can still edit. Confirming it is
//! the only transition that counts as "reminder created"; afterwards it can
//! be switched on and off. Deleting removes the instance from the registry
//! altogether, so there is no deleted status here.

use serde::{Deserialize, Serialize};

use super::{ToolEvent, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Draft,
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderData {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub is_active: bool,
    pub confirmed: bool,
}

impl ReminderData {
    pub fn new(id: impl Into<String>, text: impl Into<String>, time: Option<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            time,
            is_active: false,
            confirmed: false,
        }
    }

    pub fn status(&self) -> ReminderStatus {
        match (self.confirmed, self.is_active) {
            (false, _) => ReminderStatus::Draft,
            (true, true) => ReminderStatus::Active,
            (true, false) => ReminderStatus::Inactive,
        }
    }

    /// draft → confirmed (and active)
    pub fn confirm(&mut self) -> Transition {
        if self.confirmed {
            return Transition::Ignored;
        }
        self.confirmed = true;
        self.is_active = true;
        Transition::emit(ToolEvent::ReminderCreated)
    }

    /// active ⇄ inactive; drafts cannot be toggled
    pub fn toggle_active(&mut self) -> Transition {
        if !self.confirmed {
            return Transition::Ignored;
        }
        self.is_active = !self.is_active;
        Transition::applied()
    }

    /// Edit the time while still a draft
    pub fn set_time(&mut self, time: Option<String>) -> Transition {
        if self.confirmed || self.time == time {
            return Transition::Ignored;
        }
        self.time = time;
        Transition::applied()
    }
}
