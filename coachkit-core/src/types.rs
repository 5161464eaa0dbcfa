//! Core domain types for coachkit
//!
//! These types describe the chat transcript, the tool cards embedded in it,
//! and the proactive nudges surfaced next to it.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Message** | One transcript entry (user, assistant, or system) |
//! | **Tool card** | A structured widget attached to an assistant message |
//! | **Tool instance** | The live state behind a rendered tool card |
//! | **Directive** | The fenced JSON suffix of a reply that requests a tool |
//! | **Nudge** | A proactive, time-boxed suggestion shown without a request |
//! | **Trigger** | A named rule deciding when a nudge may be shown |
//!
//! A tool card's data is the *initial snapshot* taken when the reply was
//! parsed. Interaction never mutates the message; it mutates the matching
//! [`crate::tools::ToolInstance`].

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::tools::{ChecklistData, CountdownData, DayPlanData, ReminderData};

// ============================================
// Locale
// ============================================

/// Language for user-facing strings and frustration keywords
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }

    /// Generic, non-technical message shown when the reply backend fails
    pub fn reply_error_message(&self) -> &'static str {
        match self {
            Locale::En => "Sorry, I couldn't reply just now. Please try again in a moment.",
            Locale::Fr => {
                "Désolé, je n'ai pas pu répondre pour le moment. Réessaie dans un instant."
            }
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            _ => Err(format!("unknown locale: {}", s)),
        }
    }
}

// ============================================
// Messages
// ============================================

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Local notices (e.g. backend failures); never sent to the backend
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transcript entry.
///
/// Immutable once appended, apart from the display-only `expanded` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_card: Option<ToolCard>,
    /// Whether a long message is shown in full
    #[serde(default)]
    pub expanded: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: format!("msg-{}", uuid::Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp,
            tool_card: None,
            expanded: false,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, content, timestamp)
    }

    pub fn system(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::System, content, timestamp)
    }

    pub fn with_tool_card(mut self, card: Option<ToolCard>) -> Self {
        self.tool_card = card;
        self
    }
}

/// One `{role, content}` pair handed to the reply backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

// ============================================
// Tool cards
// ============================================

/// The four tool types a directive can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Countdown,
    Checklist,
    DayPlan,
    Reminder,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Countdown,
        ToolKind::Checklist,
        ToolKind::DayPlan,
        ToolKind::Reminder,
    ];

    /// Wire name, also used as the tool instance id prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Countdown => "countdown",
            ToolKind::Checklist => "checklist",
            ToolKind::DayPlan => "dayplan",
            ToolKind::Reminder => "reminder",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Countdown => "Focus timer",
            ToolKind::Checklist => "Checklist",
            ToolKind::DayPlan => "Day plan",
            ToolKind::Reminder => "Reminder",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "countdown" => Ok(ToolKind::Countdown),
            "checklist" => Ok(ToolKind::Checklist),
            "dayplan" => Ok(ToolKind::DayPlan),
            "reminder" => Ok(ToolKind::Reminder),
            _ => Err(format!("unknown tool: {}", s)),
        }
    }
}

/// A structured widget attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ToolCard {
    Countdown(CountdownData),
    Checklist(ChecklistData),
    DayPlan(DayPlanData),
    Reminder(ReminderData),
}

impl ToolCard {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCard::Countdown(_) => ToolKind::Countdown,
            ToolCard::Checklist(_) => ToolKind::Checklist,
            ToolCard::DayPlan(_) => ToolKind::DayPlan,
            ToolCard::Reminder(_) => ToolKind::Reminder,
        }
    }
}

// ============================================
// Nudges
// ============================================

/// Built-in nudge trigger types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    #[serde(rename = "idle_5min")]
    Idle5Min,
    #[serde(rename = "morning_checkin")]
    MorningCheckin,
    #[serde(rename = "end_of_day")]
    EndOfDay,
    #[serde(rename = "celebrate_win")]
    CelebrateWin,
    #[serde(rename = "task_stuck")]
    TaskStuck,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Idle5Min => "idle_5min",
            TriggerKind::MorningCheckin => "morning_checkin",
            TriggerKind::EndOfDay => "end_of_day",
            TriggerKind::CelebrateWin => "celebrate_win",
            TriggerKind::TaskStuck => "task_stuck",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle_5min" => Ok(TriggerKind::Idle5Min),
            "morning_checkin" => Ok(TriggerKind::MorningCheckin),
            "end_of_day" => Ok(TriggerKind::EndOfDay),
            "celebrate_win" => Ok(TriggerKind::CelebrateWin),
            "task_stuck" => Ok(TriggerKind::TaskStuck),
            _ => Err(format!("unknown trigger: {}", s)),
        }
    }
}

/// A proactive suggestion currently (or formerly) on screen.
///
/// At most one nudge is live per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nudge {
    pub id: String,
    pub kind: TriggerKind,
    pub message: String,
    pub suggested_tool: Option<ToolKind>,
    pub shown_at: DateTime<Utc>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

/// Read-only snapshot the nudge engine evaluates triggers against.
///
/// Assembled by the host; the engine never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct NudgeContext {
    pub last_activity: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub message_count: usize,
    /// Active countdown/checklist/dayplan instances (reminders excluded)
    pub active_tool_count: usize,
    /// Current local time, including the user's UTC offset
    pub now: DateTime<FixedOffset>,
    pub completed_tasks_today: u32,
    pub countdowns_completed_today: u32,
    pub is_first_visit: bool,
    /// Latest user message contained a frustration keyword (one cycle only)
    pub frustration_detected: bool,
}

impl NudgeContext {
    /// Time since the last recorded input event
    pub fn idle_duration(&self) -> chrono::Duration {
        self.now.with_timezone(&Utc) - self.last_activity
    }

    /// Hour of day in the user's local time
    pub fn local_hour(&self) -> u32 {
        self.now.hour()
    }
}

// ============================================
// Daily counters
// ============================================

/// Per-day completion counters feeding the nudge context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed_tasks: u32,
    pub countdowns_completed: u32,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            completed_tasks: 0,
            countdowns_completed: 0,
        }
    }

    /// Reset the counters when the local date has moved on.
    ///
    /// Returns true if a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        *self = Self::new(today);
        true
    }
}
