//! Tool directive parsing
//!
//! Assistant replies may end with a fenced JSON block asking the widget to
//! show a tool card:
//!
//! ````text
//! Let's focus.
//! ```json
//! {"tool": "countdown", "params": {"duration": 25, "task": "write report"}}
//! ```
//! ````
//!
//! [`DirectiveParser::parse`] splits such a reply into the text to display
//! and the typed [`ToolCard`]. Only a block at the very end of the reply
//! counts. Anything that fails to decode (bad JSON, unknown tool, missing
//! required params) leaves the reply untouched and yields no card; the
//! failure is logged at debug level and never surfaced.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tools::{
    BlockKind, ChecklistData, ChecklistStep, CountdownData, DayPlanBlock, DayPlanData,
    ReminderData,
};
use crate::types::{ToolCard, ToolKind};

const DEFAULT_DURATION_MINUTES: u32 = 25;
const DEFAULT_BREAK_MINUTES: u32 = 5;
const MAX_MINUTES: f64 = 24.0 * 60.0;

/// Reply split into display text and an optional tool card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReply {
    pub display_text: String,
    pub tool_card: Option<ToolCard>,
}

impl ParsedReply {
    fn plain(raw: &str) -> Self {
        Self {
            display_text: raw.to_string(),
            tool_card: None,
        }
    }
}

/// Fenced block at the end of the text. The body may not contain a fence,
/// so the match is always the last block.
fn trailing_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)[ \t]*\r?\n?((?:[^`]|`[^`]|``[^`])*?)\s*```\s*\z")
            .expect("directive fence regex is valid")
    })
}

// ============================================
// Wire format
// ============================================

#[derive(Debug, Deserialize)]
struct Envelope {
    tool: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountdownParams {
    duration: Option<f64>,
    task: Option<String>,
    #[serde(rename = "breakDuration", alias = "break_duration")]
    break_duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepParam {
    Text(String),
    Detailed {
        text: String,
        #[serde(default, rename = "estimatedMinutes", alias = "estimated_minutes")]
        estimated_minutes: Option<u32>,
    },
}

#[derive(Debug, Deserialize)]
struct ChecklistParams {
    #[serde(alias = "title")]
    task: String,
    steps: Vec<StepParam>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationParam {
    Label(String),
    Minutes(f64),
}

#[derive(Debug, Deserialize)]
struct BlockParams {
    #[serde(default)]
    time: String,
    task: String,
    #[serde(default)]
    duration: Option<DurationParam>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DayPlanParams {
    #[serde(default)]
    date: Option<NaiveDate>,
    blocks: Vec<BlockParams>,
}

#[derive(Debug, Deserialize)]
struct ReminderParams {
    text: String,
    #[serde(default)]
    time: Option<String>,
}

// ============================================
// Parser
// ============================================

/// Splits assistant replies into display text and tool cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveParser;

impl DirectiveParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse using today's local date for day plans without one.
    pub fn parse(&self, raw: &str) -> ParsedReply {
        self.parse_at(raw, Local::now().date_naive())
    }

    /// Parse with an explicit "today".
    pub fn parse_at(&self, raw: &str, today: NaiveDate) -> ParsedReply {
        let Some(captures) = trailing_fence().captures(raw) else {
            return ParsedReply::plain(raw);
        };
        let (Some(block), Some(body)) = (captures.get(0), captures.get(1)) else {
            return ParsedReply::plain(raw);
        };

        match decode(body.as_str(), today) {
            Ok(card) => {
                tracing::debug!(tool = %card.kind(), "Parsed tool directive");
                ParsedReply {
                    display_text: raw[..block.start()].trim_end().to_string(),
                    tool_card: Some(card),
                }
            }
            Err(reason) => {
                tracing::debug!(%reason, "Ignoring malformed tool directive");
                ParsedReply::plain(raw)
            }
        }
    }
}

fn decode(body: &str, today: NaiveDate) -> std::result::Result<ToolCard, String> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| format!("invalid directive JSON: {e}"))?;
    let kind: ToolKind = envelope.tool.parse()?;

    let params = match envelope.params {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };

    match kind {
        ToolKind::Countdown => {
            let p: CountdownParams = from_params(params)?;
            let duration = minutes(p.duration, DEFAULT_DURATION_MINUTES, 1)?;
            let break_minutes = minutes(p.break_duration, DEFAULT_BREAK_MINUTES, 0)?;
            Ok(ToolCard::Countdown(CountdownData::new(
                duration,
                break_minutes,
                p.task.unwrap_or_default().trim(),
            )))
        }
        ToolKind::Checklist => {
            let p: ChecklistParams = from_params(params)?;
            if p.steps.is_empty() {
                return Err("checklist has no steps".to_string());
            }
            let steps = p
                .steps
                .into_iter()
                .enumerate()
                .map(|(i, step)| {
                    let (text, estimated_minutes) = match step {
                        StepParam::Text(text) => (text, None),
                        StepParam::Detailed {
                            text,
                            estimated_minutes,
                        } => (text, estimated_minutes),
                    };
                    ChecklistStep {
                        id: format!("step-{}", i + 1),
                        text,
                        completed: false,
                        estimated_minutes,
                    }
                })
                .collect();
            Ok(ToolCard::Checklist(ChecklistData {
                title: p.task,
                steps,
                active_step: Some(0),
            }))
        }
        ToolKind::DayPlan => {
            let p: DayPlanParams = from_params(params)?;
            if p.blocks.is_empty() {
                return Err("day plan has no blocks".to_string());
            }
            let blocks = p
                .blocks
                .into_iter()
                .enumerate()
                .map(|(i, b)| DayPlanBlock {
                    id: format!("block-{}", i + 1),
                    start_time: b.time,
                    duration_label: match b.duration {
                        Some(DurationParam::Label(label)) => label,
                        Some(DurationParam::Minutes(m)) => format!("{} min", m.round()),
                        None => String::new(),
                    },
                    task: b.task,
                    kind: b
                        .kind
                        .as_deref()
                        .map(BlockKind::from_label)
                        .unwrap_or(BlockKind::Focus),
                    completed: false,
                })
                .collect();
            Ok(ToolCard::DayPlan(DayPlanData::new(
                p.date.unwrap_or(today),
                blocks,
            )))
        }
        ToolKind::Reminder => {
            let p: ReminderParams = from_params(params)?;
            let text = p.text.trim();
            if text.is_empty() {
                return Err("reminder text is empty".to_string());
            }
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            Ok(ToolCard::Reminder(ReminderData::new(
                format!("reminder-{}", &suffix[..8]),
                text,
                p.time.filter(|t| !t.trim().is_empty()),
            )))
        }
    }
}

fn from_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> std::result::Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("invalid params: {e}"))
}

/// Whole minutes from an optional JSON number, rejecting out-of-range values.
fn minutes(value: Option<f64>, default: u32, min: u32) -> std::result::Result<u32, String> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !value.is_finite() || value < f64::from(min) || value > MAX_MINUTES {
        return Err(format!("minutes out of range: {value}"));
    }
    Ok(value.round() as u32)
}
