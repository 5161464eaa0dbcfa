//! Day plan machine.
//!
//! Blocks can be completed in any order; progress is recomputed from the
//! block flags on every read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ToolEvent, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Focus,
    Break,
    Meeting,
    Personal,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Focus => "focus",
            BlockKind::Break => "break",
            BlockKind::Meeting => "meeting",
            BlockKind::Personal => "personal",
        }
    }

    /// Lenient mapping from a directive's `type` label; unknown labels are focus time.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "break" | "pause" | "rest" => BlockKind::Break,
            "meeting" | "call" | "réunion" | "reunion" => BlockKind::Meeting,
            "personal" | "personnel" | "perso" => BlockKind::Personal,
            _ => BlockKind::Focus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlanBlock {
    pub id: String,
    /// Display start time as given (e.g. "09:00")
    pub start_time: String,
    /// Display duration as given (e.g. "1h30")
    pub duration_label: String,
    pub task: String,
    pub kind: BlockKind,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlanData {
    pub date: NaiveDate,
    pub blocks: Vec<DayPlanBlock>,
}

impl DayPlanData {
    pub fn new(date: NaiveDate, blocks: Vec<DayPlanBlock>) -> Self {
        Self { date, blocks }
    }

    pub fn completed_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.completed).count()
    }

    /// completed / total, 0 for an empty plan
    pub fn progress(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.blocks.len() as f64
    }

    pub fn is_all_complete(&self) -> bool {
        !self.blocks.is_empty() && self.blocks.iter().all(|b| b.completed)
    }

    pub fn toggle_block(&mut self, id: &str) -> Transition {
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == id) else {
            tracing::debug!(block_id = id, "Ignoring toggle for unknown day plan block");
            return Transition::Ignored;
        };

        block.completed = !block.completed;
        if !block.completed {
            return Transition::applied();
        }

        let mut events = vec![ToolEvent::TaskCompleted];
        if self.is_all_complete() {
            events.push(ToolEvent::DayPlanComplete);
        }
        Transition::Applied(events)
    }
}
