//! Checklist machine.
//!
//! Steps keep their original order and ids for the lifetime of the card.
//! The active step is a pointer, recomputed whenever a step gets completed:
//! it moves to the first incomplete step after the one just toggled,
//! wrapping to the first incomplete step overall. When nothing is
//! left the checklist is all-complete and there is no active step.

use serde::{Deserialize, Serialize};

use super::{ToolEvent, Transition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistStep {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistData {
    pub title: String,
    pub steps: Vec<ChecklistStep>,
    /// Index into `steps`; `None` when empty or all complete
    pub active_step: Option<usize>,
}

impl ChecklistData {
    /// Build a checklist with generated ids `step-1..n`, first step active.
    pub fn new<S: Into<String>>(title: impl Into<String>, steps: impl IntoIterator<Item = S>) -> Self {
        let steps: Vec<ChecklistStep> = steps
            .into_iter()
            .enumerate()
            .map(|(i, text)| ChecklistStep {
                id: format!("step-{}", i + 1),
                text: text.into(),
                completed: false,
                estimated_minutes: None,
            })
            .collect();
        let active_step = if steps.is_empty() { None } else { Some(0) };
        Self {
            title: title.into(),
            steps,
            active_step,
        }
    }

    pub fn active(&self) -> Option<&ChecklistStep> {
        self.active_step.and_then(|i| self.steps.get(i))
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    /// Derived terminal display state; an empty checklist is never complete
    pub fn is_all_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.completed)
    }

    pub fn progress(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.steps.len() as f64
    }

    fn next_incomplete_after(&self, index: usize) -> Option<usize> {
        let len = self.steps.len();
        (1..=len)
            .map(|offset| (index + offset) % len)
            .find(|&i| !self.steps[i].completed)
    }

    /// Flip a step's completion flag.
    pub fn toggle_step(&mut self, id: &str) -> Transition {
        let Some(index) = self.steps.iter().position(|s| s.id == id) else {
            tracing::debug!(step_id = id, "Ignoring toggle for unknown checklist step");
            return Transition::Ignored;
        };

        let step = &mut self.steps[index];
        step.completed = !step.completed;

        if !step.completed {
            // Reopened: ordering is untouched, but a finished list needs a pointer again.
            if self.active_step.is_none() {
                self.active_step = Some(index);
            }
            return Transition::applied();
        }

        let mut events = vec![ToolEvent::TaskCompleted];
        self.active_step = self.next_incomplete_after(index);
        if self.is_all_complete() {
            self.active_step = None;
            events.push(ToolEvent::ChecklistComplete);
        }
        Transition::Applied(events)
    }

    /// Point the active step at `index`. Advisory only: completion is untouched.
    pub fn start_step(&mut self, index: usize) -> Transition {
        if index >= self.steps.len() || self.active_step == Some(index) {
            return Transition::Ignored;
        }
        self.active_step = Some(index);
        Transition::applied()
    }
}
