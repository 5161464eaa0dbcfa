//! Trigger arbitration.
//!
//! ```text
//! NudgeContext ──▶ condition(ctx)? ──▶ cooldown elapsed? ──▶ highest priority
//!                                                             (ties: first declared)
//! ```
//!
//! The engine is read-only over both the context and the cooldown registry;
//! [`NudgeEngine::fire`] is the single place that writes a cooldown, and it
//! does so before the nudge exists, so a re-evaluation in the same tick sees
//! the trigger as cooling down.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::triggers::{builtin_triggers, NudgeTrigger};
use crate::types::{Locale, Nudge, NudgeContext, TriggerKind};

/// Last fire time per trigger type
#[derive(Debug, Clone, Default)]
pub struct CooldownRegistry {
    last_fired: HashMap<TriggerKind, DateTime<Utc>>,
}

impl CooldownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fired(&self, kind: TriggerKind) -> Option<DateTime<Utc>> {
        self.last_fired.get(&kind).copied()
    }

    pub fn record(&mut self, kind: TriggerKind, at: DateTime<Utc>) {
        self.last_fired.insert(kind, at);
    }

    /// A trigger that never fired is always eligible.
    pub fn is_eligible(&self, trigger: &NudgeTrigger, now: DateTime<Utc>) -> bool {
        match self.last_fired(trigger.kind) {
            Some(at) => now - at >= trigger.cooldown,
            None => true,
        }
    }
}

/// Selects at most one nudge from a fixed trigger list.
#[derive(Debug, Clone)]
pub struct NudgeEngine {
    triggers: Vec<NudgeTrigger>,
    disabled: HashSet<TriggerKind>,
}

impl NudgeEngine {
    /// Engine over the built-in triggers
    pub fn new() -> Self {
        Self::with_triggers(builtin_triggers())
    }

    /// Engine over a custom trigger list (order is the tie-break order)
    pub fn with_triggers(triggers: Vec<NudgeTrigger>) -> Self {
        Self {
            triggers,
            disabled: HashSet::new(),
        }
    }

    pub fn disable(&mut self, kind: TriggerKind) {
        tracing::info!(trigger = %kind, "Disabled nudge trigger");
        self.disabled.insert(kind);
    }

    pub fn triggers(&self) -> &[NudgeTrigger] {
        &self.triggers
    }

    pub fn is_enabled(&self, kind: TriggerKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Pick the trigger that should fire now, if any.
    pub fn evaluate(
        &self,
        ctx: &NudgeContext,
        cooldowns: &CooldownRegistry,
    ) -> Option<&NudgeTrigger> {
        let now = ctx.now.with_timezone(&Utc);
        let mut best: Option<&NudgeTrigger> = None;

        for trigger in &self.triggers {
            if !self.is_enabled(trigger.kind)
                || !trigger.is_met(ctx)
                || !cooldowns.is_eligible(trigger, now)
            {
                continue;
            }
            // Strictly greater: on a tie the earlier declaration stays.
            if best.map_or(true, |b| trigger.priority > b.priority) {
                best = Some(trigger);
            }
        }

        best
    }

    /// Evaluate and, if a trigger wins, record its cooldown and build the nudge.
    pub fn fire(
        &self,
        ctx: &NudgeContext,
        cooldowns: &mut CooldownRegistry,
        locale: Locale,
    ) -> Option<Nudge> {
        let trigger = self.evaluate(ctx, cooldowns)?;
        let now = ctx.now.with_timezone(&Utc);
        cooldowns.record(trigger.kind, now);

        tracing::info!(
            trigger = %trigger.kind,
            priority = trigger.priority,
            suggested_tool = ?trigger.suggested_tool,
            "Nudge trigger fired"
        );

        Some(Nudge {
            id: format!("nudge-{}", uuid::Uuid::new_v4().simple()),
            kind: trigger.kind,
            message: trigger.message(locale).to_string(),
            suggested_tool: trigger.suggested_tool,
            shown_at: now,
            dismissed_at: None,
        })
    }
}

impl Default for NudgeEngine {
    fn default() -> Self {
        Self::new()
    }
}
