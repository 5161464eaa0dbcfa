//! Built-in nudge triggers.
//!
//! Declaration order matters: when two eligible triggers share a priority,
//! the one declared first wins.

use chrono::Duration;

use crate::types::{Locale, NudgeContext, ToolKind, TriggerKind};

/// Idle time after which the focus-timer nudge may fire
pub const IDLE_THRESHOLD_MINUTES: i64 = 5;

/// A named rule deciding when a nudge may be shown.
#[derive(Debug, Clone)]
pub struct NudgeTrigger {
    pub kind: TriggerKind,
    pub condition: fn(&NudgeContext) -> bool,
    pub suggested_tool: Option<ToolKind>,
    /// Higher wins
    pub priority: u8,
    pub cooldown: Duration,
}

impl NudgeTrigger {
    pub fn is_met(&self, ctx: &NudgeContext) -> bool {
        (self.condition)(ctx)
    }

    /// Text shown to the user when this trigger fires
    pub fn message(&self, locale: Locale) -> &'static str {
        nudge_message(self.kind, locale)
    }

    /// One-line explanation of the condition, for listings
    pub fn summary(&self) -> &'static str {
        match self.kind {
            TriggerKind::Idle5Min => "idle for 5 minutes with no active tool",
            TriggerKind::MorningCheckin => "between 8:00 and 10:00 before the first message",
            TriggerKind::EndOfDay => "between 17:00 and 18:00 after completing a task",
            TriggerKind::CelebrateWin => "every third task completed today",
            TriggerKind::TaskStuck => "latest message sounds stuck or overwhelmed",
        }
    }
}

fn idle_without_tools(ctx: &NudgeContext) -> bool {
    ctx.idle_duration() >= Duration::minutes(IDLE_THRESHOLD_MINUTES) && ctx.active_tool_count == 0
}

fn morning_checkin(ctx: &NudgeContext) -> bool {
    (8..10).contains(&ctx.local_hour()) && ctx.message_count == 0
}

fn end_of_day(ctx: &NudgeContext) -> bool {
    ctx.local_hour() == 17 && ctx.completed_tasks_today >= 1
}

fn celebrate_win(ctx: &NudgeContext) -> bool {
    ctx.completed_tasks_today > 0 && ctx.completed_tasks_today % 3 == 0
}

fn task_stuck(ctx: &NudgeContext) -> bool {
    ctx.frustration_detected
}

/// The process-wide trigger list, in declaration order.
pub fn builtin_triggers() -> Vec<NudgeTrigger> {
    vec![
        NudgeTrigger {
            kind: TriggerKind::Idle5Min,
            condition: idle_without_tools,
            suggested_tool: Some(ToolKind::Countdown),
            priority: 1,
            cooldown: Duration::minutes(15),
        },
        NudgeTrigger {
            kind: TriggerKind::MorningCheckin,
            condition: morning_checkin,
            suggested_tool: Some(ToolKind::DayPlan),
            priority: 3,
            cooldown: Duration::hours(24),
        },
        NudgeTrigger {
            kind: TriggerKind::EndOfDay,
            condition: end_of_day,
            suggested_tool: None,
            priority: 2,
            cooldown: Duration::hours(24),
        },
        NudgeTrigger {
            kind: TriggerKind::CelebrateWin,
            condition: celebrate_win,
            suggested_tool: None,
            priority: 4,
            cooldown: Duration::hours(2),
        },
        NudgeTrigger {
            kind: TriggerKind::TaskStuck,
            condition: task_stuck,
            suggested_tool: Some(ToolKind::Checklist),
            priority: 5,
            cooldown: Duration::minutes(10),
        },
    ]
}

pub fn nudge_message(kind: TriggerKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (TriggerKind::Idle5Min, Locale::En) => {
            "You've been quiet for a while. Want to start a 25-minute focus session?"
        }
        (TriggerKind::Idle5Min, Locale::Fr) => {
            "Ça fait un moment ! On lance une session de concentration de 25 minutes ?"
        }
        (TriggerKind::MorningCheckin, Locale::En) => "Good morning! Shall we plan your day together?",
        (TriggerKind::MorningCheckin, Locale::Fr) => "Bonjour ! On planifie ta journée ensemble ?",
        (TriggerKind::EndOfDay, Locale::En) => {
            "Nice work today. Take a minute to look back at what you got done."
        }
        (TriggerKind::EndOfDay, Locale::Fr) => {
            "Belle journée ! Prends une minute pour voir tout ce que tu as accompli."
        }
        (TriggerKind::CelebrateWin, Locale::En) => "Three more tasks done. Great momentum!",
        (TriggerKind::CelebrateWin, Locale::Fr) => "Encore trois tâches terminées, bravo !",
        (TriggerKind::TaskStuck, Locale::En) => "Feeling stuck? Let's break it into small steps.",
        (TriggerKind::TaskStuck, Locale::Fr) => "Tu bloques ? Découpons ça en petites étapes.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 3, hour, minute, 0)
            .unwrap()
    }

    fn ctx(now: DateTime<FixedOffset>) -> NudgeContext {
        NudgeContext {
            last_activity: now.with_timezone(&Utc),
            last_message_at: None,
            message_count: 0,
            active_tool_count: 0,
            now,
            completed_tasks_today: 0,
            countdowns_completed_today: 0,
            is_first_visit: false,
            frustration_detected: false,
        }
    }

    fn trigger(kind: TriggerKind) -> NudgeTrigger {
        builtin_triggers()
            .into_iter()
            .find(|t| t.kind == kind)
            .unwrap()
    }

    #[test]
    fn test_idle_requires_five_minutes_and_no_tools() {
        let t = trigger(TriggerKind::Idle5Min);
        let now = at(13, 0);
        let mut c = ctx(now);

        c.last_activity = (now - Duration::minutes(4)).with_timezone(&Utc);
        assert!(!t.is_met(&c));

        c.last_activity = (now - Duration::minutes(5)).with_timezone(&Utc);
        assert!(t.is_met(&c));

        c.active_tool_count = 1;
        assert!(!t.is_met(&c));
    }

    #[test]
    fn test_morning_window_uses_local_hour() {
        let t = trigger(TriggerKind::MorningCheckin);
        assert!(t.is_met(&ctx(at(8, 0))));
        assert!(t.is_met(&ctx(at(9, 59))));
        assert!(!t.is_met(&ctx(at(10, 0))));
        assert!(!t.is_met(&ctx(at(7, 59))));

        let mut c = ctx(at(9, 0));
        c.message_count = 2;
        assert!(!t.is_met(&c));
    }

    #[test]
    fn test_end_of_day_needs_a_completed_task() {
        let t = trigger(TriggerKind::EndOfDay);
        let mut c = ctx(at(17, 30));
        assert!(!t.is_met(&c));
        c.completed_tasks_today = 1;
        assert!(t.is_met(&c));
        c.now = at(18, 0);
        assert!(!t.is_met(&c));
    }

    #[test]
    fn test_celebrate_on_positive_multiples_of_three() {
        let t = trigger(TriggerKind::CelebrateWin);
        let mut c = ctx(at(12, 0));
        for (count, expected) in [(0, false), (2, false), (3, true), (4, false), (6, true)] {
            c.completed_tasks_today = count;
            assert_eq!(t.is_met(&c), expected, "count {count}");
        }
    }

    #[test]
    fn test_builtin_configuration() {
        let triggers = builtin_triggers();
        let kinds: Vec<_> = triggers.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriggerKind::Idle5Min,
                TriggerKind::MorningCheckin,
                TriggerKind::EndOfDay,
                TriggerKind::CelebrateWin,
                TriggerKind::TaskStuck,
            ]
        );
        assert_eq!(trigger(TriggerKind::Idle5Min).cooldown, Duration::minutes(15));
        assert_eq!(
            trigger(TriggerKind::TaskStuck).suggested_tool,
            Some(ToolKind::Checklist)
        );
        assert_eq!(trigger(TriggerKind::EndOfDay).suggested_tool, None);
    }
}
