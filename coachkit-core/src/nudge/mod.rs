//! Proactive nudges
//!
//! A nudge is a suggestion shown without the user asking. The session builds
//! a [`NudgeContext`](crate::types::NudgeContext) on a fixed interval and asks
//! the [`NudgeEngine`] which trigger, if any, should fire. Each trigger has its
//! own cooldown tracked in a [`CooldownRegistry`].

pub mod engine;
pub mod frustration;
pub mod triggers;

pub use engine::{CooldownRegistry, NudgeEngine};
pub use frustration::FrustrationDetector;
pub use triggers::{builtin_triggers, nudge_message, NudgeTrigger, IDLE_THRESHOLD_MINUTES};
