//! # coachkit-core
//!
//! Core library for coachkit - a conversational focus coach.
//!
//! This library provides:
//! - Domain types for the transcript, tool cards and nudges
//! - The directive parser that turns a reply's JSON suffix into a tool card
//! - Tool state machines (countdown, checklist, day plan, reminder)
//! - The proactive nudge engine with per-trigger cooldowns
//! - [`ChatSession`], which coordinates all of the above behind one store
//! - Reply backends, SQLite storage, configuration and logging
//!
//! ## Architecture
//!
//! ```text
//! host ──▶ ChatSession ──▶ SessionStore (messages, tools, nudge, loading)
//!              │  ├──▶ ReplyBackend ──▶ DirectiveParser ──▶ ToolInstanceRegistry
//!              │  ├──▶ NudgeEngine + CooldownRegistry
//!              │  └──▶ TaskScheduler (ticks, auto-dismiss, idle check)
//!              └─ pump_timers() driven by the host
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use coachkit_core::{ChatSession, Config, HttpReplyBackend, SystemClock};
//!
//! # async fn run() -> coachkit_core::Result<()> {
//! let config = Config::load()?;
//! let backend = Arc::new(HttpReplyBackend::from_config(&config.reply)?);
//! let mut session = ChatSession::new(&config, backend, Arc::new(SystemClock))?;
//! session.send_message("Help me start my report").await?;
//! session.pump_timers()?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use backend::{HttpReplyBackend, ReplyBackend, ScriptedBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::Database;
pub use directive::{DirectiveParser, ParsedReply};
pub use error::{Error, Result};
pub use session::{ChatSession, PendingReply, SendOutcome, TimerEvent};
pub use types::*;

// Public modules
pub mod activity;
pub mod backend;
pub mod clock;
pub mod config;
pub mod db;
pub mod directive;
pub mod error;
pub mod logging;
pub mod nudge;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod tools;
pub mod types;
