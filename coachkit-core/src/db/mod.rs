//! Database layer for coachkit
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Validated inserts for back-office form submissions
//! - Per-day activity counters

pub mod forms;
pub mod repo;
pub mod schema;

pub use forms::{ContactMessage, ExpertApplication, QuizResult, Submission, WaitlistSignup};
pub use repo::{Database, SubmissionCounts};
