//! Database repository layer
//!
//! Provides insert operations for form submissions and load/save for the
//! per-day activity counters.

use crate::error::{Error, Result};
use crate::types::DailyStats;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use super::forms::{ContactMessage, ExpertApplication, QuizResult, Submission, WaitlistSignup};

/// Row counts per submission table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionCounts {
    pub contact_messages: i64,
    pub waitlist_signups: i64,
    pub expert_applications: i64,
    pub quiz_results: i64,
}

/// Database handle with connection
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Submissions
    // ============================================

    /// Validate and store a contact message. Returns the new row id.
    pub fn insert_contact_message(&self, msg: &ContactMessage) -> Result<i64> {
        msg.validate()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO contact_messages (name, email, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                msg.name.trim(),
                msg.email.trim(),
                msg.message,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Validate and store a waitlist signup. An email can only sign up once.
    pub fn insert_waitlist_signup(&self, signup: &WaitlistSignup) -> Result<i64> {
        signup.validate()?;
        let email = signup.email.trim().to_lowercase();
        let conn = self.conn.lock().unwrap();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM waitlist_signups WHERE email = ?1",
                [&email],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::validation("email", "is already on the waitlist"));
        }

        conn.execute(
            "INSERT INTO waitlist_signups (email, name, source, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![email, signup.name, signup.source, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Validate and store an expert application. Returns the new row id.
    pub fn insert_expert_application(&self, app: &ExpertApplication) -> Result<i64> {
        app.validate()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO expert_applications (name, email, expertise, bio, link_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                app.name.trim(),
                app.email.trim(),
                app.expertise,
                app.bio,
                app.link_url,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Validate and store a quiz result. Returns the new row id.
    pub fn insert_quiz_result(&self, result: &QuizResult) -> Result<i64> {
        result.validate()?;
        let answers = serde_json::to_string(&result.answers)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO quiz_results (email, profile, score, answers, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                result.email.as_deref().map(str::trim),
                result.profile,
                result.score,
                answers,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store any submission in its table.
    pub fn insert_submission(&self, submission: &Submission) -> Result<i64> {
        let id = match submission {
            Submission::Contact(s) => self.insert_contact_message(s)?,
            Submission::Waitlist(s) => self.insert_waitlist_signup(s)?,
            Submission::Expert(s) => self.insert_expert_application(s)?,
            Submission::Quiz(s) => self.insert_quiz_result(s)?,
        };
        tracing::info!(table = submission.table(), id, "Stored submission");
        Ok(id)
    }

    pub fn submission_counts(&self) -> Result<SubmissionCounts> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        };
        Ok(SubmissionCounts {
            contact_messages: count("contact_messages")?,
            waitlist_signups: count("waitlist_signups")?,
            expert_applications: count("expert_applications")?,
            quiz_results: count("quiz_results")?,
        })
    }

    // ============================================
    // Daily stats
    // ============================================

    /// Counters for `date`, zeroed if nothing was recorded that day.
    pub fn load_daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(u32, u32)> = conn
            .query_row(
                "SELECT completed_tasks, countdowns_completed FROM daily_stats WHERE date = ?1",
                [date.to_string()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((completed_tasks, countdowns_completed)) => DailyStats {
                date,
                completed_tasks,
                countdowns_completed,
            },
            None => DailyStats::new(date),
        })
    }

    pub fn save_daily_stats(&self, stats: &DailyStats) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO daily_stats (date, completed_tasks, countdowns_completed, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(date) DO UPDATE SET
                completed_tasks = excluded.completed_tasks,
                countdowns_completed = excluded.countdowns_completed,
                updated_at = excluded.updated_at
            "#,
            params![
                stats.date.to_string(),
                stats.completed_tasks,
                stats.countdowns_completed,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Whether any day has been recorded, i.e. this is not the first visit
    pub fn has_any_visit(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM daily_stats", [], |r| r.get(0))?;
        Ok(count > 0)
    }
}
