//! Back-office form submissions and their validation.
//!
//! Each submission is a flat record. `validate()` runs before every insert;
//! the first failing field is reported as [`Error::Validation`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 254;
const MAX_MESSAGE: usize = 5000;
const MAX_BIO: usize = 2000;
const MAX_SHORT: usize = 200;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

fn required(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    optional(field, value, max)
}

fn optional(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

fn email(field: &str, value: &str) -> Result<()> {
    required(field, value, MAX_EMAIL)?;
    if !email_pattern().is_match(value.trim()) {
        return Err(Error::validation(field, "is not a valid email address"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactMessage {
    pub fn validate(&self) -> Result<()> {
        required("name", &self.name, MAX_NAME)?;
        email("email", &self.email)?;
        required("message", &self.message, MAX_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistSignup {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Where the signup came from (landing page, quiz, ...)
    #[serde(default)]
    pub source: Option<String>,
}

impl WaitlistSignup {
    pub fn validate(&self) -> Result<()> {
        email("email", &self.email)?;
        if let Some(name) = &self.name {
            optional("name", name, MAX_NAME)?;
        }
        if let Some(source) = &self.source {
            optional("source", source, MAX_SHORT)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertApplication {
    pub name: String,
    pub email: String,
    pub expertise: String,
    pub bio: String,
    #[serde(default, alias = "linkUrl")]
    pub link_url: Option<String>,
}

impl ExpertApplication {
    pub fn validate(&self) -> Result<()> {
        required("name", &self.name, MAX_NAME)?;
        email("email", &self.email)?;
        required("expertise", &self.expertise, MAX_SHORT)?;
        required("bio", &self.bio, MAX_BIO)?;
        if let Some(url) = &self.link_url {
            optional("link_url", url, MAX_SHORT)?;
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::validation("link_url", "must be an http(s) URL"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    #[serde(default)]
    pub email: Option<String>,
    pub profile: String,
    pub score: u32,
    /// Raw answers, an object or array as submitted
    pub answers: serde_json::Value,
}

impl QuizResult {
    pub fn validate(&self) -> Result<()> {
        if let Some(address) = &self.email {
            email("email", address)?;
        }
        required("profile", &self.profile, MAX_SHORT)?;
        if !(self.answers.is_object() || self.answers.is_array()) {
            return Err(Error::validation("answers", "must be an object or array"));
        }
        Ok(())
    }
}

/// Any of the four submission types, tagged by `kind` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    Contact(ContactMessage),
    Waitlist(WaitlistSignup),
    Expert(ExpertApplication),
    Quiz(QuizResult),
}

impl Submission {
    pub fn validate(&self) -> Result<()> {
        match self {
            Submission::Contact(s) => s.validate(),
            Submission::Waitlist(s) => s.validate(),
            Submission::Expert(s) => s.validate(),
            Submission::Quiz(s) => s.validate(),
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Submission::Contact(_) => "contact_messages",
            Submission::Waitlist(_) => "waitlist_signups",
            Submission::Expert(_) => "expert_applications",
            Submission::Quiz(_) => "quiz_results",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(result: Result<()>) -> String {
        match result {
            Err(Error::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_contact_requires_all_fields() {
        let ok = ContactMessage {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            message: "Hello".into(),
        };
        assert!(ok.validate().is_ok());

        let mut bad = ok.clone();
        bad.name = "  ".into();
        assert_eq!(field_of(bad.validate()), "name");

        let mut bad = ok.clone();
        bad.email = "not-an-email".into();
        assert_eq!(field_of(bad.validate()), "email");

        let mut bad = ok;
        bad.message = "x".repeat(MAX_MESSAGE + 1);
        assert_eq!(field_of(bad.validate()), "message");
    }

    #[test]
    fn test_expert_link_must_be_http() {
        let mut application = ExpertApplication {
            name: "Sam".into(),
            email: "sam@example.org".into(),
            expertise: "ADHD coaching".into(),
            bio: "Ten years of practice.".into(),
            link_url: Some("ftp://example.org".into()),
        };
        assert_eq!(field_of(application.validate()), "link_url");
        application.link_url = Some("https://example.org".into());
        assert!(application.validate().is_ok());
    }

    #[test]
    fn test_submission_is_tagged_by_kind() {
        let submission: Submission = serde_json::from_value(json!({
            "kind": "quiz",
            "profile": "sprinter",
            "score": 7,
            "answers": {"q1": "b"}
        }))
        .unwrap();
        assert_eq!(submission.table(), "quiz_results");
        assert!(submission.validate().is_ok());

        let bad = Submission::Quiz(QuizResult {
            email: None,
            profile: "sprinter".into(),
            score: 1,
            answers: json!("b"),
        });
        assert_eq!(field_of(bad.validate()), "answers");
    }
}
