//! Reply backends
//!
//! A [`ReplyBackend`] turns the transcript so far into the assistant's raw
//! reply text. The session never sees provider details; it only knows the
//! call may fail.

mod http;
mod scripted;

pub use http::HttpReplyBackend;
pub use scripted::ScriptedBackend;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::ChatTurn;

/// Produces the assistant's raw reply for a conversation.
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Reply to `history`, ordered oldest first. Never contains system turns.
    async fn reply(&self, history: &[ChatTurn]) -> Result<String>;
}

/// Call a backend, retrying transient failures with exponential backoff.
///
/// `max_retries == 0` makes exactly one attempt.
pub async fn reply_with_retry(
    backend: &dyn ReplyBackend,
    history: &[ChatTurn],
    max_retries: usize,
) -> Result<String> {
    let mut last_error = None;
    let mut delay = Duration::from_millis(500);

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tracing::debug!(
                backend = backend.name(),
                "Retrying reply (attempt {}/{}), waiting {:?}",
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, Duration::from_secs(30));
        }

        match backend.reply(history).await {
            Ok(text) => return Ok(text),
            Err(e) if is_retryable_error(&e) => {
                tracing::warn!(backend = backend.name(), "Transient reply error: {}", e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Backend("max retries exceeded".to_string())))
}

/// Check if an error is retryable (network failure, timeout or 5xx)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Backend(msg) => {
            msg.contains("request failed") || msg.contains(" returned 5") || msg.contains("timeout")
        }
        _ => false,
    }
}
