//! Canned replies, for offline use and tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::ReplyBackend;
use crate::error::{Error, Result};
use crate::types::ChatTurn;

/// Backend that plays back queued results in order.
///
/// Once the queue is empty every call fails.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String>>>,
    seen: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// History passed to the most recent call
    pub fn last_history(&self) -> Option<Vec<ChatTurn>> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReplyBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn reply(&self, history: &[ChatTurn]) -> Result<String> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Backend("no scripted reply left".to_string())))
    }
}
