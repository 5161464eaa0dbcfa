//! HTTP reply backend for Ollama, Claude and OpenAI-compatible APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use super::ReplyBackend;
use crate::config::{LlmProvider, ReplyConfig};
use crate::error::{Error, Result};
use crate::types::{ChatTurn, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CLAUDE_MAX_TOKENS: u32 = 1024;

pub struct HttpReplyBackend {
    provider: LlmProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
    http: reqwest::Client,
}

impl HttpReplyBackend {
    /// Build a backend from the `[reply]` config section.
    ///
    /// Hosted providers need an API key from config or their env var.
    pub fn from_config(config: &ReplyConfig) -> Result<Self> {
        config.validate()?;

        let api_key = config.resolved_api_key();
        if config.provider.api_key_env().is_some() && api_key.is_none() {
            return Err(Error::Config(
                "reply.api_key (or provider env var) is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider: config.provider,
            model: config.model.clone(),
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            api_key,
            system_prompt: config.system_prompt.clone(),
            http,
        })
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Claude => "claude",
            LlmProvider::OpenAI => "openai",
        }
    }

    fn url(&self) -> String {
        let path = match self.provider {
            LlmProvider::Ollama => "/api/chat",
            LlmProvider::Claude => "/v1/messages",
            LlmProvider::OpenAI => "/v1/chat/completions",
        };
        format!("{}{}", self.endpoint, path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = self.api_key.as_deref().unwrap_or_default();
        match self.provider {
            LlmProvider::Ollama => {}
            LlmProvider::Claude => {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(key)
                        .map_err(|e| Error::Config(format!("invalid claude api key header: {e}")))?,
                );
                headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
            }
            LlmProvider::OpenAI => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|e| Error::Config(format!("invalid auth header: {e}")))?,
                );
            }
        }
        Ok(headers)
    }

    /// Provider-specific request body
    fn body(&self, history: &[ChatTurn]) -> Value {
        let turns: Vec<Value> = history
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| json!({ "role": t.role.as_str(), "content": t.content }))
            .collect();

        match self.provider {
            LlmProvider::Claude => {
                let mut body = json!({
                    "model": self.model,
                    "max_tokens": CLAUDE_MAX_TOKENS,
                    "messages": turns,
                });
                if let Some(system) = &self.system_prompt {
                    body["system"] = json!(system);
                }
                body
            }
            LlmProvider::Ollama | LlmProvider::OpenAI => {
                let mut messages = Vec::with_capacity(turns.len() + 1);
                if let Some(system) = &self.system_prompt {
                    messages.push(json!({ "role": "system", "content": system }));
                }
                messages.extend(turns);

                let mut body = json!({ "model": self.model, "messages": messages });
                if self.provider == LlmProvider::Ollama {
                    body["stream"] = json!(false);
                }
                body
            }
        }
    }

    /// Pull the reply text out of a provider response
    fn extract(&self, json: &Value) -> Result<String> {
        let text = match self.provider {
            LlmProvider::Ollama => json.pointer("/message/content"),
            LlmProvider::Claude => json.pointer("/content/0/text"),
            LlmProvider::OpenAI => json.pointer("/choices/0/message/content"),
        };
        text.and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::Backend(format!(
                    "{} response missing reply text",
                    self.provider_name()
                ))
            })
    }
}

#[async_trait]
impl ReplyBackend for HttpReplyBackend {
    fn name(&self) -> &str {
        self.provider_name()
    }

    async fn reply(&self, history: &[ChatTurn]) -> Result<String> {
        let provider = self.provider_name();
        tracing::debug!(provider, model = %self.model, turns = history.len(), "Requesting reply");

        let resp = self
            .http
            .post(self.url())
            .headers(self.headers()?)
            .json(&self.body(history))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{provider} request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Backend(format!("{provider} read body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Backend(format!(
                "{} returned {}: {}",
                provider,
                status.as_u16(),
                body
            )));
        }

        let json: Value = serde_json::from_str(&body)?;
        self.extract(&json)
    }
}
