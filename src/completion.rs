//! Chat-completion client. Everything that talks to the LLM goes through
//! [`CompletionService`], so analysis and chat can run against a scripted
//! service in tests.

use crate::config::CompletionConfig;
use crate::ExitIntelError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    /// Ask the provider to constrain output to a single JSON object.
    pub json_mode: bool,
}

pub trait CompletionService: Send + Sync {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ExitIntelError>;
}

/// OpenAI-compatible `/v1/chat/completions` endpoint, with optional fallback.
pub struct OpenAiCompletion {
    endpoint: String,
    fallback_endpoint: Option<String>,
    api_key: String,
    timeout: Duration,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig, api_key: String) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            fallback_endpoint: config.fallback_endpoint.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn try_endpoint(&self, endpoint: &str, body: &serde_json::Value) -> Result<String, ExitIntelError> {
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .timeout_global(Some(self.timeout))
                .build(),
        );

        let resp: serde_json::Value = agent
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| ExitIntelError::Completion(format!("request: {e}")))?
            .body_mut()
            .read_json()
            .map_err(|e| ExitIntelError::Completion(format!("response: {e}")))?;

        let text = resp
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                ExitIntelError::Completion("no content in chat completion response".into())
            })?;

        Ok(text.to_string())
    }
}

impl CompletionService for OpenAiCompletion {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ExitIntelError> {
        let body = request_body(request);
        match self.try_endpoint(&self.endpoint, &body) {
            Ok(text) => Ok(text),
            Err(primary_err) => {
                if let Some(fallback) = &self.fallback_endpoint {
                    log::warn!("primary endpoint failed ({primary_err}), trying fallback");
                    self.try_endpoint(fallback, &body)
                } else {
                    Err(primary_err)
                }
            }
        }
    }
}

fn request_body(request: &CompletionRequest<'_>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": request.messages,
    });
    if request.json_mode {
        body["response_format"] = serde_json::json!({"type": "json_object"});
    }
    body
}

/// Time a completion call and record it under `kind` (analysis or chat).
pub(crate) fn timed_complete(
    service: &dyn CompletionService,
    kind: &'static str,
    request: &CompletionRequest<'_>,
) -> Result<String, ExitIntelError> {
    let start = Instant::now();
    let result = service.complete(request);
    crate::metrics::record_completion(kind, result.is_ok(), start);
    result
}

/// Strip markdown code fences from LLM response.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        // Language tag runs to the newline; a one-line reply has only the tag word to skip
        let rest = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
        return rest.trim();
    }
    t
}
