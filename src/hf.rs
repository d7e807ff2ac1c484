//! Hugging Face Inference backend.
//!
//! Implements [`GenerationBackend`] over the hosted Inference API:
//!
//! - chat: `POST {endpoint}/models/{model}/v1/chat/completions` with an
//!   OpenAI-style body; the answer is `choices[0].message.content`.
//! - completion: `POST {endpoint}/models/{model}` with
//!   `{"inputs", "parameters"}`; the answer is `generated_text`.
//!
//! Chat failures are classified into [`ChatErrorKind`] so the adapter can
//! decide whether to fall back:
//!
//! | Outcome | Kind |
//! |---------|------|
//! | 401, 403 | `Auth` |
//! | 400, 404, 405, 422, 501 | `Unsupported` |
//! | 429, other 5xx, other 4xx, transport error, timeout | `Unavailable` |
//! | 2xx without usable message content | `Malformed` |
//!
//! The access token is read once, at construction, from the first set
//! variable among `HF_TOKEN`, `HUGGINGFACEHUB_API_TOKEN`, `HF_API_TOKEN`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use focusia_core::generate::{
    ChatError, ChatErrorKind, ChatMessage, ChatRequest, CompletionRequest, GenerationBackend,
};
use focusia_core::FocusiaError;

use crate::config::GenerationConfig;

/// Token variables, in lookup order.
pub const TOKEN_ENV_VARS: [&str; 3] = ["HF_TOKEN", "HUGGINGFACEHUB_API_TOKEN", "HF_API_TOKEN"];

/// First non-blank token among [`TOKEN_ENV_VARS`].
pub fn resolve_token<F>(lookup: F) -> std::result::Result<String, FocusiaError>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or_else(|| {
            FocusiaError::MissingCredential(TOKEN_ENV_VARS.iter().map(|v| v.to_string()).collect())
        })
}

pub fn classify_status(status: u16) -> ChatErrorKind {
    match status {
        401 | 403 => ChatErrorKind::Auth,
        400 | 404 | 405 | 422 | 501 => ChatErrorKind::Unsupported,
        _ => ChatErrorKind::Unavailable,
    }
}

// Request bodies are typed so f32 sampling values go out in their
// shortest form (0.2, not 0.20000000298023224).

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

impl<'a> ChatBody<'a> {
    fn new(model: &'a str, request: &'a ChatRequest) -> Self {
        Self {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    inputs: &'a str,
    parameters: CompletionParameters,
}

#[derive(Serialize)]
struct CompletionParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
    do_sample: bool,
    return_full_text: bool,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a CompletionRequest) -> Self {
        Self {
            inputs: &request.prompt,
            parameters: CompletionParameters {
                max_new_tokens: request.max_new_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
                repetition_penalty: request.repetition_penalty,
                do_sample: request.do_sample,
                return_full_text: false,
            },
        }
    }
}

pub struct HfInferenceBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
}

impl HfInferenceBackend {
    pub fn new(endpoint: &str, model: &str, token: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            token,
        })
    }

    /// Build from config, reading the token from the process environment.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::from_config_with(config, |key| std::env::var(key).ok())
    }

    /// Build from config with an explicit variable lookup.
    pub fn from_config_with<F>(config: &GenerationConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = resolve_token(lookup)?;
        tracing::info!(model = %config.model, endpoint = %config.endpoint, "using Hugging Face model");
        Self::new(&config.endpoint, &config.model, token, config.timeout_secs)
    }

    pub fn chat_url(&self) -> String {
        format!("{}/models/{}/v1/chat/completions", self.endpoint, self.model)
    }

    pub fn completion_url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }
}

#[async_trait]
impl GenerationBackend for HfInferenceBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> std::result::Result<String, ChatError> {
        let body = ChatBody::new(&self.model, request);

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::new(ChatErrorKind::Unavailable, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::new(ChatErrorKind::Unavailable, e.to_string()))?;

        if !status.is_success() {
            return Err(ChatError::new(
                classify_status(status.as_u16()),
                format!("HTTP {}: {}", status, truncate_body(&text)),
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            ChatError::new(ChatErrorKind::Malformed, format!("invalid JSON: {}", e))
        })?;
        parse_chat_response(&json)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = CompletionBody::new(request);

        let response = self
            .client
            .post(self.completion_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("Text completion request failed")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Text completion error {}: {}", status, truncate_body(&text));
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).context("Text completion returned invalid JSON")?;
        parse_completion_response(&json)
    }
}

/// `choices[0].message.content` as a non-empty string.
pub fn parse_chat_response(json: &serde_json::Value) -> std::result::Result<String, ChatError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ChatError::new(
                ChatErrorKind::Malformed,
                "response has no choices[0].message.content",
            )
        })
}

/// Accepts `[{"generated_text"}]`, `{"generated_text"}`, or a bare string.
pub fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    let text = match json {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|i| i.get("generated_text"))
            .and_then(|t| t.as_str()),
        serde_json::Value::Object(_) => json.get("generated_text").and_then(|t| t.as_str()),
        _ => None,
    };
    text.map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Text completion response has no generated_text"))
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(300) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
