//! Two-tier generation adapter.
//!
//! Hosted models differ in what they accept: some serve an OpenAI-style chat
//! route, others only plain text completion. [`GenerationAdapter`] hides
//! that behind [`Generator::generate`]:
//!
//! 1. try chat with `[system, user]` messages;
//! 2. if chat fails with a fallback-eligible [`ChatErrorKind`], retry once as
//!    plain completion over a flattened prompt;
//! 3. clean the raw text with [`postprocess::clean`] and cut at stop strings.
//!
//! Transport details live behind [`GenerationBackend`]; the app crate
//! provides the Hugging Face implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::FocusiaError;
use crate::postprocess;
use crate::prompt::{completion_prompt, SYSTEM_PROMPT};

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 160;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TOP_P: f32 = 0.8;
pub const DEFAULT_REPETITION_PENALTY: f32 = 1.08;

/// Decoding parameters shared by both call styles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Only sent on the completion path; chat routes do not take it.
    pub repetition_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
        }
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<(), FocusiaError> {
        if self.max_new_tokens == 0 {
            return Err(FocusiaError::InvalidConfig(
                "generation.max_new_tokens must be >= 1".to_string(),
            ));
        }
        if !(self.temperature > 0.0) {
            return Err(FocusiaError::InvalidConfig(
                "generation.temperature must be > 0.0".to_string(),
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(FocusiaError::InvalidConfig(
                "generation.top_p must be in (0.0, 1.0]".to_string(),
            ));
        }
        if !(self.repetition_penalty > 0.0) {
            return Err(FocusiaError::InvalidConfig(
                "generation.repetition_penalty must be > 0.0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub do_sample: bool,
}

/// Why a chat call failed. Decides whether the completion fallback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Credential rejected for the chat route.
    Auth,
    /// The model does not serve the chat route.
    Unsupported,
    /// A response arrived but carried no usable message content.
    Malformed,
    /// Transport failure, timeout, rate limit, or server error.
    Unavailable,
}

impl ChatErrorKind {
    pub fn allows_fallback(self) -> bool {
        !matches!(self, ChatErrorKind::Unavailable)
    }
}

impl fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatErrorKind::Auth => "auth",
            ChatErrorKind::Unsupported => "unsupported",
            ChatErrorKind::Malformed => "malformed",
            ChatErrorKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("chat call failed ({kind}): {message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Remote model endpoint with a chat route and a plain-completion route.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Return the first choice's message content.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ChatError>;

    /// Return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

/// Prompt in, cleaned answer out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, stop: Option<&[String]>) -> Result<String, FocusiaError>;
}

pub struct GenerationAdapter {
    backend: Arc<dyn GenerationBackend>,
    system_prompt: String,
    params: SamplingParams,
}

impl GenerationAdapter {
    pub fn new(backend: Arc<dyn GenerationBackend>, params: SamplingParams) -> Self {
        Self {
            backend,
            system_prompt: SYSTEM_PROMPT.to_string(),
            params,
        }
    }

    fn chat_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(prompt),
            ],
            max_tokens: self.params.max_new_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
        }
    }

    fn completion_request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: completion_prompt(&self.system_prompt, prompt),
            max_new_tokens: self.params.max_new_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            repetition_penalty: self.params.repetition_penalty,
            do_sample: true,
        }
    }

    async fn raw_generate(&self, prompt: &str) -> Result<String, FocusiaError> {
        match self.backend.chat(&self.chat_request(prompt)).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind.allows_fallback() => {
                tracing::warn!(
                    model = self.backend.model(),
                    kind = %err.kind,
                    error = %err.message,
                    "chat call failed, falling back to text completion"
                );
                self.backend
                    .complete(&self.completion_request(prompt))
                    .await
                    .map_err(|e| FocusiaError::GenerationFailure(format!("{:#}", e)))
            }
            Err(err) => Err(FocusiaError::GenerationFailure(err.to_string())),
        }
    }
}

#[async_trait]
impl Generator for GenerationAdapter {
    async fn generate(&self, prompt: &str, stop: Option<&[String]>) -> Result<String, FocusiaError> {
        let raw = self.raw_generate(prompt).await?;
        let text = postprocess::clean(&raw);
        Ok(match stop {
            Some(stops) => truncate_at_stops(&text, stops),
            None => text,
        })
    }
}

/// Cut `text` before each stop string in turn.
///
/// The result ends strictly before the earliest occurrence of any non-empty
/// stop string. Empty stop strings are ignored.
pub fn truncate_at_stops(text: &str, stops: &[String]) -> String {
    let mut out = text;
    for stop in stops.iter().filter(|s| !s.is_empty()) {
        if let Some(pos) = out.find(stop.as_str()) {
            out = &out[..pos];
        }
    }
    out.to_string()
}
