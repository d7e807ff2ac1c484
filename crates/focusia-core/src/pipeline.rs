//! Pipeline orchestrator: retrieve, build the prompt, generate.
//!
//! A [`Pipeline`] is built once at startup and shared by reference (or
//! `Arc`) for the rest of the process. [`Pipeline::invoke`] takes `&self`
//! and holds no per-call state, so concurrent queries are safe.
//!
//! Blank queries are rejected by callers before they get here.

use anyhow::Result;
use std::sync::Arc;

use crate::generate::Generator;
use crate::models::AnswerResult;
use crate::prompt::{format_context, GenerationRequest};
use crate::retrieve::Retriever;

pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
}

impl Pipeline {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Answer one query. Failures from either stage propagate unchanged;
    /// a generation failure can be recovered with
    /// `err.downcast_ref::<FocusiaError>()`.
    pub async fn invoke(&self, query: &str) -> Result<AnswerResult> {
        let hits = self.retriever.retrieve(query).await?;
        let request = GenerationRequest::new(format_context(&hits), query);
        tracing::debug!(
            hits = hits.len(),
            context_chars = request.context.chars().count(),
            "prompt built"
        );
        let text = self.generator.generate(&request.user_prompt(), None).await?;
        Ok(AnswerResult {
            text,
            sources: hits.into_iter().map(|h| h.unit).collect(),
        })
    }
}
