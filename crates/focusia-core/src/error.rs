//! Typed failure taxonomy shared by the core and the app crate.
//!
//! Startup failures (`Schema`, `CorpusFormat`, `CorpusNotFound`,
//! `EmptyCorpus`, `MissingCredential`, `InvalidConfig`) abort the process.
//! `GenerationFailure` is per-query: the caller reports it and keeps serving.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FocusiaError {
    /// Raw rows handed to the normalizer were not a list.
    #[error("corpus schema error: {0}")]
    Schema(String),

    /// Corpus file is not valid JSON or its top level is not a list.
    #[error("corpus format error in {path}: {reason}")]
    CorpusFormat { path: String, reason: String },

    #[error("corpus file not found: {0}")]
    CorpusNotFound(String),

    #[error("corpus yielded no usable tips (need non-empty content of at least {min_chars} characters)")]
    EmptyCorpus { min_chars: usize },

    #[error("no access token configured; set one of: {}", .0.join(", "))]
    MissingCredential(Vec<String>),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FocusiaError {
    /// True for failures that only affect a single query.
    pub fn is_per_query(&self) -> bool {
        matches!(self, FocusiaError::GenerationFailure(_))
    }
}
