//! # Focusia Core
//!
//! Pure logic for the Focusia retrieval-augmented advisor: tip normalization,
//! embedding trait and vector utilities, MMR retrieval, the two-tier
//! generation adapter, answer postprocessing, and the pipeline orchestrator.
//!
//! This crate performs no filesystem, database, or network I/O. Concrete
//! embedding providers, the persisted index, and the Hugging Face backend
//! live in the `focusia` app crate.
//!
//! ```text
//! query ─▶ Retriever (embed + fetch_k + MMR) ─▶ context ─▶ prompt
//!                                                           │
//!      AnswerResult ◀── postprocess::clean ◀── Generator ◀──┘
//! ```

pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod mmr;
pub mod models;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod retrieve;
pub mod store;

pub use error::FocusiaError;
