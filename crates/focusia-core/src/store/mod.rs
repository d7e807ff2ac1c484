//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only thing the retriever needs from an
//! index: a nearest-neighbor lookup that returns candidates with their
//! embeddings, so MMR can compare candidates with each other.
//!
//! Implementations must be `Send + Sync`; an index is shared read-only
//! across concurrent queries once built.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::IndexedUnit;

/// A unit returned by nearest-neighbor search.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub unit: IndexedUnit,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Number of indexed units.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `limit` units ordered by descending similarity to
    /// `query_vec`. Equal similarities keep index order.
    async fn similarity_search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<Candidate>>;
}
