//! In-memory [`VectorStore`].
//!
//! Brute-force cosine similarity over every unit. The tip corpus is small
//! (hundreds of rows), so an exact scan is both fast and deterministic.
//! The store is immutable after construction and needs no locking.

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::IndexedUnit;

use super::{Candidate, VectorStore};

pub struct InMemoryStore {
    units: Vec<IndexedUnit>,
}

impl InMemoryStore {
    pub fn new(units: Vec<IndexedUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[IndexedUnit] {
        &self.units
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn len(&self) -> usize {
        self.units.len()
    }

    async fn similarity_search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        let mut candidates: Vec<Candidate> = self
            .units
            .iter()
            .map(|unit| Candidate {
                similarity: cosine_similarity(query_vec, &unit.embedding),
                unit: unit.clone(),
            })
            .collect();
        // sort_by is stable: equal scores keep index order.
        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(limit);
        Ok(candidates)
    }
}
