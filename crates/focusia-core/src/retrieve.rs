//! Diversity-aware retrieval.
//!
//! [`search`] embeds the query, pulls the `fetch_k` nearest units from a
//! [`VectorStore`], and re-selects `k` of them with [`mmr_select`]. The
//! [`Retriever`] trait is the single seam the pipeline depends on.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::mmr::{mmr_select, MmrParams};
use crate::models::ScoredUnit;
use crate::store::VectorStore;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` units relevant to `query`, in selection order.
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredUnit>>;
}

/// Run MMR retrieval against a store.
///
/// Every returned unit comes from the `fetch_k` candidate pool, so its
/// similarity is never below the pool minimum. Returns fewer than `k`
/// units when the store holds fewer.
pub async fn search(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    params: &MmrParams,
) -> Result<Vec<ScoredUnit>> {
    let query_vec = embed_query(embedder, query).await?;
    let candidates = store.similarity_search(&query_vec, params.fetch_k).await?;

    let relevance: Vec<f32> = candidates.iter().map(|c| c.similarity).collect();
    let embeddings: Vec<&[f32]> = candidates
        .iter()
        .map(|c| c.unit.embedding.as_slice())
        .collect();
    let order = mmr_select(&relevance, &embeddings, params.k, params.lambda_mult);

    let mut slots: Vec<Option<_>> = candidates.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .map(|c| ScoredUnit {
            unit: c.unit,
            score: c.similarity,
        })
        .collect())
}

/// [`Retriever`] backed by a vector store, an embedder, and MMR parameters.
pub struct MmrRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    params: MmrParams,
}

impl MmrRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        params: MmrParams,
    ) -> Self {
        Self {
            store,
            embedder,
            params,
        }
    }
}

#[async_trait]
impl Retriever for MmrRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredUnit>> {
        let hits = search(
            self.store.as_ref(),
            self.embedder.as_ref(),
            query,
            &self.params,
        )
        .await?;
        tracing::debug!(
            query_chars = query.chars().count(),
            hits = hits.len(),
            "retrieved units"
        );
        Ok(hits)
    }
}
