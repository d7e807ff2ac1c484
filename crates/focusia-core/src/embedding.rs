//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the deterministic [`HashingProvider`], and pure helpers for
//! vector serialization and similarity computation.
//!
//! Network and model-backed providers (OpenAI, Ollama, fastembed) live in
//! the `focusia` app crate.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Trait for embedding providers.
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector, so that index-time and query-time embeddings agree.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Check that a provider returned one vector of the advertised width per input.
pub fn check_batch(provider: &dyn EmbeddingProvider, inputs: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != inputs {
        bail!(
            "Embedding provider '{}' returned {} vectors for {} inputs",
            provider.model_name(),
            vectors.len(),
            inputs
        );
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dims()) {
        bail!(
            "Embedding provider '{}' returned a {}-dim vector, expected {}",
            provider.model_name(),
            bad.len(),
            provider.dims()
        );
    }
    Ok(())
}

// ============ Hashing Provider ============

/// Default dimensionality of [`HashingProvider`] vectors.
pub const DEFAULT_HASHING_DIMS: usize = 256;

/// Offline, dependency-free embedder using signed feature hashing.
///
/// Text is lowercased and split on non-alphanumeric characters; each token
/// is hashed with SHA-256 into one of `dims` buckets with a ±1 sign, and
/// the result is L2-normalized. Texts sharing vocabulary land close
/// together. Quality is far below a neural model, but it needs no download
/// and is fully deterministic.
pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        l2_normalize(&mut vec);
        vec
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_name(&self) -> &str {
        "hashing"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use focusia_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
