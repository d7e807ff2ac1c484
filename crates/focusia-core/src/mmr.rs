//! Maximal Marginal Relevance (MMR) selection.
//!
//! MMR greedily picks candidates that are relevant to the query but not
//! redundant with what has already been picked:
//!
//! ```text
//! score(c) = λ × sim(c, query) − (1 − λ) × max_{s ∈ selected} sim(c, s)
//! ```
//!
//! λ = 1.0 is pure relevance, λ = 0.0 pure diversity. The redundancy term
//! is 0 while nothing has been selected, so the first pick is always the
//! most relevant candidate.

use crate::embedding::cosine_similarity;
use crate::error::FocusiaError;

/// Retrieval tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrParams {
    /// Number of units to return.
    pub k: usize,
    /// Size of the nearest-neighbor candidate pool MMR selects from.
    pub fetch_k: usize,
    /// Relevance/diversity balance in `[0.0, 1.0]`.
    pub lambda_mult: f32,
}

impl Default for MmrParams {
    fn default() -> Self {
        Self {
            k: 5,
            fetch_k: 20,
            lambda_mult: 0.7,
        }
    }
}

impl MmrParams {
    pub fn validate(&self) -> Result<(), FocusiaError> {
        if self.k == 0 {
            return Err(FocusiaError::InvalidConfig(
                "retrieval.k must be >= 1".to_string(),
            ));
        }
        if self.fetch_k < self.k {
            return Err(FocusiaError::InvalidConfig(format!(
                "retrieval.fetch_k ({}) must be >= retrieval.k ({})",
                self.fetch_k, self.k
            )));
        }
        if !(0.0..=1.0).contains(&self.lambda_mult) {
            return Err(FocusiaError::InvalidConfig(
                "retrieval.lambda_mult must be in [0.0, 1.0]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Select up to `k` candidate indices by MMR.
///
/// `relevance[i]` is candidate `i`'s similarity to the query and
/// `embeddings[i]` its vector. Candidates must be given in similarity-rank
/// order: ties on the MMR score go to the earlier candidate. Returns indices
/// in selection order.
pub fn mmr_select(relevance: &[f32], embeddings: &[&[f32]], k: usize, lambda: f32) -> Vec<usize> {
    let n = relevance.len().min(embeddings.len());
    let k = k.min(n);

    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..n).collect();
    // Running max similarity of each candidate to the selected set.
    let mut redundancy = vec![0.0f32; n];

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &idx) in remaining.iter().enumerate() {
            let penalty = if selected.is_empty() {
                0.0
            } else {
                redundancy[idx]
            };
            let score = lambda * relevance[idx] - (1.0 - lambda) * penalty;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        let chosen = remaining.remove(best_pos);
        for &idx in &remaining {
            let sim = cosine_similarity(embeddings[idx], embeddings[chosen]);
            if selected.is_empty() || sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
        selected.push(chosen);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(query: &[f32], vectors: &[Vec<f32>], k: usize, lambda: f32) -> Vec<usize> {
        let relevance: Vec<f32> = vectors.iter().map(|v| cosine_similarity(query, v)).collect();
        let refs: Vec<&[f32]> = vectors.iter().map(|v| v.as_slice()).collect();
        mmr_select(&relevance, &refs, k, lambda)
    }

    #[test]
    fn test_empty_and_zero_k() {
        assert!(mmr_select(&[], &[], 3, 0.7).is_empty());
        assert!(select(&[1.0, 0.0], &[vec![1.0, 0.0]], 0, 0.7).is_empty());
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let picked = select(&[1.0, 0.0], &[vec![1.0, 0.0], vec![0.0, 1.0]], 5, 0.7);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_first_pick_is_most_relevant() {
        let vectors = vec![vec![0.2, 1.0], vec![1.0, 0.31], vec![1.0, 0.3]];
        let picked = select(&[1.0, 1.0], &vectors, 1, 0.7);
        // [1.0, 0.31] is closest to the diagonal among the three.
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn test_near_duplicate_is_suppressed() {
        // Two near-duplicates (a, a2) slightly more relevant than b.
        let query = [1.0f32, 1.0];
        let a2 = vec![1.0f32, 0.31];
        let a = vec![1.0f32, 0.3];
        let b = vec![0.2f32, 1.0];
        let vectors = vec![a2, a, b];

        let sims: Vec<f32> = vectors.iter().map(|v| cosine_similarity(&query, v)).collect();
        assert!(sims[0] > sims[2] && sims[1] > sims[2], "b must rank last by similarity");

        let picked = select(&query, &vectors, 2, 0.7);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn test_lambda_one_is_pure_relevance() {
        let query = [1.0f32, 1.0];
        let vectors = vec![vec![1.0f32, 0.31], vec![1.0, 0.3], vec![0.2, 1.0]];
        assert_eq!(select(&query, &vectors, 3, 1.0), vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_keep_rank_order() {
        let v = vec![1.0f32, 0.0];
        let vectors = vec![v.clone(), v.clone(), v];
        assert_eq!(select(&[1.0, 0.0], &vectors, 3, 0.7), vec![0, 1, 2]);
    }

    #[test]
    fn test_low_lambda_prefers_the_other_side() {
        // c1 and c2 sit on opposite sides of c0; c1 is more relevant but
        // nearly parallel to c0.
        let query = [1.0f32, 0.0];
        let vectors = vec![vec![1.0f32, 0.1], vec![1.0, 0.2], vec![1.0, -0.3]];
        assert_eq!(select(&query, &vectors, 2, 1.0), vec![0, 1]);
        assert_eq!(select(&query, &vectors, 2, 0.5), vec![0, 2]);
    }

    #[test]
    fn test_params_validation() {
        assert!(MmrParams::default().validate().is_ok());
        let zero_k = MmrParams {
            k: 0,
            ..Default::default()
        };
        assert!(zero_k.validate().is_err());
        let small_pool = MmrParams {
            k: 5,
            fetch_k: 3,
            lambda_mult: 0.7,
        };
        assert!(small_pool.validate().is_err());
        let bad_lambda = MmrParams {
            lambda_mult: 1.5,
            ..Default::default()
        };
        assert!(bad_lambda.validate().is_err());
    }
}
