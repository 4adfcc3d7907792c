//! Cosine similarity scoring and top-k selection.
//!
//! Scoring is a brute-force O(n·d) pass over every stored vector. Selection
//! keeps a bounded min-heap of the `k` best candidates, ordered by
//! similarity descending and then by insertion position ascending, so the
//! result is identical to a stable descending sort truncated to `k`.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rayon::prelude::*;

use super::index::IndexEntry;

/// Index size from which scoring is spread over the rayon pool.
pub const PARALLEL_SCORING_THRESHOLD: usize = 4096;

/// Calculate cosine similarity between two vectors.
///
/// Zero-magnitude vectors score 0.0. The result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with both magnitudes already known.
pub(crate) fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// A scored candidate. Greater means better ranked.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    position: usize,
    score: f32,
}

/// NaN sorts below every real score.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        rank_key(self.score)
            .total_cmp(&rank_key(other.score))
            // Earlier insertion wins ties.
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Select the `k` best `(position, score)` pairs, best first.
///
/// Ties on score keep the lower position first.
pub fn select_top_k<I>(scores: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::new();

    for (position, score) in scores {
        let candidate = Ranked { position, score };
        if heap.len() < k {
            heap.push(Reverse(candidate));
            continue;
        }

        let beats_worst = heap
            .peek()
            .is_some_and(|Reverse(worst)| candidate > *worst);
        if beats_worst {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(ranked)| (ranked.position, ranked.score))
        .collect()
}

/// Score every entry against `query` and keep the `top_k` best.
///
/// The caller guarantees `query` has the entries' dimensionality.
pub(crate) fn rank_entries(query: &[f32], entries: &[IndexEntry], top_k: usize) -> Vec<(usize, f32)> {
    if top_k == 0 || entries.is_empty() {
        return Vec::new();
    }

    let query_norm = l2_norm(query);
    let score = |entry: &IndexEntry| cosine_with_norms(query, query_norm, &entry.vector, entry.norm);

    if entries.len() >= PARALLEL_SCORING_THRESHOLD {
        let scores: Vec<f32> = entries.par_iter().map(score).collect();
        select_top_k(scores.into_iter().enumerate(), top_k)
    } else {
        select_top_k(entries.iter().map(score).enumerate(), top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random vector (xorshift).
    fn pseudo_random_vector(seed: u64, dim: usize) -> Vec<f32> {
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
        (0..dim)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 2000) as f32 / 1000.0) - 1.0
            })
            .collect()
    }

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        let v1 = vec![1.0, 0.0, 0.0];
        let v2 = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v2) - 1.0).abs() < 0.001);

        // Orthogonal vectors
        let v3 = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&v1, &v3) - 0.0).abs() < 0.001);

        // Opposite vectors
        let v4 = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&v1, &v4) - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = vec![0.0; 4];
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
    }

    #[test]
    fn test_self_similarity_is_one() {
        for seed in 1..50 {
            let v = pseudo_random_vector(seed, 768);
            let score = cosine_similarity(&v, &v);
            assert!((score - 1.0).abs() <= 1e-6, "seed {seed}: {score}");
        }
    }

    #[test]
    fn test_similarity_is_scale_invariant_and_bounded() {
        let a = pseudo_random_vector(7, 64);
        let b = pseudo_random_vector(8, 64);
        let scaled: Vec<f32> = a.iter().map(|x| x * 42.0).collect();

        let s1 = cosine_similarity(&a, &b);
        let s2 = cosine_similarity(&scaled, &b);
        assert!((s1 - s2).abs() < 1e-5);
        assert!((-1.0..=1.0).contains(&s1));
    }

    #[test]
    fn test_select_top_k_orders_descending() {
        let scores = vec![(0, 0.1), (1, 0.9), (2, 0.5), (3, 0.7)];
        let top = select_top_k(scores, 3);
        assert_eq!(top, vec![(1, 0.9), (3, 0.7), (2, 0.5)]);
    }

    #[test]
    fn test_select_top_k_breaks_ties_by_position() {
        let scores = vec![(0, 0.5), (1, 0.8), (2, 0.5), (3, 0.8), (4, 0.5)];
        let top = select_top_k(scores, 4);
        assert_eq!(top, vec![(1, 0.8), (3, 0.8), (0, 0.5), (2, 0.5)]);
    }

    #[test]
    fn test_select_top_k_bounds() {
        let scores = vec![(0, 0.3), (1, 0.2)];
        assert!(select_top_k(scores.clone(), 0).is_empty());
        assert_eq!(select_top_k(scores, 10).len(), 2);
        assert!(select_top_k(Vec::<(usize, f32)>::new(), 5).is_empty());
    }

    #[test]
    fn test_nan_ranks_last() {
        let scores = vec![(0, f32::NAN), (1, -0.9), (2, 0.1)];
        let top = select_top_k(scores, 3);
        assert_eq!(top[0].0, 2);
        assert_eq!(top[1].0, 1);
        assert_eq!(top[2].0, 0);
    }

    #[test]
    fn test_heap_selection_matches_stable_sort() {
        let scores: Vec<(usize, f32)> = (0..500)
            .map(|i| (i, ((i * 37) % 11) as f32 / 10.0))
            .collect();

        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted.truncate(25);

        assert_eq!(select_top_k(scores, 25), sorted);
    }
}
