//! Vector index trait for storing and searching embedded units

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RetrievalUnit, ScoredUnit};

/// Trait for vector storage and similarity search
///
/// Upserts are keyed by [`RetrievalUnit::key`]: writing an existing key
/// replaces the stored unit, so re-indexing the same content is a no-op in
/// effect.
///
/// Implementations:
/// - `InMemoryVectorIndex`: process-local, lost on exit
/// - `SqliteVectorIndex`: persistent SQLite file
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace units; each must carry its embedding
    async fn upsert(&self, units: &[RetrievalUnit]) -> Result<()>;

    /// Return up to `top_k` units by descending cosine similarity, ties in insertion order
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredUnit>>;

    /// Get total number of stored units
    async fn len(&self) -> Result<usize>;

    /// Check if the index is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Descending score order; NaN scores rank below every real score
pub fn by_descending_score(a: &ScoredUnit, b: &ScoredUnit) -> Ordering {
    fn key(score: f32) -> f32 {
        if score.is_nan() {
            f32::NEG_INFINITY
        } else {
            score
        }
    }
    key(b.score).total_cmp(&key(a.score))
}

/// Sort by descending score, stable for ties, then cut to `top_k`
pub fn rank(mut scored: Vec<ScoredUnit>, top_k: usize) -> Vec<ScoredUnit> {
    scored.sort_by(by_descending_score);
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::tests::unit;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_puts_nan_last_and_keeps_ties_stable() {
        let scored: Vec<ScoredUnit> = [("a.txt", 0.5), ("b.txt", f32::NAN), ("c.txt", 0.9), ("d.txt", 0.5)]
            .into_iter()
            .map(|(path, score)| ScoredUnit {
                unit: unit(path, 0, "Text.", Vec::new()),
                score,
            })
            .collect();

        let ranked = rank(scored, 4);
        let paths: Vec<&str> = ranked.iter().map(|s| s.unit.meta.file_path.as_str()).collect();
        assert_eq!(paths, vec!["c.txt", "a.txt", "d.txt", "b.txt"]);

        let top = rank(ranked, 2);
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|s| !s.score.is_nan()));
    }
}
