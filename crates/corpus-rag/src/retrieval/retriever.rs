//! Query-time similarity search

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::providers::vector_index::by_descending_score;
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::RetrievalResult;

/// Embeds a query and returns the most similar indexed units
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    min_score: Option<f32>,
}

impl Retriever {
    /// Create a retriever returning 5 results by default
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: 5,
            min_score: None,
        }
    }

    /// Create a retriever with the configured `top_k` and `min_score`
    pub fn from_config(
        config: &RetrievalConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            top_k: config.top_k,
            min_score: config.min_score,
            ..Self::new(embedder, index)
        }
    }

    /// Retrieve with the default `top_k`
    pub async fn search(&self, query: &str) -> Result<RetrievalResult, RetrievalError> {
        self.retrieve(query, self.top_k).await
    }

    /// Retrieve up to `top_k` units by descending similarity
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let stored = self
            .index
            .len()
            .await
            .map_err(|e| RetrievalError::IndexFailure(e.to_string()))?;
        if stored == 0 {
            return Err(RetrievalError::EmptyIndex);
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::QueryEmbeddingFailure(e.to_string()))?;

        let mut results = self
            .index
            .query(&vector, top_k)
            .await
            .map_err(|e| RetrievalError::IndexFailure(e.to_string()))?;

        // Stable: equal scores keep the index's order
        results.sort_by(by_descending_score);
        results.truncate(top_k);
        if let Some(min_score) = self.min_score {
            results.retain(|r| r.score >= min_score);
        }

        tracing::info!(
            "Retrieved {} of {} units from {} for query ({} chars)",
            results.len(),
            stored,
            self.index.name(),
            query.len()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::providers::memory::tests::unit;
    use crate::providers::InMemoryVectorIndex;
    use async_trait::async_trait;
    use proptest::prelude::*;

    /// Maps "x" to [1, 0], anything else to [0, 1]; refuses empty text
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            match text {
                "" => Err(Error::embedding("empty query")),
                "x" => Ok(vec![1.0, 0.0]),
                _ => Ok(vec![0.0, 1.0]),
            }
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "axis"
        }
    }

    async fn populated(vectors: &[[f32; 2]]) -> Arc<InMemoryVectorIndex> {
        let index = Arc::new(InMemoryVectorIndex::new());
        let units: Vec<_> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| unit("a.txt", i as u32, &format!("Unit {}.", i), v.to_vec()))
            .collect();
        index.upsert(&units).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_empty_index() {
        let retriever = Retriever::new(Arc::new(AxisEmbedder), Arc::new(InMemoryVectorIndex::new()));
        let err = retriever.retrieve("x", 5).await.unwrap_err();
        assert_eq!(err, RetrievalError::EmptyIndex);
    }

    #[tokio::test]
    async fn test_query_embedding_failure() {
        let index = populated(&[[1.0, 0.0]]).await;
        let retriever = Retriever::new(Arc::new(AxisEmbedder), index);
        let err = retriever.retrieve("", 5).await.unwrap_err();
        assert!(matches!(err, RetrievalError::QueryEmbeddingFailure(_)));
    }

    #[tokio::test]
    async fn test_zero_top_k_is_empty() {
        let index = populated(&[[1.0, 0.0]]).await;
        let retriever = Retriever::new(Arc::new(AxisEmbedder), index);
        assert!(retriever.retrieve("x", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranked_and_truncated() {
        let index = populated(&[[0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]).await;
        let retriever = Retriever::new(Arc::new(AxisEmbedder), index);

        let results = retriever.retrieve("x", 2).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.unit.text.as_str()).collect();
        assert_eq!(texts, vec!["Unit 1.", "Unit 2."]);
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let index = populated(&[[0.0, 1.0], [1.0, 0.0]]).await;
        let config = RetrievalConfig {
            top_k: 5,
            min_score: Some(0.5),
        };
        let retriever = Retriever::from_config(&config, Arc::new(AxisEmbedder), index);

        let results = retriever.search("x").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].unit.text, "Unit 1.");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn test_results_bounded_and_non_increasing(
            vectors in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0), 1..20),
            top_k in 1usize..10,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let results = runtime.block_on(async {
                let vectors: Vec<[f32; 2]> = vectors.iter().map(|(a, b)| [*a, *b]).collect();
                let index = populated(&vectors).await;
                Retriever::new(Arc::new(AxisEmbedder), index)
                    .retrieve("x", top_k)
                    .await
                    .unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= vectors.len());
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
