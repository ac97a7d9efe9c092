//! In-memory vector index using cosine similarity

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{RetrievalUnit, ScoredUnit};

use super::vector_index::{cosine_similarity, rank, VectorIndex};

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<String, (u64, RetrievalUnit)>,
    next_seq: u64,
}

/// Process-local vector index backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<Entries>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, units: &[RetrievalUnit]) -> Result<()> {
        if let Some(unit) = units.iter().find(|u| u.embedding.is_empty()) {
            return Err(Error::vector_index(format!("Unit {} has no embedding", unit.key)));
        }

        let mut entries = self.entries.write().await;
        for unit in units {
            let existing = entries.by_key.get(&unit.key).map(|(seq, _)| *seq);
            let seq = match existing {
                Some(seq) => seq,
                None => {
                    entries.next_seq += 1;
                    entries.next_seq
                }
            };
            entries.by_key.insert(unit.key.clone(), (seq, unit.clone()));
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredUnit>> {
        let entries = self.entries.read().await;

        let mut stored: Vec<&(u64, RetrievalUnit)> = entries.by_key.values().collect();
        stored.sort_by_key(|(seq, _)| *seq);

        let mut scored = Vec::with_capacity(stored.len());
        for (_, unit) in stored {
            if unit.embedding.len() != vector.len() {
                return Err(Error::vector_index(format!(
                    "Dimension mismatch: query has {}, unit {} has {}",
                    vector.len(),
                    unit.key,
                    unit.embedding.len()
                )));
            }
            scored.push(ScoredUnit {
                score: cosine_similarity(&unit.embedding, vector),
                unit: unit.clone(),
            });
        }

        Ok(rank(scored, top_k))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.by_key.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{Document, DocumentMeta, FileType};

    /// Embedded unit from `path` with the given text and vector
    pub(crate) fn unit(path: &str, order_index: u32, text: &str, embedding: Vec<f32>) -> RetrievalUnit {
        let meta = DocumentMeta {
            file_type: FileType::Txt,
            file_path: path.to_string(),
            page: 1,
            url: None,
        };
        let doc = Document::new(text, meta, 0);
        let mut unit = RetrievalUnit::new(&doc, text, order_index);
        unit.embedding = embedding;
        unit
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let index = InMemoryVectorIndex::new();
        let a = unit("a.txt", 0, "Alpha.", vec![1.0, 0.0]);

        index.upsert(&[a.clone()]).await.unwrap();
        index.upsert(&[a.clone()]).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);

        let b = unit("a.txt", 1, "Beta.", vec![0.0, 1.0]);
        index.upsert(&[b]).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(&[
                unit("a.txt", 0, "Far.", vec![0.0, 1.0]),
                unit("a.txt", 1, "Near.", vec![1.0, 0.1]),
                unit("a.txt", 2, "Exact.", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 2).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.unit.text.as_str()).collect();
        assert_eq!(texts, vec!["Exact.", "Near."]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = InMemoryVectorIndex::new();
        let first = unit("a.txt", 0, "First.", vec![1.0, 0.0]);
        let second = unit("b.txt", 0, "Second.", vec![2.0, 0.0]);
        index.upsert(&[first.clone(), second]).await.unwrap();
        // Rewriting an existing key does not move it to the back
        index.upsert(&[first]).await.unwrap();

        let results = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].unit.text, "First.");
        assert_eq!(results[1].unit.text, "Second.");
    }

    #[tokio::test]
    async fn test_rejects_unembedded_units() {
        let index = InMemoryVectorIndex::new();
        let err = index.upsert(&[unit("a.txt", 0, "Bare.", Vec::new())]).await;
        assert!(err.is_err());
        assert!(index.is_empty().await.unwrap());
    }
}
