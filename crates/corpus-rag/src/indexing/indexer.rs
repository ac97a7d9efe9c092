//! Duplicate-safe indexing
//!
//! Documents are cleaned, split into sentence windows, embedded in batches
//! and upserted by key. A batch whose embedding call fails is retried one unit
//! at a time so each failure is attributed to a single unit.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{IndexingError, Result};
use crate::ingestion::{DocumentCleaner, SentenceChunker};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::{Document, RetrievalUnit};

/// Outcome of an indexing run
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Units written to the index
    pub indexed_count: usize,
    /// Units that could not be embedded or written
    pub errors: Vec<IndexingError>,
}

/// Embeds units and writes them to a vector index
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    cleaner: DocumentCleaner,
    chunker: SentenceChunker,
    batch_size: usize,
    parallel_batches: usize,
}

impl Indexer {
    /// Create an indexer with default cleaning, 2-sentence units and batches of 32
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            cleaner: DocumentCleaner::default(),
            chunker: SentenceChunker::default(),
            batch_size: 32,
            parallel_batches: 1,
        }
    }

    /// Create an indexer using the chunking, batching and parallelism settings of `config`
    pub fn from_config(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self::new(embedder, index)
            .with_cleaner(DocumentCleaner::new(config.chunking.remove_boilerplate))
            .with_chunker(SentenceChunker::new(config.chunking.sentences_per_unit))
            .with_batch_size(config.embeddings.batch_size)
            .with_parallel_batches(config.processing.embedding_workers())
    }

    /// Set the document cleaner
    pub fn with_cleaner(mut self, cleaner: DocumentCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Set the chunker
    pub fn with_chunker(mut self, chunker: SentenceChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Set the number of units per embedding request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set how many embedding requests run at once
    pub fn with_parallel_batches(mut self, parallel_batches: usize) -> Self {
        self.parallel_batches = parallel_batches.max(1);
        self
    }

    /// Clean, split, embed and upsert `documents`
    pub async fn index(&self, documents: &[Document]) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        if documents.is_empty() {
            return Ok(report);
        }

        let cleaned = self.cleaner.clean(documents);
        let units = self.chunker.split(&cleaned);

        tracing::info!(
            "Indexing {} units from {} documents with {} (batch size {}, {} parallel)",
            units.len(),
            documents.len(),
            self.embedder.name(),
            self.batch_size,
            self.parallel_batches
        );

        let batches: Vec<Vec<RetrievalUnit>> = units
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        // buffered() yields in submission order, so writes keep document order
        let mut embedded = std::pin::pin!(stream::iter(batches)
            .map(|batch| self.embed_batch(batch))
            .buffered(self.parallel_batches));

        while let Some((units, errors)) = embedded.next().await {
            report.errors.extend(errors);
            if units.is_empty() {
                continue;
            }

            match self.index.upsert(&units).await {
                Ok(()) => report.indexed_count += units.len(),
                Err(e) => {
                    tracing::warn!("Upsert of {} units into {} failed: {}", units.len(), self.index.name(), e);
                    report
                        .errors
                        .extend(units.iter().map(|unit| IndexingError::WriteFailure {
                            key: unit.key.clone(),
                            file_path: unit.meta.file_path.clone(),
                            reason: e.to_string(),
                        }));
                }
            }
        }

        for error in &report.errors {
            tracing::warn!("{}", error);
        }
        tracing::info!(
            "Indexed {} units ({} failed)",
            report.indexed_count,
            report.errors.len()
        );

        Ok(report)
    }

    /// Embed a batch, falling back to one call per unit when the batch call fails
    async fn embed_batch(&self, mut batch: Vec<RetrievalUnit>) -> (Vec<RetrievalUnit>, Vec<IndexingError>) {
        let texts: Vec<String> = batch.iter().map(|unit| unit.text.clone()).collect();

        match self.embedder.embed_batch(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (unit, vector) in batch.iter_mut().zip(vectors) {
                    unit.embedding = vector;
                }
                return (batch, Vec::new());
            }
            Ok(vectors) => tracing::warn!(
                "Batch embedding returned {} vectors for {} units, embedding one by one",
                vectors.len(),
                batch.len()
            ),
            Err(e) => tracing::warn!(
                "Batch embedding of {} units failed: {}, embedding one by one",
                batch.len(),
                e
            ),
        }

        let mut embedded = Vec::with_capacity(batch.len());
        let mut errors = Vec::new();
        for mut unit in batch {
            match self.embedder.embed(&unit.text).await {
                Ok(vector) => {
                    unit.embedding = vector;
                    embedded.push(unit);
                }
                Err(e) => errors.push(IndexingError::EmbeddingFailure {
                    key: unit.key.clone(),
                    file_path: unit.meta.file_path.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        (embedded, errors)
    }
}
