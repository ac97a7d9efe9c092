//! Sentence-window chunking

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Document, RetrievalUnit};

/// Groups consecutive sentences into retrieval units
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    sentences_per_unit: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(2)
    }
}

impl SentenceChunker {
    /// Create a chunker emitting `sentences_per_unit` sentences per unit
    pub fn new(sentences_per_unit: usize) -> Self {
        Self {
            sentences_per_unit: sentences_per_unit.max(1),
        }
    }

    /// Split documents into units.
    ///
    /// Windows do not overlap and the last one may be short, so the units of a
    /// document concatenate back to its text. `order_index` counts units per
    /// source file across all of that file's documents.
    pub fn split(&self, documents: &[Document]) -> Vec<RetrievalUnit> {
        let mut units = Vec::new();
        let mut next_index: HashMap<&str, u32> = HashMap::new();

        for doc in documents {
            let sentences: Vec<&str> = doc.content.split_sentence_bounds().collect();

            for window in sentences.chunks(self.sentences_per_unit) {
                let text = window.concat();
                if text.trim().is_empty() {
                    continue;
                }

                let order_index = next_index.entry(doc.meta.file_path.as_str()).or_insert(0);
                units.push(RetrievalUnit::new(doc, text, *order_index));
                *order_index += 1;
            }
        }

        tracing::debug!(
            "Split {} documents into {} units",
            documents.len(),
            units.len()
        );
        units
    }
}
