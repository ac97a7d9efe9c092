//! Provider abstractions for embeddings, generation and vector storage
//!
//! The pipeline depends only on the traits; the Ollama, in-memory and SQLite
//! implementations are one choice of backends.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod sqlite;
pub mod vector_index;

use std::sync::Arc;

use crate::config::{VectorBackend, VectorDbConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use llm::GenerationModel;
pub use memory::InMemoryVectorIndex;
pub use ollama::{ollama_providers, OllamaClient, OllamaEmbedder, OllamaLlm};
pub use sqlite::SqliteVectorIndex;
pub use vector_index::{cosine_similarity, VectorIndex};

/// Open the configured vector index backend
pub fn create_vector_index(config: &VectorDbConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.backend {
        VectorBackend::Memory => Ok(Arc::new(InMemoryVectorIndex::new())),
        VectorBackend::Sqlite => Ok(Arc::new(SqliteVectorIndex::new(&config.storage_path)?)),
    }
}
