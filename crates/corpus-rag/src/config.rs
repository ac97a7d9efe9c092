//! Configuration for the corpus RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Corpus locations
    pub corpus: CorpusConfig,
    /// Cleaning and chunking
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Prompt template and domain policy
    pub prompt: PromptConfig,
    /// Processing (parallelism) configuration
    pub processing: ProcessingConfig,
    /// Speech-to-text tool for audio/video
    pub transcription: TranscriptionConfig,
    /// OCR tool for images
    pub ocr: OcrConfig,
    /// Website crawler
    pub crawl: CrawlConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing sections fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.chunking.sentences_per_unit == 0 {
            return Err(Error::config("chunking.sentences_per_unit must be greater than zero"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than zero"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be greater than zero"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(Error::config("llm.base_url must not be empty"));
        }
        if let Some(template) = &self.prompt.template {
            if !template.contains("{query}") {
                return Err(Error::config("prompt.template must contain a {query} placeholder"));
            }
        }
        Ok(())
    }
}

/// Corpus and reference data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory holding the source files
    pub dir: PathBuf,
    /// JSON file with `{question, ground_truth}` records
    pub qa_file: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("corpus"),
            qa_file: PathBuf::from("data/qa.json"),
        }
    }
}

/// Cleaning and chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of sentences per retrieval unit
    pub sentences_per_unit: usize,
    /// Strip lines repeated across most pages of a file (headers, footers).
    /// Off by default since repeated content sentences are stripped too.
    pub remove_boilerplate: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            sentences_per_unit: 2,
            remove_boilerplate: false,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name reported in logs
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Units embedded per request batch
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens generated per answer
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "zephyr".to_string(),
            temperature: 0.3,
            max_tokens: 350,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector index backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Process-local index, lost on exit
    Memory,
    /// SQLite file at `storage_path`
    #[default]
    Sqlite,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend to use
    pub backend: VectorBackend,
    /// Storage path for the SQLite index
    pub storage_path: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("corpus-rag")
            .join("vectors.db");

        Self {
            backend: VectorBackend::Sqlite,
            storage_path,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of units returned per query
    pub top_k: usize,
    /// Drop results scoring below this similarity
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
        }
    }
}

/// Prompt template and domain-scoping policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Subject the assistant is allowed to answer about
    pub domain: String,
    /// Fixed reply for out-of-domain questions
    pub refusal: String,
    /// Custom template with `{context}` and `{query}` placeholders
    pub template: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            domain: "edge AI".to_string(),
            refusal: "I only answer Edge AI questions".to_string(),
            template: None,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel file extractions (default: CPU count, max 8)
    pub parallel_files: Option<usize>,
    /// Number of concurrent embedding batches (default: CPU count, max 4)
    pub parallel_embeddings: Option<usize>,
}

impl ProcessingConfig {
    /// Resolved file worker count
    pub fn file_workers(&self) -> usize {
        self.parallel_files
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }

    /// Resolved embedding concurrency
    pub fn embedding_workers(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Executable to run
    pub command: String,
    /// Whisper model name
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            command: "whisper".to_string(),
            model: "base".to_string(),
        }
    }
}

/// OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Executable to run
    pub command: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
        }
    }
}

/// Website crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Start URL; only links on the same host are followed
    pub base_url: String,
    /// Directory receiving downloaded files
    pub output_dir: PathBuf,
    /// Upper bound on pages fetched
    pub max_pages: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aiap.sg/apprenticeship/".to_string(),
            output_dir: PathBuf::from("corpus"),
            max_pages: 200,
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.sentences_per_unit, 2);
        assert!(!config.chunking.remove_boilerplate);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.vector_db.backend, VectorBackend::Sqlite);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let raw = r#"
            [retrieval]
            top_k = 3

            [vector_db]
            backend = "memory"
        "#;
        let config: RagConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
        assert_eq!(config.chunking.sentences_per_unit, 2);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.prompt.template = Some("Context: {context}".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chunking]\nsentences_per_unit = 4\n").unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunking.sentences_per_unit, 4);
    }
}
