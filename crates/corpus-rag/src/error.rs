//! Error types for the corpus RAG pipeline
//!
//! Each pipeline stage has its own error enum so callers can tell local,
//! per-item failures (collected into reports) from failures that abort an
//! operation. [`Error`] wraps all of them for the crate-level [`Result`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure while turning a source file into text units
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    /// No extractor is registered for the file extension
    #[error("Unsupported file format '{extension}': {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file exists but could not be parsed
    #[error("Failed to parse '{path}': {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    /// An external capability (speech-to-text, OCR) could not be launched
    #[error("Tool '{tool}' unavailable for '{path}': {reason}")]
    ToolUnavailable {
        path: PathBuf,
        tool: String,
        reason: String,
    },
}

impl ExtractionError {
    /// Create a corrupt file error
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a tool unavailable error
    pub fn tool_unavailable(
        path: impl Into<PathBuf>,
        tool: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ToolUnavailable {
            path: path.into(),
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Per-unit failure during indexing; the batch continues
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexingError {
    /// The embedding service could not embed this unit
    #[error("Embedding failed for unit {key} ({file_path}): {reason}")]
    EmbeddingFailure {
        key: String,
        file_path: String,
        reason: String,
    },

    /// The vector index rejected the upsert
    #[error("Index write failed for unit {key} ({file_path}): {reason}")]
    WriteFailure {
        key: String,
        file_path: String,
        reason: String,
    },
}

/// Failure while retrieving context for a query
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetrievalError {
    /// The vector index holds no entries; there is no context to offer
    #[error("Vector index is empty")]
    EmptyIndex,

    /// The query text could not be embedded
    #[error("Query embedding failed: {0}")]
    QueryEmbeddingFailure(String),

    /// The vector index failed to answer the similarity query
    #[error("Vector index query failed: {0}")]
    IndexFailure(String),
}

/// Failure reported by the generation model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// The model could not be reached or returned an error
    #[error("Generation model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model did not answer within the configured timeout
    #[error("Generation timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failure that aborts an evaluation call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    /// Responses and ground truths cannot be paired
    #[error("Length mismatch: {responses} responses vs {ground_truths} ground truths")]
    LengthMismatch {
        responses: usize,
        ground_truths: usize,
    },

    /// A ground truth produced no tokens and cannot serve as a reference
    #[error("Ground truth at index {index} produced no tokens")]
    TokenizationFailure { index: usize },
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction error
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Indexing error
    #[error(transparent)]
    Indexing(#[from] IndexingError),

    /// Retrieval error
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Generation error
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Evaluation error
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Embedding service error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
