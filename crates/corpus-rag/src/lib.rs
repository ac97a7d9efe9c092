//! corpus-rag: multi-format corpus ingestion, duplicate-safe indexing and grounded answers
//!
//! This crate loads a directory of PDFs, slide decks, spreadsheets, text,
//! audio/video and images into text units, indexes them as embedded sentence
//! windows, answers questions from the most similar units with a local LLM,
//! and scores generated answers against reference answers with ROUGE and BLEU.

pub mod config;
pub mod crawl;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod indexing;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use evaluation::{EvaluationResult, Evaluator};
pub use generation::{RagPipeline, RagPipelineBuilder};
pub use indexing::{IndexReport, Indexer};
pub use retrieval::Retriever;
pub use types::{Answer, Document, DocumentMeta, FileType, Query, RetrievalUnit, ScoredUnit};
