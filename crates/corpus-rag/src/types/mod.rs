//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{Document, DocumentMeta, FileType, RetrievalUnit, TextUnit};
pub use query::{Query, RetrievalResult, ScoredUnit};
pub use response::Answer;
