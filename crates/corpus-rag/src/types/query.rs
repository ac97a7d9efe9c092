//! Query and retrieval result types

use serde::{Deserialize, Serialize};

use super::document::RetrievalUnit;

/// A question asked against the indexed corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// The question text
    pub text: String,
}

impl Query {
    /// Create a query
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// A retrieved unit paired with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredUnit {
    /// The retrieved unit
    pub unit: RetrievalUnit,
    /// Cosine similarity (higher is more similar)
    pub score: f32,
}

/// Retrieved units ordered by descending score, at most `top_k` long
pub type RetrievalResult = Vec<ScoredUnit>;
