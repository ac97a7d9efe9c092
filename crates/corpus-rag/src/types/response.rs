//! Answer type returned by the RAG orchestrator

use serde::{Deserialize, Serialize};

use super::query::ScoredUnit;

/// Generated answer together with the context used to ground it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Text produced by the generation model
    pub answer: String,
    /// Raw text of each retrieved unit, in retrieval order
    pub contexts: Vec<String>,
    /// Retrieved units with their scores
    pub source_units: Vec<ScoredUnit>,
}

impl Answer {
    /// Distinct provenance (URL or path) of the units behind this answer, in order
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for scored in &self.source_units {
            let source = scored.unit.meta.provenance();
            if !seen.contains(&source) {
                seen.push(source);
            }
        }
        seen
    }
}
