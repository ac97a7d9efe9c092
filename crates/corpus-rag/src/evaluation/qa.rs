//! Question/reference-answer sets

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// A question with its reference answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// Question asked of the pipeline
    pub question: String,
    /// Reference answer
    pub ground_truth: String,
}

/// Load a JSON array of `{question, ground_truth}` records
pub fn load_qa_pairs<P: AsRef<Path>>(path: P) -> Result<Vec<QaPair>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let pairs: Vec<QaPair> = serde_json::from_str(&raw)?;
    tracing::info!("Loaded {} QA pairs from {}", pairs.len(), path.as_ref().display());
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_load_qa_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");
        std::fs::write(
            &path,
            r#"[{"question": "What is edge AI?", "ground_truth": "AI on local devices."}]"#,
        )
        .unwrap();

        let pairs = load_qa_pairs(&path).unwrap();
        assert_eq!(
            pairs,
            vec![QaPair {
                question: "What is edge AI?".to_string(),
                ground_truth: "AI on local devices.".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_qa_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");
        std::fs::write(&path, r#"{"question": "not an array"}"#).unwrap();

        assert!(matches!(load_qa_pairs(&path), Err(Error::Json(_))));
    }
}
