//! RAG orchestrator: retrieve, render and generate
//!
//! [`RagPipeline`] exposes the three boundary operations of the system:
//! [`index`](RagPipeline::index), [`answer`](RagPipeline::answer) and
//! [`evaluate`](RagPipeline::evaluate). Collaborators are injected through
//! [`RagPipelineBuilder`].
//!
//! ```rust,ignore
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .generation_model(llm)
//!     .build()?;
//!
//! pipeline.index(&documents).await?;
//! let answer = pipeline.answer("What is edge AI?").await?;
//! ```

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationResult, Evaluator};
use crate::indexing::{IndexReport, Indexer};
use crate::providers::{EmbeddingProvider, GenerationModel, VectorIndex};
use crate::retrieval::Retriever;
use crate::types::{Answer, Document, Query};

use super::prompt::PromptAssembler;

/// Retrieval-augmented question answering over an indexed corpus
pub struct RagPipeline {
    indexer: Indexer,
    retriever: Retriever,
    prompt: PromptAssembler,
    generator: Arc<dyn GenerationModel>,
    evaluator: Evaluator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`]
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Clean, split, embed and upsert `documents`
    pub async fn index(&self, documents: &[Document]) -> Result<IndexReport> {
        self.indexer.index(documents).await
    }

    /// Answer one question from retrieved context
    pub async fn answer(&self, query: impl Into<Query>) -> Result<Answer> {
        let query = query.into();

        let source_units = self.retriever.search(&query.text).await?;
        let prompt = self.prompt.render(&query.text, &source_units);

        tracing::debug!(
            "Generating with {} ({}) from {} context units",
            self.generator.name(),
            self.generator.model(),
            source_units.len()
        );
        let answer = self.generator.generate(&prompt).await?;

        let contexts = source_units
            .iter()
            .map(|scored| scored.unit.text.clone())
            .collect();

        Ok(Answer {
            answer: answer.trim().to_string(),
            contexts,
            source_units,
        })
    }

    /// Answer each question in order; the first failure aborts the run
    pub async fn answer_all<Q: AsRef<str>>(&self, questions: &[Q]) -> Result<Vec<Answer>> {
        let mut answers = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            tracing::info!("Answering question {}/{}", i + 1, questions.len());
            answers.push(self.answer(question.as_ref()).await?);
        }
        Ok(answers)
    }

    /// Score responses against ground truths
    pub fn evaluate<R, G>(&self, responses: &[R], ground_truths: &[G]) -> Result<EvaluationResult>
    where
        R: AsRef<str>,
        G: AsRef<str>,
    {
        Ok(self.evaluator.evaluate(responses, ground_truths)?)
    }
}

/// Builder for [`RagPipeline`]; every collaborator is required
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    generation_model: Option<Arc<dyn GenerationModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the generation model
    pub fn generation_model(mut self, model: Arc<dyn GenerationModel>) -> Self {
        self.generation_model = Some(model);
        self
    }

    /// Build the pipeline, failing with [`Error::Config`] when a part is missing
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.ok_or_else(|| Error::config("config is required"))?;
        let embedder = self
            .embedding_provider
            .ok_or_else(|| Error::config("embedding_provider is required"))?;
        let index = self
            .vector_index
            .ok_or_else(|| Error::config("vector_index is required"))?;
        let generator = self
            .generation_model
            .ok_or_else(|| Error::config("generation_model is required"))?;

        config.validate()?;

        tracing::info!(
            "RAG pipeline: embeddings {}, index {}, generation {} ({})",
            embedder.name(),
            index.name(),
            generator.name(),
            generator.model()
        );

        Ok(RagPipeline {
            indexer: Indexer::from_config(&config, embedder.clone(), index.clone()),
            retriever: Retriever::from_config(&config.retrieval, embedder, index),
            prompt: PromptAssembler::new(&config.prompt)?,
            generator,
            evaluator: Evaluator::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, RetrievalError};
    use crate::providers::InMemoryVectorIndex;
    use crate::types::{DocumentMeta, FileType};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Counts occurrences of "edge" and "cat" so related texts score high
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("edge").count() as f32 + 0.1,
                lower.matches("cat").count() as f32 + 0.1,
            ])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    /// Records the last prompt and replies with a fixed answer
    struct RecordingModel {
        reply: std::result::Result<String, GenerationError>,
        last_prompt: Mutex<Option<String>>,
    }

    impl RecordingModel {
        fn new(reply: std::result::Result<String, GenerationError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl GenerationModel for RecordingModel {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
            *self.last_prompt.lock() = Some(prompt.to_string());
            self.reply.clone()
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    fn document(path: &str, content: &str) -> Document {
        Document::new(
            content,
            DocumentMeta {
                file_type: FileType::Txt,
                file_path: path.to_string(),
                page: 1,
                url: None,
            },
            0,
        )
    }

    fn pipeline(model: Arc<RecordingModel>) -> RagPipeline {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 1;
        RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(KeywordEmbedder))
            .vector_index(Arc::new(InMemoryVectorIndex::new()))
            .generation_model(model)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let model = RecordingModel::new(Ok("  Edge AI runs on devices.\n".to_string()));
        let pipeline = pipeline(model.clone());

        pipeline
            .index(&[
                document("edge.txt", "Edge AI runs models on edge devices."),
                document("cats.txt", "A cat sat on the mat."),
            ])
            .await
            .unwrap();

        let answer = pipeline.answer("What is edge AI?").await.unwrap();
        assert_eq!(answer.answer, "Edge AI runs on devices.");
        assert_eq!(answer.contexts, vec!["Edge AI runs models on edge devices."]);
        assert_eq!(answer.sources(), vec!["edge.txt"]);

        let prompt = model.last_prompt.lock().clone().unwrap();
        assert!(prompt.contains("Edge AI runs models on edge devices. URL:edge.txt"));
        assert!(!prompt.contains("cat sat"));
    }

    #[tokio::test]
    async fn test_answer_on_empty_index() {
        let pipeline = pipeline(RecordingModel::new(Ok("unused".to_string())));
        let err = pipeline.answer("anything").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(RetrievalError::EmptyIndex)));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let model = RecordingModel::new(Err(GenerationError::Timeout { secs: 5 }));
        let pipeline = pipeline(model);
        pipeline
            .index(&[document("edge.txt", "Edge AI.")])
            .await
            .unwrap();

        let err = pipeline.answer("edge?").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Generation(GenerationError::Timeout { secs: 5 })
        ));
    }

    #[tokio::test]
    async fn test_answer_all_keeps_question_order() {
        let pipeline = pipeline(RecordingModel::new(Ok("ok".to_string())));
        pipeline
            .index(&[
                document("edge.txt", "Edge AI runs on edge hardware."),
                document("cats.txt", "The cat sat."),
            ])
            .await
            .unwrap();

        let answers = pipeline
            .answer_all(&["edge edge?", "cat cat?"])
            .await
            .unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].sources(), vec!["edge.txt"]);
        assert_eq!(answers[1].sources(), vec!["cats.txt"]);
    }

    #[test]
    fn test_builder_requires_every_part() {
        let err = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(KeywordEmbedder))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(message) if message.contains("vector_index")));
    }

    #[test]
    fn test_evaluate_through_pipeline() {
        let pipeline = pipeline(RecordingModel::new(Ok(String::new())));
        let result = pipeline.evaluate(&["the cat sat"], &["the cat sat"]).unwrap();
        assert!((result.averages.rouge1 - 1.0).abs() < 1e-9);

        assert!(matches!(
            pipeline.evaluate(&["a"], &["a", "b"]),
            Err(Error::Evaluation(_))
        ));
    }
}
