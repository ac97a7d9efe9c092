//! Ollama client and providers for embeddings and generation
//!
//! Every request carries the configured timeout and is retried with
//! exponential backoff up to `llm.max_retries` times.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, GenerationError, Result};

use super::embedding::EmbeddingProvider;
use super::llm::GenerationModel;

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct EmbedBatchRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T, E>(&self, operation: F) -> std::result::Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.config.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Generate an embedding for one text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let (url, client, model) = (url.as_str(), &self.client, self.config.embed_model.as_str());

        self.retry_request(|| async move {
            let request = EmbedRequest {
                model,
                prompt: text,
            };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate embeddings for several texts in one request
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url);
        let (url, client, model) = (url.as_str(), &self.client, self.config.embed_model.as_str());

        let embeddings = self
            .retry_request(|| async move {
                let request = EmbedBatchRequest {
                    model,
                    input: texts,
                };

                let response = client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Batch embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::embedding(format!(
                        "Batch embedding failed: HTTP {}",
                        response.status()
                    )));
                }

                let batch: EmbedBatchResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse batch embedding response: {}", e))
                })?;

                Ok(batch.embeddings)
            })
            .await?;

        if embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    /// Generate a completion for a rendered prompt
    pub async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let (url, client, config) = (url.as_str(), &self.client, &self.config);
        let timeout_secs = config.timeout_secs;

        tracing::info!("Generating answer with model: {}", config.generate_model);

        self.retry_request(|| async move {
            let request = GenerateRequest {
                model: &config.generate_model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: config.temperature,
                    num_predict: config.max_tokens,
                },
            };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        GenerationError::Timeout { secs: timeout_secs }
                    } else {
                        GenerationError::ModelUnavailable(format!("Generation request failed: {}", e))
                    }
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(GenerationError::ModelUnavailable(format!(
                    "Generation failed: HTTP {} - {}",
                    status, body
                )));
            }

            let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                GenerationError::ModelUnavailable(format!("Failed to parse generation response: {}", e))
            })?;

            Ok(generate_response.response)
        })
        .await
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from an existing client
    pub fn new(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama generation model
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from an existing client
    pub fn new(client: Arc<OllamaClient>) -> Self {
        let model = client.config.generate_model.clone();
        Self { client, model }
    }
}

#[async_trait]
impl GenerationModel for OllamaLlm {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.client.generate(prompt).await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Embedder and generation model sharing one client
pub fn ollama_providers(
    config: &LlmConfig,
    dimensions: usize,
) -> Result<(Arc<OllamaEmbedder>, Arc<OllamaLlm>)> {
    let client = Arc::new(OllamaClient::new(config)?);
    Ok((
        Arc::new(OllamaEmbedder::new(Arc::clone(&client), dimensions)),
        Arc::new(OllamaLlm::new(client)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unreachable_config() -> LlmConfig {
        LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            max_retries: 0,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_retries() {
        let config = LlmConfig {
            max_retries: 1,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: std::result::Result<(), String> = client
            .retry_request(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_returns_first_success() {
        let client = OllamaClient::new(&LlmConfig::default()).unwrap();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: std::result::Result<u32, String> = client
            .retry_request(|| async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) })
            .await;

        assert_eq!(result.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let (embedder, llm) = ollama_providers(&unreachable_config(), 768).unwrap();

        assert!(llm.generate("hello").await.is_err());
        assert!(embedder.embed("hello").await.is_err());
        assert_eq!(embedder.dimensions(), 768);
        assert_eq!(llm.model(), "zephyr");
    }
}
