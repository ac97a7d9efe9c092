//! Generation model trait for producing answers from prompts

use async_trait::async_trait;

use crate::error::GenerationError;

/// Trait for text generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (zephyr, llama3, etc.)
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Generate a completion for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
