//! LLM provider trait for single-turn completions

use async_trait::async_trait;
use crate::error::Result;

/// Trait for single-turn text completion
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
/// - `GroqLlm`: Groq hosted models (llama-3.3-70b-versatile)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the model's reply text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
