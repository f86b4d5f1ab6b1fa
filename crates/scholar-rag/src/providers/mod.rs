//! Provider abstractions for embeddings, LLM completions and vector storage
//!
//! Trait-based seams so the pipeline can switch between the local Ollama
//! server and Groq for completions, and so tests can inject fakes.

pub mod embedding;
pub mod groq;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use groq::GroqLlm;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_store::VectorStoreProvider;
