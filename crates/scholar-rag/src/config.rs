//! Configuration for the ingestion and retrieval pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Document classifier configuration
    pub classifier: ClassifierConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// OCR tooling configuration
    pub ocr: OcrConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration: `.env`, then the optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Ignoring unreadable .env file: {}", e);
            }
        }

        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from process environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("GROQ_API_KEY") {
            self.llm.groq_api_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(cmd) = lookup("TESSERACT_CMD") {
            self.ocr.tesseract_cmd = PathBuf::from(cmd);
        }
        if let Some(cmd) = lookup("PDFTOPPM_CMD") {
            self.ocr.pdftoppm_cmd = PathBuf::from(cmd);
        }
        if let Some(path) = lookup("SCHOLAR_RAG_STORE") {
            self.vector_db.storage_path = PathBuf::from(path);
        }
    }

    /// Reject settings the splitter and store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be greater than 0".to_string()));
        }
        if self.vector_db.batch_size == 0 {
            return Err(Error::Config("vector_db.batch_size must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_relevance) {
            return Err(Error::Config("retrieval.min_relevance must be within 0.0..=1.0".to_string()));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum trimmed chunk length (shorter chunks are dropped)
    pub min_chunk_chars: usize,
    /// Separators tried in priority order; "" means a hard character cut
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 120,
            min_chunk_chars: 40,
            separators: crate::ingestion::DEFAULT_SEPARATORS
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Document classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum keyword hits for the rule-based label to be accepted
    pub rule_threshold: usize,
    /// Characters of the first page used as the rule-based preview
    pub preview_chars: usize,
    /// Characters of the preview sent to the language model
    pub llm_preview_chars: usize,
    /// Ask the language model when keyword scoring is inconclusive
    pub use_llm_fallback: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rule_threshold: 2,
            preview_chars: 1000,
            llm_preview_chars: 300,
            use_llm_fallback: true,
        }
    }
}

/// Language model backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Groq (OpenAI-compatible chat completions)
    Groq,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which backend answers classification prompts
    pub backend: LlmBackend,
    /// Ollama base URL (also used for embeddings)
    pub base_url: String,
    /// Ollama generation model name
    pub generate_model: String,
    /// Groq API base URL
    pub groq_base_url: String,
    /// Groq model name
    pub groq_model: String,
    /// Groq API key (usually from GROQ_API_KEY)
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_model: "llama-3.3-70b-versatile".to_string(),
            groq_api_key: None,
            temperature: 0.0, // Label answers should be deterministic
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model (all-minilm is all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM, 768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm".to_string(),
            dimensions: 384,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// SQLite file holding chunks and embeddings
    pub storage_path: PathBuf,
    /// Collection name scoping the stored chunks
    pub collection: String,
    /// Chunks per insert batch
    pub batch_size: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scholar-rag")
            .join("chroma.db");

        Self {
            storage_path,
            collection: "academic_docs".to_string(),
            batch_size: 100,
        }
    }
}

/// OCR tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Enable OCR for images and scanned PDFs
    pub enabled: bool,
    /// tesseract binary (name on PATH or absolute path)
    pub tesseract_cmd: PathBuf,
    /// pdftoppm binary used to rasterize PDF pages
    pub pdftoppm_cmd: PathBuf,
    /// Rasterization resolution
    pub dpi: u32,
    /// tesseract language pack
    pub language: String,
    /// Pages with less direct text than this are OCR'd
    pub min_text_chars: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_cmd: PathBuf::from("tesseract"),
            pdftoppm_cmd: PathBuf::from("pdftoppm"),
            dpi: 300,
            language: "eng".to_string(),
            min_text_chars: 20,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned when the caller does not say
    pub default_top_k: usize,
    /// Results scoring below this are dropped (0.0 keeps everything)
    pub min_relevance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            min_relevance: 0.0,
        }
    }
}
