//! Application context: every collaborator built once from configuration

use std::sync::Arc;

use crate::config::{LlmBackend, RagConfig};
use crate::error::Result;
use crate::generation::OllamaClient;
use crate::ingestion::{DocumentChunker, DocumentClassifier, FileParser, IngestPipeline, OcrEngine, TesseractOcr};
use crate::providers::{
    EmbeddingProvider, GroqLlm, LlmProvider, LocalVectorStore, OllamaEmbedder, OllamaLlm,
    VectorStoreProvider,
};
use crate::retrieval::Retriever;

/// Health of one external dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub component: &'static str,
    pub provider: String,
    pub healthy: bool,
}

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: RagConfig,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    ocr: Option<Arc<dyn OcrEngine>>,
    classifier: Arc<DocumentClassifier>,
    chunker: Arc<DocumentChunker>,
    pipeline: IngestPipeline,
    retriever: Retriever,
}

impl AppContext {
    /// Build the real providers described by `config`
    ///
    /// Fails when OCR is enabled but its binaries cannot be run, when Groq is
    /// selected without an API key, or when the store cannot be opened.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing pipeline (llm backend: {:?})", config.llm.backend);

        let ollama = Arc::new(OllamaClient::new(&config.llm)?);
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::from_client(Arc::clone(&ollama), &config.embeddings));
        tracing::info!(
            "Embeddings: {} ({} dimensions)",
            config.embeddings.model,
            config.embeddings.dimensions
        );

        let llm: Arc<dyn LlmProvider> = match config.llm.backend {
            LlmBackend::Ollama => Arc::new(OllamaLlm::from_client(
                Arc::clone(&ollama),
                config.llm.generate_model.clone(),
            )),
            LlmBackend::Groq => Arc::new(GroqLlm::new(&config.llm)?),
        };
        tracing::info!("Language model: {} ({})", llm.name(), llm.model());

        let store: Arc<dyn VectorStoreProvider> =
            Arc::new(LocalVectorStore::from_config(&config.vector_db, Arc::clone(&embedder))?);
        tracing::info!("Vector store: {}", config.vector_db.storage_path.display());

        let ocr: Option<Arc<dyn OcrEngine>> = if config.ocr.enabled {
            let engine = TesseractOcr::new(&config.ocr)?;
            tracing::info!("OCR: {}", config.ocr.tesseract_cmd.display());
            Some(Arc::new(engine))
        } else {
            tracing::info!("OCR disabled; scanned documents will be skipped");
            None
        };

        Ok(Self::with_providers(config, llm, embedder, store, ocr))
    }

    /// Assemble the pipeline around already-built providers
    pub fn with_providers(
        config: RagConfig,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        ocr: Option<Arc<dyn OcrEngine>>,
    ) -> Self {
        let classifier = Arc::new(DocumentClassifier::new(&config.classifier, Some(Arc::clone(&llm))));
        let chunker = Arc::new(DocumentChunker::new(
            &config,
            Arc::new(FileParser),
            ocr.clone(),
            Arc::clone(&classifier),
        ));
        let pipeline = IngestPipeline::new(
            Arc::clone(&chunker),
            Arc::clone(&store),
            config.vector_db.batch_size,
        );
        let retriever = Retriever::new(Arc::clone(&store), &config.retrieval);

        Self {
            inner: Arc::new(AppContextInner {
                config,
                llm,
                embedder,
                store,
                ocr,
                classifier,
                chunker,
                pipeline,
                retriever,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get LLM provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    /// Get embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    /// Get vector store provider
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.store
    }

    /// Get OCR engine, if enabled
    pub fn ocr(&self) -> Option<&Arc<dyn OcrEngine>> {
        self.inner.ocr.as_ref()
    }

    pub fn classifier(&self) -> &DocumentClassifier {
        &self.inner.classifier
    }

    pub fn chunker(&self) -> &DocumentChunker {
        &self.inner.chunker
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    /// Probe the language model, embedder and store
    pub async fn health_check(&self) -> Vec<HealthStatus> {
        let llm = &self.inner.llm;
        let embedder = &self.inner.embedder;
        let store = &self.inner.store;

        vec![
            HealthStatus {
                component: "llm",
                provider: format!("{} ({})", llm.name(), llm.model()),
                healthy: llm.health_check().await.unwrap_or(false),
            },
            HealthStatus {
                component: "embeddings",
                provider: format!("{} ({})", embedder.name(), embedder.model()),
                healthy: embedder.health_check().await.unwrap_or(false),
            },
            HealthStatus {
                component: "vector_db",
                provider: store.name().to_string(),
                healthy: store.health_check().await.unwrap_or(false),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ChunkIndex;
    use crate::testing::{write_docx, HashEmbedder, MockLlm};
    use crate::types::DocType;

    fn context(llm: MockLlm) -> AppContext {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new());
        let store = Arc::new(LocalVectorStore::new(
            Arc::new(ChunkIndex::in_memory("academic_docs").unwrap()),
            Arc::clone(&embedder),
        ));
        AppContext::with_providers(RagConfig::default(), Arc::new(llm), embedder, store, None)
    }

    #[tokio::test]
    async fn test_ingest_then_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let syllabus = dir.path().join("dbms_syllabus.docx");
        write_docx(
            &syllabus,
            &[
                "Course objectives: understand relational design and transactions.",
                "Unit 1: ER modelling, relational algebra and SQL queries.",
            ],
        );
        let handout = dir.path().join("handout.docx");
        write_docx(&handout, &["Two-phase locking guarantees conflict serializable schedules."]);

        let ctx = context(MockLlm::replying("notes"));
        let report = ctx
            .pipeline()
            .ingest_files(&[syllabus, handout], "dbms")
            .await
            .unwrap();
        assert_eq!(report.total_chunks(), 2);
        assert_eq!(ctx.store().len().await.unwrap(), 2);

        let syllabus_chunks = ctx
            .retriever()
            .retrieve("relational algebra", 5, Some(DocType::Syllabus), Some("dbms"))
            .await
            .unwrap();
        assert_eq!(syllabus_chunks.len(), 1);
        assert_eq!(syllabus_chunks[0].metadata.source_file, "dbms_syllabus.docx");

        let notes = ctx
            .retriever()
            .retrieve("locking", 5, Some(DocType::Notes), None)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].content.starts_with("Two-phase locking"));
    }

    #[tokio::test]
    async fn test_health_check_reports_each_component() {
        let ctx = context(MockLlm::failing());
        let report = ctx.health_check().await;

        let components: Vec<_> = report.iter().map(|s| s.component).collect();
        assert_eq!(components, vec!["llm", "embeddings", "vector_db"]);
        assert!(!report[0].healthy);
        assert!(report[1].healthy && report[2].healthy);
    }
}
