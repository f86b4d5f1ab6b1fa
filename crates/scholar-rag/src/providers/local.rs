//! Local vector store backed by a SQLite file
//!
//! Wraps the synchronous `ChunkIndex` and an embedding provider to implement
//! `VectorStoreProvider`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::retrieval::ChunkIndex;
use crate::types::{Chunk, MetadataFilter, RetrievalResult};

use super::embedding::EmbeddingProvider;
use super::vector_store::VectorStoreProvider;

/// Local vector store embedding through an injected provider
pub struct LocalVectorStore {
    index: Arc<ChunkIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl LocalVectorStore {
    /// Create from an existing index
    pub fn new(index: Arc<ChunkIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Open the store described by config
    pub fn from_config(config: &VectorDbConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let index = ChunkIndex::open(&config.storage_path, config.collection.clone())?;
        tracing::debug!(
            "Opened vector store {} (collection {})",
            config.storage_path.display(),
            config.collection
        );
        Ok(Self::new(Arc::new(index), embedder))
    }

    /// Get underlying index for direct access
    pub fn index(&self) -> &Arc<ChunkIndex> {
        &self.index
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        let model = self.embedder.model().to_string();
        let dimensions = self.embedder.dimensions();
        let entries: Vec<(Chunk, Vec<f32>)> = chunks.iter().cloned().zip(embeddings).collect();
        let index = self.index.clone();

        tokio::task::spawn_blocking(move || {
            index.ensure_model(&model, dimensions)?;
            index.upsert(&entries)
        })
        .await?
    }

    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        if k == 0 || self.is_empty().await? {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let model = self.embedder.model().to_string();
        let dimensions = self.embedder.dimensions();
        let filter = filter.cloned();
        let index = self.index.clone();

        tokio::task::spawn_blocking(move || {
            index.ensure_model(&model, dimensions)?;
            index.search(&embedding, k, filter.as_ref())
        })
        .await?
    }

    async fn delete_file(&self, file_path: &str) -> Result<usize> {
        let index = self.index.clone();
        let path = file_path.to_string();
        let deleted = tokio::task::spawn_blocking(move || index.delete_file(&path)).await??;
        tracing::debug!("Deleted {} stale chunks of {}", deleted, file_path);
        Ok(deleted)
    }

    async fn clear(&self) -> Result<()> {
        let index = self.index.clone();
        let deleted = tokio::task::spawn_blocking(move || index.clear()).await??;
        tracing::info!("Cleared {} chunks from collection {}", deleted, self.index.collection());
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let index = self.index.clone();
        tokio::task::spawn_blocking(move || index.len()).await?
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.len().await.is_ok())
    }

    fn name(&self) -> &str {
        "local"
    }
}
