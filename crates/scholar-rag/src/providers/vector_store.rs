//! Vector store provider trait for storing and searching chunks

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{Chunk, MetadataFilter, RetrievalResult};

/// Trait for chunk storage and similarity search
///
/// The store owns embedding: callers hand over chunks and query text, never
/// vectors. Any error from these methods means the index may be incomplete
/// and must be surfaced to the caller.
///
/// Implementations:
/// - `LocalVectorStore`: SQLite file with exact cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Embed and persist chunks; chunks with an existing ID are replaced
    async fn add(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `k` most relevant chunks with scores in 0.0..=1.0
    async fn similarity_search_with_scores(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>>;

    /// Search for the `k` most relevant chunks
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Chunk>> {
        Ok(self
            .similarity_search_with_scores(query, k, filter)
            .await?
            .into_iter()
            .map(|r| r.chunk)
            .collect())
    }

    /// Delete every chunk taken from `file_path`, returning how many were removed
    async fn delete_file(&self, file_path: &str) -> Result<usize>;

    /// Delete everything stored, including the recorded embedding model
    async fn clear(&self) -> Result<()>;

    /// Get total number of chunks stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
