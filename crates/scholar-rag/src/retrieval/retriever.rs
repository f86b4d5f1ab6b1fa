//! Filtered similarity retrieval over the vector store

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::VectorStoreProvider;
use crate::types::{Chunk, DocType, MetadataFilter, RetrievalResult};

/// Retriever with optional doc-type and subject filters
pub struct Retriever {
    store: Arc<dyn VectorStoreProvider>,
    min_relevance: f32,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(store: Arc<dyn VectorStoreProvider>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            min_relevance: config.min_relevance,
        }
    }

    /// Most relevant chunks for a query
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        doc_type: Option<DocType>,
        subject: Option<&str>,
    ) -> Result<Vec<Chunk>> {
        Ok(self
            .retrieve_with_scores(query, top_k, doc_type, subject)
            .await?
            .into_iter()
            .map(|r| r.chunk)
            .collect())
    }

    /// Most relevant chunks with relevance scores, best first
    pub async fn retrieve_with_scores(
        &self,
        query: &str,
        top_k: usize,
        doc_type: Option<DocType>,
        subject: Option<&str>,
    ) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let filter = MetadataFilter::new(doc_type, subject);
        let filter = (!filter.is_empty()).then_some(filter);

        let mut results = self
            .store
            .similarity_search_with_scores(query, top_k, filter.as_ref())
            .await?;

        results.retain(|r| {
            r.score >= self.min_relevance && filter.as_ref().map_or(true, |f| f.matches(&r.chunk))
        });
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks for {:?} (filter: {:?})",
            results.len(),
            query,
            filter
        );
        Ok(results)
    }

    /// Render chunks as prompt context
    pub fn format_chunks_for_prompt(chunks: &[Chunk]) -> String {
        PromptBuilder::format_chunks_for_prompt(chunks)
    }
}
