//! scholar-rag: ingestion and retrieval pipeline for academic documents
//!
//! Documents (PDF, DOCX, PPTX and scanned images) are extracted page by page,
//! labelled with a document type, split into overlapping chunks and stored
//! in a local SQLite vector index. The retriever returns the chunks most
//! relevant to a query, optionally filtered by document type and subject,
//! and formats them as source-tagged prompt context.

pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use context::AppContext;
pub use error::{Error, Result};
pub use ingestion::{DocumentChunker, DocumentClassifier, IngestPipeline};
pub use retrieval::Retriever;
pub use types::{Chunk, ChunkMetadata, DocType, FileType, MetadataFilter, PageRecord, RetrievalResult};
