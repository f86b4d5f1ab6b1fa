//! Core types for the pipeline

pub mod document;
pub mod query;

pub use document::{file_basename, Chunk, ChunkMetadata, DocType, FileType, PageRecord};
pub use query::{MetadataFilter, RetrievalResult};
