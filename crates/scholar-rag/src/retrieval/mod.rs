//! Vector index and retrieval

pub mod index;
pub mod retriever;
pub mod similarity;

pub use index::ChunkIndex;
pub use retriever::Retriever;
