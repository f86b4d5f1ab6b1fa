//! Retrieval filter and result types

use serde::{Deserialize, Serialize};

use super::document::{Chunk, DocType};

/// Equality filter over chunk metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Only chunks with this document type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
    /// Only chunks tagged with this subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl MetadataFilter {
    /// Build a filter from the optional fields; a blank subject is unset
    pub fn new(doc_type: Option<DocType>, subject: Option<&str>) -> Self {
        Self {
            doc_type,
            subject: subject.filter(|s| !s.trim().is_empty()).map(|s| s.to_string()),
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.doc_type.is_none() && self.subject.is_none()
    }

    /// Check whether a chunk satisfies every set field
    pub fn matches(&self, chunk: &Chunk) -> bool {
        if let Some(doc_type) = self.doc_type {
            if chunk.metadata.doc_type != doc_type {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if &chunk.metadata.subject != subject {
                return false;
            }
        }
        true
    }
}

/// A retrieved chunk with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Relevance score (0.0 to 1.0, higher is more similar)
    pub score: f32,
}
