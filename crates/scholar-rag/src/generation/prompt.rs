//! Prompt templates for classification and retrieved context

use crate::types::{Chunk, DocType};

/// Separator between formatted context entries
const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Prompt builder
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the single-label classification prompt
    ///
    /// Only the first `max_preview_chars` characters of the preview are sent.
    pub fn build_classification_prompt(filename: &str, preview: &str, max_preview_chars: usize) -> String {
        let labels = DocType::ALL.map(|t| t.as_str()).join(" / ");
        let preview: String = preview.chars().take(max_preview_chars).collect();

        format!(
            "Classify this document into exactly ONE of these categories:\n\
             {labels}\n\n\
             Filename: {filename}\n\
             Content preview: {preview}\n\n\
             Reply with ONLY the category label, nothing else."
        )
    }

    /// Render retrieved chunks as a source-tagged context block
    pub fn format_chunks_for_prompt(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "[Source {}: {} | Page {} | Type: {}]\n{}",
                    i + 1,
                    chunk.metadata.source_file,
                    chunk.metadata.page_number,
                    chunk.metadata.doc_type,
                    chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    }
}
