//! Document chunking: extraction, OCR fallback, classification, splitting

use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::types::{file_basename, Chunk, ChunkMetadata, FileType, PageRecord};

use super::classifier::{Classification, DocumentClassifier};
use super::ocr::OcrEngine;
use super::parser::{DocumentExtractor, ExtractionOutcome};
use super::splitter::RecursiveTextSplitter;

/// Turns one file into metadata-tagged chunks
pub struct DocumentChunker {
    extractor: Arc<dyn DocumentExtractor>,
    ocr: Option<Arc<dyn OcrEngine>>,
    classifier: Arc<DocumentClassifier>,
    splitter: RecursiveTextSplitter,
    min_chunk_chars: usize,
    preview_chars: usize,
}

impl DocumentChunker {
    /// Create a chunker; without `ocr`, scanned documents produce no chunks
    pub fn new(
        config: &RagConfig,
        extractor: Arc<dyn DocumentExtractor>,
        ocr: Option<Arc<dyn OcrEngine>>,
        classifier: Arc<DocumentClassifier>,
    ) -> Self {
        Self {
            extractor,
            ocr,
            classifier,
            splitter: RecursiveTextSplitter::from_config(&config.chunking),
            min_chunk_chars: config.chunking.min_chunk_chars,
            preview_chars: config.classifier.preview_chars,
        }
    }

    /// Chunk a file
    ///
    /// Never fails: unsupported formats and extraction errors are logged and
    /// yield no chunks.
    pub async fn chunk(&self, path: &Path, subject: &str) -> Vec<Chunk> {
        let source_file = file_basename(path);
        let file_path = path.to_string_lossy().to_string();

        let mut pages = match self.load_pages(path).await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!("{}: extraction failed: {}", source_file, e);
                return Vec::new();
            }
        };

        pages.retain(PageRecord::has_text);
        if pages.is_empty() {
            tracing::warn!("No text could be extracted from {}", source_file);
            return Vec::new();
        }
        pages.sort_by_key(|p| p.page_number);

        let preview: String = pages[0].text.chars().take(self.preview_chars).collect();
        let doc_type = self.classifier.classify(&file_path, &preview).await;

        let mut chunks = Vec::new();
        for page in &pages {
            for (index, piece) in self.splitter.split_text(&page.text).into_iter().enumerate() {
                let content = piece.trim();
                if content.chars().count() < self.min_chunk_chars {
                    continue;
                }

                let metadata = ChunkMetadata {
                    source_file: source_file.clone(),
                    doc_type,
                    subject: subject.to_string(),
                    page_number: page.page_number,
                    file_path: file_path.clone(),
                };
                chunks.push(Chunk::new(content.to_string(), metadata, index));
            }
        }

        tracing::info!(
            "{} -> {} chunks from {} pages (type: {})",
            source_file,
            chunks.len(),
            pages.len(),
            doc_type
        );
        chunks
    }

    /// Classify a file from its name and the start of its first page
    ///
    /// Extraction errors are logged and leave an empty preview, so the
    /// filename alone decides.
    pub async fn classify_file(&self, path: &Path) -> Classification {
        let preview = match self.load_pages(path).await {
            Ok(mut pages) => {
                pages.retain(PageRecord::has_text);
                pages.sort_by_key(|p| p.page_number);
                pages
                    .first()
                    .map(|p| p.text.chars().take(self.preview_chars).collect())
                    .unwrap_or_default()
            }
            Err(e) => {
                tracing::warn!("{}: extraction failed, classifying by name: {}", file_basename(path), e);
                String::new()
            }
        };

        self.classifier
            .classify_detailed(&path.to_string_lossy(), &preview)
            .await
    }

    /// Extract page text, falling back to OCR when there is no text layer
    pub async fn load_pages(&self, path: &Path) -> Result<Vec<PageRecord>> {
        let file_type = FileType::from_path(path);
        if !file_type.is_supported() {
            tracing::warn!("Unsupported file type: {}", file_basename(path));
            return Ok(Vec::new());
        }

        tracing::debug!("Extracting {} as {}", file_basename(path), file_type.display_name());
        let extractor = self.extractor.clone();
        let owned = path.to_path_buf();
        let outcome =
            tokio::task::spawn_blocking(move || extractor.extract(&owned, file_type)).await??;

        let total_pages = match outcome {
            ExtractionOutcome::Text(pages) => return Ok(pages),
            ExtractionOutcome::NeedsOcr { total_pages } => total_pages,
        };

        let Some(ocr) = self.ocr.clone() else {
            tracing::warn!("{}: no text layer and OCR is disabled", file_basename(path));
            return Ok(Vec::new());
        };

        tracing::info!(
            "{}: no text layer, running OCR on {} page(s)",
            file_basename(path),
            total_pages
        );

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            if !file_type.requires_ocr() {
                return ocr.scanned_pdf_to_text(&owned);
            }
            let text = ocr.image_to_text(&owned)?;
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![PageRecord::new(text.trim(), 1, file_basename(&owned), 1)])
        })
        .await?
    }
}
