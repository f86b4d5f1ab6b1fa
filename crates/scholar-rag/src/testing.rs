//! Test doubles and document fixtures

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::ingestion::{DocumentExtractor, ExtractionOutcome, OcrEngine};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::types::{Chunk, FileType, MetadataFilter, PageRecord, RetrievalResult};

/// Bag-of-words embedder: each token bumps one hashed dimension
pub struct HashEmbedder {
    fail: bool,
}

impl HashEmbedder {
    pub const DIMENSIONS: usize = 256;

    pub fn new() -> Self {
        Self { fail: false }
    }

    /// An embedder whose every call fails, as if the server were down
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("connection refused"));
        }

        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % Self::DIMENSIONS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn model(&self) -> &str {
        "hash-bow"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Language model with a canned reply that records its prompts
pub struct MockLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::llm("request timed out"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-1"
    }
}

/// Extractor returning a fixed outcome for every file
pub struct FakeExtractor {
    outcome: Option<ExtractionOutcome>,
}

impl FakeExtractor {
    pub fn pages(pages: Vec<PageRecord>) -> Self {
        Self {
            outcome: Some(ExtractionOutcome::Text(pages)),
        }
    }

    pub fn needs_ocr(total_pages: u32) -> Self {
        Self {
            outcome: Some(ExtractionOutcome::NeedsOcr { total_pages }),
        }
    }

    pub fn failing() -> Self {
        Self { outcome: None }
    }
}

impl DocumentExtractor for FakeExtractor {
    fn extract(&self, path: &Path, _file_type: FileType) -> Result<ExtractionOutcome> {
        self.outcome
            .clone()
            .ok_or_else(|| Error::file_parse(path.to_string_lossy(), "xref table is damaged"))
    }
}

/// OCR engine with canned output
pub struct FakeOcr {
    pdf_pages: Vec<PageRecord>,
    image_text: String,
    pdf_calls: AtomicUsize,
}

impl FakeOcr {
    pub fn new(pdf_pages: Vec<PageRecord>, image_text: &str) -> Self {
        Self {
            pdf_pages,
            image_text: image_text.to_string(),
            pdf_calls: AtomicUsize::new(0),
        }
    }

    pub fn pdf_calls(&self) -> usize {
        self.pdf_calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for FakeOcr {
    fn image_to_text(&self, _path: &Path) -> Result<String> {
        Ok(self.image_text.clone())
    }

    fn scanned_pdf_to_text(&self, _path: &Path) -> Result<Vec<PageRecord>> {
        self.pdf_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pdf_pages.clone())
    }
}

/// Vector store that records batch sizes and deletions instead of storing
#[derive(Default)]
pub struct RecordingStore {
    batches: Mutex<Vec<usize>>,
    deleted: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().clone()
    }

    pub fn deleted_files(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl VectorStoreProvider for RecordingStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if self.fail {
            return Err(Error::vector_db("database is locked"));
        }
        self.batches.lock().push(chunks.len());
        Ok(())
    }

    async fn similarity_search_with_scores(
        &self,
        _query: &str,
        _k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        Ok(Vec::new())
    }

    async fn delete_file(&self, file_path: &str) -> Result<usize> {
        if self.fail {
            return Err(Error::vector_db("database is locked"));
        }
        self.deleted.lock().push(file_path.to_string());
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        self.batches.lock().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.batches.lock().iter().sum())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Write a DOCX with one paragraph per entry
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    let mut docx = docx_rs::Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
        );
    }
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

/// Write a PPTX-shaped archive with one text box per slide
pub fn write_pptx(path: &Path, slides: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    for (i, text) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            text
        )
        .unwrap();

        zip.start_file(format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), options).unwrap();
        zip.write_all(b"<Relationships/>").unwrap();
    }
    zip.finish().unwrap();
}

/// Write a PDF whose pages have empty content streams
pub fn write_blank_pdf(path: &Path, pages: usize) {
    write_text_pdf(path, &vec![""; pages]);
}

/// Write a PDF with one line of Helvetica text per page; empty entries give blank pages
pub fn write_text_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
