//! Multi-format text extraction (PDF, DOCX, PPTX)

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{file_basename, FileType, PageRecord};

/// Result of direct text extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Pages that carry text, in document order
    Text(Vec<PageRecord>),
    /// The document has pages but none yielded text; route it through OCR
    NeedsOcr { total_pages: u32 },
}

impl ExtractionOutcome {
    /// Pages, or nothing when OCR is required
    pub fn into_pages(self) -> Vec<PageRecord> {
        match self {
            Self::Text(pages) => pages,
            Self::NeedsOcr { .. } => Vec::new(),
        }
    }
}

/// Pulls page text out of a file on disk
///
/// Called from blocking contexts; implementations may do file IO directly.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path, file_type: FileType) -> Result<ExtractionOutcome>;
}

/// Multi-format file parser
#[derive(Debug, Default, Clone, Copy)]
pub struct FileParser;

impl DocumentExtractor for FileParser {
    fn extract(&self, path: &Path, file_type: FileType) -> Result<ExtractionOutcome> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(path),
            FileType::Docx => Self::parse_docx(path).map(ExtractionOutcome::Text),
            FileType::Pptx => Self::parse_pptx(path).map(ExtractionOutcome::Text),
            FileType::Image => Ok(ExtractionOutcome::NeedsOcr { total_pages: 1 }),
            FileType::Unknown => Err(Error::UnsupportedFileType(file_basename(path))),
        }
    }
}

impl FileParser {
    /// Extract text from every page of a PDF
    fn parse_pdf(path: &Path) -> Result<ExtractionOutcome> {
        let filename = file_basename(path);
        let pages = pdf_page_texts(path)?;
        let total_pages = pages.len() as u32;

        let records: Vec<PageRecord> = pages
            .into_iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(page_number, text)| PageRecord::new(text, page_number, filename.as_str(), total_pages))
            .collect();

        if records.is_empty() {
            tracing::debug!("{}: no extractable text on {} pages", filename, total_pages);
            return Ok(ExtractionOutcome::NeedsOcr { total_pages });
        }

        Ok(ExtractionOutcome::Text(records))
    }

    /// Parse DOCX document into one logical page
    fn parse_docx(path: &Path) -> Result<Vec<PageRecord>> {
        let filename = file_basename(path);
        let data = std::fs::read(path)?;
        let doc = docx_rs::read_docx(&data)
            .map_err(|e| Error::file_parse(filename.as_str(), e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                let text = text.trim();
                if !text.is_empty() {
                    paragraphs.push(text.to_string());
                }
            }
        }

        if paragraphs.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![PageRecord::new(paragraphs.join("\n"), 1, filename, 1)])
    }

    /// Parse PowerPoint presentation (.pptx) into one logical page
    fn parse_pptx(path: &Path) -> Result<Vec<PageRecord>> {
        let filename = file_basename(path);
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| Error::file_parse(filename.as_str(), e.to_string()))?;

        // ppt/slides/slide{N}.xml, ordered by N rather than by name
        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        slide_names.sort();

        let mut slides = Vec::new();
        for (number, name) in slide_names {
            let mut xml = String::new();
            archive
                .by_name(&name)
                .map_err(|e| Error::file_parse(filename.as_str(), e.to_string()))?
                .read_to_string(&mut xml)?;

            let text = extract_slide_text(&xml);
            if text.is_empty() {
                tracing::debug!("{}: slide {} has no text", filename, number);
            } else {
                slides.push(text);
            }
        }

        if slides.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![PageRecord::new(slides.join("\n\n"), 1, filename, 1)])
    }
}

/// Directly extracted text per PDF page, as `(page_number, trimmed_text)`
///
/// Pages whose content stream cannot be decoded come back empty.
pub(crate) fn pdf_page_texts(path: &Path) -> Result<Vec<(u32, String)>> {
    let filename = file_basename(path);
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::file_parse(filename.as_str(), format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().into_keys() {
        let text = match doc.extract_text(&[page_number]) {
            Ok(text) => text.replace('\0', "").trim().to_string(),
            Err(e) => {
                tracing::debug!("{}: could not extract page {}: {}", filename, page_number, e);
                String::new()
            }
        };
        pages.push((page_number, text));
    }

    Ok(pages)
}

/// Text of every shape on a slide, one shape per line
fn extract_slide_text(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);

    let mut shapes: Vec<String> = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut shape_depth = 0usize;
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => shape_depth += 1,
                b"t" => in_text_element = shape_depth > 0,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"br" && shape_depth > 0 {
                    paragraph.push('\n');
                }
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Ok(text) = e.unescape() {
                        paragraph.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" if shape_depth > 0 => paragraphs.push(std::mem::take(&mut paragraph)),
                b"sp" => {
                    shape_depth = shape_depth.saturating_sub(1);
                    let text = paragraphs.join("\n");
                    paragraphs.clear();
                    let text = text.trim();
                    if !text.is_empty() {
                        shapes.push(text.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Malformed slide XML: {}", e);
                break;
            }
            _ => {}
        }
    }

    shapes.join("\n")
}
