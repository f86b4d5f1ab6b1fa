//! Page, chunk and label types with source tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document (digital or scanned)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Image (for OCR) - requires tesseract
    Image,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::from_extension(&ext.to_string_lossy()))
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Check if this format can only be read through OCR
    pub fn requires_ocr(&self) -> bool {
        matches!(self, Self::Image)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Image => "Image",
            Self::Unknown => "Unknown",
        }
    }
}

/// Coarse document category used to filter retrieval
///
/// Variant order is significant: rule-based classification breaks score
/// ties in favour of the earlier variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Previous-year question paper
    Pyq,
    /// Course syllabus or curriculum
    Syllabus,
    /// Laboratory manual
    LabManual,
    /// Textbook or reference book
    Textbook,
    /// Lecture or class notes (the default label)
    #[default]
    Notes,
}

impl DocType {
    /// All labels in enumeration order
    pub const ALL: [DocType; 5] = [
        DocType::Pyq,
        DocType::Syllabus,
        DocType::LabManual,
        DocType::Textbook,
        DocType::Notes,
    ];

    /// Wire label, as stored in chunk metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pyq => "pyq",
            Self::Syllabus => "syllabus",
            Self::LabManual => "lab_manual",
            Self::Textbook => "textbook",
            Self::Notes => "notes",
        }
    }

    /// Parse an exact wire label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(&s.trim().to_lowercase()).ok_or_else(|| {
            crate::error::Error::Config(format!(
                "unknown doc type '{}' (expected one of: {})",
                s,
                Self::ALL.map(|t| t.as_str()).join(", ")
            ))
        })
    }
}

/// Text of one page as produced by an extractor or OCR call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page text
    pub text: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Basename of the file the page came from
    pub source_file: String,
    /// Total pages in the source file
    pub total_pages: u32,
}

impl PageRecord {
    /// Create a page record, clamping page numbers to at least 1
    pub fn new(text: impl Into<String>, page_number: u32, source_file: impl Into<String>, total_pages: u32) -> Self {
        let page_number = page_number.max(1);
        Self {
            text: text.into(),
            page_number,
            source_file: source_file.into(),
            total_pages: total_pages.max(page_number),
        }
    }

    /// Whether the page carries any non-whitespace text
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Basename of the source file
    pub source_file: String,
    /// Detected document type
    pub doc_type: DocType,
    /// Caller-supplied subject tag
    pub subject: String,
    /// Originating page (1-indexed)
    pub page_number: u32,
    /// Full path of the source file as given to the chunker
    pub file_path: String,
}

/// A chunk of text from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk ID (hex SHA-256 of path, page, position and content)
    pub id: String,
    /// Text content
    pub content: String,
    /// Source information for citations and filtering
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk; `index` is the chunk's position within its page
    pub fn new(content: String, metadata: ChunkMetadata, index: usize) -> Self {
        let id = chunk_id(&metadata.file_path, metadata.page_number, index, &content);
        Self { id, content, metadata }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        format!(
            "{}, Page {} ({})",
            self.metadata.source_file, self.metadata.page_number, self.metadata.doc_type
        )
    }
}

/// Basename of a path, falling back to the whole path
pub fn file_basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn chunk_id(file_path: &str, page_number: u32, index: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(page_number.to_le_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
