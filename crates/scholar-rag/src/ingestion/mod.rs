//! Document ingestion: extraction, OCR, classification, chunking and storage

mod chunker;
mod classifier;
mod ocr;
mod parser;
mod processor;
mod splitter;

pub use chunker::DocumentChunker;
pub use classifier::{Classification, ClassificationMethod, DocumentClassifier};
pub use ocr::{OcrEngine, TesseractOcr};
pub use parser::{DocumentExtractor, ExtractionOutcome, FileParser};
pub use processor::{discover_files, FileReport, IngestPipeline, IngestReport};
pub use splitter::{RecursiveTextSplitter, DEFAULT_SEPARATORS};
