//! OCR fallback through the tesseract and pdftoppm command-line tools

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};
use crate::types::{file_basename, PageRecord};

use super::parser::pdf_page_texts;

/// Image and scanned-PDF text recognition
///
/// Blocking; call from `spawn_blocking`.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of a single image
    fn image_to_text(&self, path: &Path) -> Result<String>;

    /// Recognize every page of a PDF whose direct text is too short
    fn scanned_pdf_to_text(&self, path: &Path) -> Result<Vec<PageRecord>>;
}

/// OCR engine shelling out to tesseract, with pdftoppm for PDF rasterization
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract_cmd: PathBuf,
    pdftoppm_cmd: PathBuf,
    dpi: u32,
    language: String,
    min_text_chars: usize,
}

impl TesseractOcr {
    /// Create an engine, verifying both binaries can be run
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let engine = Self {
            tesseract_cmd: config.tesseract_cmd.clone(),
            pdftoppm_cmd: config.pdftoppm_cmd.clone(),
            dpi: config.dpi,
            language: config.language.clone(),
            min_text_chars: config.min_text_chars,
        };
        engine.verify()?;
        Ok(engine)
    }

    /// Check that tesseract and pdftoppm start and report a version
    pub fn verify(&self) -> Result<()> {
        probe(&self.tesseract_cmd, "--version")?;
        probe(&self.pdftoppm_cmd, "-v")?;
        Ok(())
    }

    /// Rasterize one PDF page and recognize it
    fn ocr_pdf_page(&self, pdf: &Path, page_number: u32, workdir: &Path) -> Result<String> {
        let prefix = workdir.join(format!("page-{}", page_number));
        let output = Command::new(&self.pdftoppm_cmd)
            .args(pdftoppm_args(page_number, self.dpi))
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| Error::ocr(format!("failed to run {}: {}", self.pdftoppm_cmd.display(), e)))?;

        if !output.status.success() {
            return Err(Error::ocr(format!(
                "pdftoppm failed on page {} of {}: {}",
                page_number,
                file_basename(pdf),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // -singlefile writes exactly <prefix>.png
        self.image_to_text(&prefix.with_extension("png"))
    }
}

impl OcrEngine for TesseractOcr {
    fn image_to_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.tesseract_cmd)
            .arg(path)
            .arg("stdout")
            .args(["-l", self.language.as_str()])
            .output()
            .map_err(|e| Error::ocr(format!("failed to run {}: {}", self.tesseract_cmd.display(), e)))?;

        if !output.status.success() {
            return Err(Error::ocr(format!(
                "tesseract failed on {}: {}",
                file_basename(path),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn scanned_pdf_to_text(&self, path: &Path) -> Result<Vec<PageRecord>> {
        let filename = file_basename(path);
        let pages = pdf_page_texts(path)?;
        let workdir = tempfile::tempdir()?;

        let records = merge_ocr_pages(&filename, pages, self.min_text_chars, |page_number| {
            self.ocr_pdf_page(path, page_number, workdir.path())
        })?;
        Ok(records)
    }
}

/// True when a page's direct text is too short to trust
fn needs_ocr(direct_text: &str, min_text_chars: usize) -> bool {
    direct_text.trim().chars().count() < min_text_chars
}

/// Keep direct text where there is enough of it and OCR the remaining pages
///
/// `ocr_page` is called with the 1-based page number of each low-text page.
/// Pages that stay empty after OCR are dropped.
fn merge_ocr_pages<F>(
    filename: &str,
    pages: Vec<(u32, String)>,
    min_text_chars: usize,
    mut ocr_page: F,
) -> Result<Vec<PageRecord>>
where
    F: FnMut(u32) -> Result<String>,
{
    let total_pages = pages.len() as u32;
    let mut records = Vec::new();

    for (page_number, direct_text) in pages {
        let text = if needs_ocr(&direct_text, min_text_chars) {
            tracing::debug!("{}: OCR page {}/{}", filename, page_number, total_pages);
            ocr_page(page_number)?
        } else {
            direct_text
        };

        let text = text.trim();
        if !text.is_empty() {
            records.push(PageRecord::new(text, page_number, filename, total_pages));
        }
    }

    tracing::info!(
        "{}: text recovered on {}/{} pages",
        filename,
        records.len(),
        total_pages
    );
    Ok(records)
}

fn pdftoppm_args(page_number: u32, dpi: u32) -> Vec<String> {
    vec![
        "-f".to_string(),
        page_number.to_string(),
        "-l".to_string(),
        page_number.to_string(),
        "-r".to_string(),
        dpi.to_string(),
        "-png".to_string(),
        "-singlefile".to_string(),
    ]
}

fn probe(cmd: &Path, version_flag: &str) -> Result<()> {
    match Command::new(cmd).arg(version_flag).output() {
        // pdftoppm -v exits 0 on recent poppler, 99 on older builds
        Ok(_) => Ok(()),
        Err(e) => Err(Error::ocr(format!(
            "cannot run '{}' ({}); install it or set its path in the [ocr] config section",
            cmd.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_text_pdf;

    #[test]
    fn test_missing_binary_is_ocr_error() {
        let config = OcrConfig {
            tesseract_cmd: PathBuf::from("/nonexistent/bin/tesseract"),
            ..OcrConfig::default()
        };
        let err = TesseractOcr::new(&config).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
        assert!(err.to_string().contains("/nonexistent/bin/tesseract"));
    }

    #[test]
    fn test_ocr_threshold_boundary() {
        assert!(needs_ocr(&"x".repeat(19), 20));
        assert!(!needs_ocr(&"x".repeat(20), 20));
        assert!(!needs_ocr(&"x".repeat(21), 20));
        assert!(needs_ocr(&format!("  {}\n", "x".repeat(19)), 20));
        assert!(needs_ocr("", 20));
    }

    #[test]
    fn test_only_low_text_pages_are_ocred() {
        let direct = "Normalization organizes relations to reduce redundancy.";
        let pages = vec![
            (1, String::new()),
            (2, direct.to_string()),
            (3, "Fig. 3".to_string()),
            (4, String::new()),
        ];

        let mut ocred = Vec::new();
        let records = merge_ocr_pages("dbms.pdf", pages, 20, |page| {
            ocred.push(page);
            Ok(match page {
                1 => "Unit 2: Functional dependencies and closures".to_string(),
                3 => "Fig. 3 shows a lossless join decomposition".to_string(),
                _ => "   ".to_string(),
            })
        })
        .unwrap();

        assert_eq!(ocred, vec![1, 3, 4]);
        let numbers: Vec<u32> = records.iter().map(|r| r.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(records[1].text, direct);
        assert!(records.iter().all(|r| r.total_pages == 4 && r.source_file == "dbms.pdf"));
    }

    #[test]
    fn test_page_selection_on_real_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.pdf");
        write_text_pdf(&path, &["", "Indexes speed up lookups on large relations.", "p. 3"]);

        let pages = pdf_page_texts(&path).unwrap();
        let mut ocred = Vec::new();
        let records = merge_ocr_pages("mixed.pdf", pages, 20, |page| {
            ocred.push(page);
            Ok(String::new())
        })
        .unwrap();

        assert_eq!(ocred, vec![1, 3]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page_number, 2);
        assert!(records[0].text.contains("Indexes speed up lookups"));
    }

    #[test]
    fn test_ocr_failure_propagates() {
        let pages = vec![(1, String::new())];
        let err = merge_ocr_pages("scan.pdf", pages, 20, |_| Err(Error::ocr("tesseract crashed"))).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }

    #[test]
    fn test_pdftoppm_renders_single_page() {
        assert_eq!(
            pdftoppm_args(7, 300),
            ["-f", "7", "-l", "7", "-r", "300", "-png", "-singlefile"]
        );
    }
}
