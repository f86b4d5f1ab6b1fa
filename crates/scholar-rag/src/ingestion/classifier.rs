//! Document type classification
//!
//! Two tiers: keyword scoring over the filename and a text preview, then a
//! single language-model call when no label scores high enough. The
//! classifier never fails; anything it cannot decide becomes `notes`.

use std::path::Path;
use std::sync::Arc;

use crate::config::ClassifierConfig;
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{file_basename, DocType};

/// Keywords per label, in `DocType` order
///
/// Scores are compared with `>`, so a tie keeps the label listed first.
const KEYWORDS: [(DocType, &[&str]); 5] = [
    (
        DocType::Pyq,
        &[
            "question paper",
            "previous year",
            "exam paper",
            "2022",
            "2023",
            "2024",
            "q1",
            "q2",
            "q3",
            "marks",
            "answer all",
        ],
    ),
    (
        DocType::Syllabus,
        &[
            "syllabus",
            "curriculum",
            "course outline",
            "unit 1",
            "module 1",
            "credit hours",
            "course objectives",
        ],
    ),
    (
        DocType::LabManual,
        &[
            "lab manual",
            "experiment",
            "aim",
            "apparatus",
            "procedure",
            "observation",
            "result",
            "viva",
        ],
    ),
    (
        DocType::Textbook,
        &[
            "chapter",
            "definition",
            "theorem",
            "introduction",
            "bibliography",
            "index",
            "references",
        ],
    ),
    (
        DocType::Notes,
        &["notes", "lecture", "class notes", "summary", "topic", "unit"],
    ),
];

/// How a label was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMethod {
    /// Keyword score met the threshold
    RuleBased { score: usize },
    /// The language model returned a valid label
    Model,
    /// No usable signal; defaulted to `notes`
    Fallback,
}

/// A label together with the path that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub doc_type: DocType,
    pub method: ClassificationMethod,
}

/// Two-tier document classifier
pub struct DocumentClassifier {
    llm: Option<Arc<dyn LlmProvider>>,
    rule_threshold: usize,
    llm_preview_chars: usize,
}

impl DocumentClassifier {
    /// Create a classifier; `llm` is consulted only for low-signal documents
    pub fn new(config: &ClassifierConfig, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let llm = if config.use_llm_fallback { llm } else { None };
        Self {
            llm,
            rule_threshold: config.rule_threshold,
            llm_preview_chars: config.llm_preview_chars,
        }
    }

    /// Best keyword label and its hit count
    pub fn rule_based(file_identifier: &str, preview: &str) -> (DocType, usize) {
        let filename = file_basename(Path::new(file_identifier)).to_lowercase();
        let haystack = format!("{} {}", filename, preview.to_lowercase());

        let mut best = (KEYWORDS[0].0, 0usize);
        for (doc_type, keywords) in KEYWORDS {
            let score = keywords.iter().filter(|kw| haystack.contains(*kw)).count();
            if score > best.1 {
                best = (doc_type, score);
            }
        }
        best
    }

    /// Classify a document
    pub async fn classify(&self, file_identifier: &str, preview: &str) -> DocType {
        self.classify_detailed(file_identifier, preview).await.doc_type
    }

    /// Classify a document and report which tier decided
    pub async fn classify_detailed(&self, file_identifier: &str, preview: &str) -> Classification {
        let (doc_type, score) = Self::rule_based(file_identifier, preview);
        if score >= self.rule_threshold {
            tracing::debug!("{}: {} by keywords (score {})", file_identifier, doc_type, score);
            return Classification {
                doc_type,
                method: ClassificationMethod::RuleBased { score },
            };
        }

        let Some(llm) = &self.llm else {
            return Self::fallback();
        };

        let filename = file_basename(Path::new(file_identifier));
        let prompt = PromptBuilder::build_classification_prompt(&filename, preview, self.llm_preview_chars);

        match llm.complete(&prompt).await {
            Ok(reply) => match DocType::from_label(&reply.trim().to_lowercase()) {
                Some(doc_type) => {
                    tracing::debug!("{}: {} by {} ({})", filename, doc_type, llm.name(), llm.model());
                    Classification {
                        doc_type,
                        method: ClassificationMethod::Model,
                    }
                }
                None => {
                    tracing::warn!("{}: model replied with unknown label {:?}, using notes", filename, reply.trim());
                    Self::fallback()
                }
            },
            Err(e) => {
                tracing::warn!("{}: classification call failed, using notes: {}", filename, e);
                Self::fallback()
            }
        }
    }

    fn fallback() -> Classification {
        Classification {
            doc_type: DocType::Notes,
            method: ClassificationMethod::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlm;

    fn classifier(llm: &Arc<MockLlm>) -> DocumentClassifier {
        DocumentClassifier::new(&ClassifierConfig::default(), Some(llm.clone() as Arc<dyn LlmProvider>))
    }

    #[tokio::test]
    async fn test_keywords_decide_without_model() {
        let llm = Arc::new(MockLlm::replying("syllabus"));
        let result = classifier(&llm)
            .classify_detailed("2023_question_paper.pdf", "Q1 marks Q2 marks")
            .await;

        assert_eq!(result.doc_type, DocType::Pyq);
        assert!(matches!(result.method, ClassificationMethod::RuleBased { score } if score >= 2));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_signal_calls_model() {
        let llm = Arc::new(MockLlm::replying("  Lab_Manual\n"));
        let result = classifier(&llm).classify_detailed("scan_0042.pdf", "xyz").await;

        assert_eq!(result.doc_type, DocType::LabManual);
        assert_eq!(result.method, ClassificationMethod::Model);
        assert_eq!(llm.calls(), 1);
        assert!(llm.last_prompt().contains("Filename: scan_0042.pdf"));
    }

    #[tokio::test]
    async fn test_invalid_reply_defaults_to_notes() {
        let llm = Arc::new(MockLlm::replying("maybe"));
        let result = classifier(&llm).classify_detailed("scan_0042.pdf", "xyz").await;

        assert_eq!(result.doc_type, DocType::Notes);
        assert_eq!(result.method, ClassificationMethod::Fallback);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_error_defaults_to_notes() {
        let llm = Arc::new(MockLlm::failing());
        assert_eq!(classifier(&llm).classify("scan.pdf", "").await, DocType::Notes);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_without_model_defaults_to_notes() {
        let classifier = DocumentClassifier::new(&ClassifierConfig::default(), None);
        let result = classifier.classify_detailed("scan.pdf", "xyz").await;
        assert_eq!(result.doc_type, DocType::Notes);
        assert_eq!(result.method, ClassificationMethod::Fallback);
    }

    #[test]
    fn test_tie_goes_to_earlier_label() {
        // one pyq hit ("marks") and one syllabus hit ("syllabus")
        let (doc_type, score) = DocumentClassifier::rule_based("x.pdf", "syllabus marks");
        assert_eq!((doc_type, score), (DocType::Pyq, 1));

        let (doc_type, score) = DocumentClassifier::rule_based("x.pdf", "");
        assert_eq!((doc_type, score), (DocType::Pyq, 0));
    }

    #[test]
    fn test_only_basename_is_scored() {
        let (_, with_dir) = DocumentClassifier::rule_based("/home/u/lecture_notes/x.pdf", "");
        assert_eq!(with_dir, 0);

        let (doc_type, score) = DocumentClassifier::rule_based("OS_Lab_Manual.pdf", "Aim: to study the procedure");
        assert_eq!(doc_type, DocType::LabManual);
        assert_eq!(score, 2);
    }
}
