//! Document-level extraction results.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

use crate::config::StrategyMode;
use crate::ocr::OcrBackendType;
use crate::strategy::OcrReason;

/// Separator placed between page texts in the concatenated document text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Information read from the PDF's document info dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentInfo {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub creation_date: Option<DateTime<Utc>>,

    /// Last modification date
    pub modification_date: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: u32,

    /// Whether the document is encrypted
    pub encrypted: bool,
}

impl DocumentInfo {
    /// Create new info with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// How a page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Text taken from the PDF's own text layer.
    Embedded,
    /// Page rendered and recognized by an OCR engine.
    Ocr(OcrBackendType),
    /// Nothing could be extracted.
    None,
}

impl ExtractionMethod {
    /// Short label used in output and logs.
    pub fn label(&self) -> String {
        match self {
            ExtractionMethod::Embedded => "embedded".to_string(),
            ExtractionMethod::Ocr(backend) => backend.as_str().to_string(),
            ExtractionMethod::None => "none".to_string(),
        }
    }

    /// Whether an OCR engine produced the text.
    pub fn is_ocr(&self) -> bool {
        matches!(self, ExtractionMethod::Ocr(_))
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for ExtractionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Extraction outcome for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// Page number (1-indexed)
    pub number: u32,

    /// Normalized text (empty when the page failed)
    pub text: String,

    /// Method that produced `text`
    pub method: ExtractionMethod,

    /// Recognition confidence in 0.0..=1.0; 1.0 for embedded text
    pub confidence: Option<f32>,

    /// Whether the strategy routed this page to OCR
    pub needs_ocr: bool,

    /// Why the strategy routed this page to OCR
    pub reason: Option<OcrReason>,

    /// Text layer as found in the PDF, before normalization
    #[serde(skip)]
    pub raw_text: String,

    /// Error message if extraction failed or fell back
    pub error: Option<String>,
}

impl PageResult {
    /// A page whose embedded text was accepted.
    pub fn embedded(number: u32, text: String, raw_text: String) -> Self {
        Self {
            number,
            text,
            method: ExtractionMethod::Embedded,
            confidence: Some(1.0),
            needs_ocr: false,
            reason: None,
            raw_text,
            error: None,
        }
    }

    /// A page recognized by an OCR backend.
    pub fn ocr(
        number: u32,
        text: String,
        backend: OcrBackendType,
        confidence: Option<f32>,
        raw_text: String,
    ) -> Self {
        Self {
            number,
            text,
            method: ExtractionMethod::Ocr(backend),
            confidence,
            needs_ocr: true,
            reason: None,
            raw_text,
            error: None,
        }
    }

    /// A page for which no text could be produced.
    pub fn failed(number: u32, error: impl Into<String>, raw_text: String) -> Self {
        Self {
            number,
            text: String::new(),
            method: ExtractionMethod::None,
            confidence: None,
            needs_ocr: false,
            reason: None,
            raw_text,
            error: Some(error.into()),
        }
    }

    /// Record the strategy's OCR decision.
    pub fn with_decision(mut self, needs_ocr: bool, reason: Option<OcrReason>) -> Self {
        self.needs_ocr = needs_ocr;
        self.reason = reason;
        self
    }

    /// Attach an error message without discarding the text.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether the page produced any text.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Whether the page failed: no text and an error recorded.
    pub fn is_failed(&self) -> bool {
        !self.has_content() && self.error.is_some()
    }

    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Character count.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Processing details for a document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingInfo {
    /// Strategy mode used
    pub strategy: StrategyMode,

    /// OCR backend configured for the run, if any
    pub backend: Option<OcrBackendType>,

    /// Wall-clock processing time in milliseconds
    pub processing_time_ms: u64,

    /// When extraction finished
    pub extracted_at: DateTime<Utc>,
}

/// Extraction outcome for a whole document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    /// File name without directories
    pub filename: String,

    /// Path the document was read from
    pub path: PathBuf,

    /// File size in bytes (0 for in-memory sources)
    pub file_size: u64,

    /// Non-empty page texts joined by [`PAGE_SEPARATOR`]
    pub text: String,

    /// Per-page breakdown, in page order
    pub pages: Vec<PageResult>,

    /// Document info dictionary
    pub info: DocumentInfo,

    /// Processing details
    pub processing: ProcessingInfo,
}

impl DocumentResult {
    /// Build a result from per-page outcomes, concatenating their text in order.
    pub fn new(
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
        pages: Vec<PageResult>,
        info: DocumentInfo,
        processing: ProcessingInfo,
    ) -> Self {
        let text = join_page_texts(&pages);
        Self {
            filename: filename.into(),
            path: path.into(),
            file_size: 0,
            text,
            pages,
            info,
            processing,
        }
    }

    /// Set the source file size.
    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    /// Number of pages processed.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages whose text came from the text layer.
    pub fn embedded_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.method == ExtractionMethod::Embedded)
            .count()
    }

    /// Pages whose text came from OCR.
    pub fn ocr_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.method.is_ocr()).count()
    }

    /// Pages that produced no text and recorded an error.
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }

    /// Pages with any text.
    pub fn non_empty_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.has_content()).count()
    }

    /// Every page-level error, including fallbacks that kept some text.
    pub fn errors(&self) -> Vec<PageError> {
        self.pages
            .iter()
            .filter_map(|p| {
                p.error.as_ref().map(|e| PageError {
                    page: p.number,
                    error: e.clone(),
                })
            })
            .collect()
    }

    /// Human-readable processing summary.
    pub fn summary(&self) -> String {
        format!(
            "{} embedded, {} OCR, {} failed",
            self.embedded_pages(),
            self.ocr_pages(),
            self.failed_pages()
        )
    }

    /// Whitespace-separated word count of the full text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Character count of the full text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A page-level failure surfaced in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageError {
    /// Page number (1-indexed)
    pub page: u32,
    /// Error message
    pub error: String,
}

fn join_page_texts(pages: &[PageResult]) -> String {
    pages
        .iter()
        .filter(|p| p.has_content())
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processing() -> ProcessingInfo {
        ProcessingInfo {
            strategy: StrategyMode::Smart,
            backend: Some(OcrBackendType::Tesseract),
            processing_time_ms: 12,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_document_text_skips_empty_pages() {
        let pages = vec![
            PageResult::embedded(1, "first".into(), "first".into()),
            PageResult::failed(2, "render failed", String::new()),
            PageResult::ocr(3, "third".into(), OcrBackendType::Tesseract, Some(0.9), String::new()),
        ];
        let doc = DocumentResult::new("x.pdf", "x.pdf", pages, DocumentInfo::default(), processing());

        assert_eq!(doc.text, "first\n\nthird");
        assert_eq!(doc.embedded_pages(), 1);
        assert_eq!(doc.ocr_pages(), 1);
        assert_eq!(doc.failed_pages(), 1);
        assert_eq!(doc.summary(), "1 embedded, 1 OCR, 1 failed");
    }

    #[test]
    fn test_errors_include_fallbacks() {
        let pages = vec![PageResult::embedded(1, "kept".into(), "kept".into())
            .with_decision(true, Some(OcrReason::TooFewChars))
            .with_error("tesseract not found")];
        let doc = DocumentResult::new("x.pdf", "x.pdf", pages, DocumentInfo::default(), processing());

        assert_eq!(doc.failed_pages(), 0);
        assert_eq!(
            doc.errors(),
            vec![PageError {
                page: 1,
                error: "tesseract not found".into()
            }]
        );
    }

    #[test]
    fn test_method_serializes_as_label() {
        let json = serde_json::to_string(&ExtractionMethod::Ocr(OcrBackendType::PaddleOcr)).unwrap();
        assert_eq!(json, "\"paddleocr\"");
        let json = serde_json::to_string(&ExtractionMethod::Embedded).unwrap();
        assert_eq!(json, "\"embedded\"");
    }
}
