//! # arpdf
//!
//! Arabic/English PDF text extraction with a smart OCR fallback.
//!
//! Pages with a usable text layer are read directly; pages that look scanned,
//! sparse or garbled are rendered and sent to an OCR engine. All text goes
//! through an Arabic-aware normalizer and results are written as JSON.
//!
//! ## Quick Start
//!
//! ```no_run
//! use arpdf::{extract_file, ExtractConfig};
//!
//! fn main() -> arpdf::Result<()> {
//!     let doc = extract_file("document.pdf", &ExtractConfig::default())?;
//!     println!("{}", doc.text);
//!     println!("{}", doc.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Smart strategy**: per-page choice between embedded text and OCR
//! - **OCR backends**: PaddleOCR, Tesseract, EasyOCR, TrOCR
//! - **Arabic normalization**: alef/yeh/taa forms, diacritics, tatweel, digits
//! - **JSON output**: simple `{filename, text}` or structured with analysis
//! - **Batch processing**: directory trees processed in parallel with Rayon

pub mod analysis;
pub mod batch;
pub mod compare;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod strategy;

// Re-export commonly used types
pub use analysis::{DocumentAnalysis, DocumentAnalyzer, DocumentType};
pub use batch::{find_pdfs, BatchReport, BatchRunner, FileOutcome};
pub use compare::{compare_backends, ComparisonReport, ComparisonSummary};
pub use config::{DetectionThresholds, ExtractConfig, PageSelection, StrategyMode};
pub use detect::{
    classify_document, classify_file, detect_format_from_bytes, detect_format_from_path, is_pdf,
    PdfFormat, PdfKind,
};
pub use error::{Error, Result};
pub use model::{DocumentInfo, DocumentResult, ExtractionMethod, Page, PageImage, PageResult};
pub use normalize::{DigitStyle, NormalizeOptions, NormalizePreset, TextNormalizer, WhitespaceMode};
pub use ocr::{Language, OcrBackend, OcrBackendType, OcrConfig, OcrError};
pub use output::{JsonFormat, OutputMode, ResultWriter};
pub use pdf::{PageRenderer, PdfLoader, PdfSource, PdftoppmRenderer};
pub use pipeline::Extractor;
pub use strategy::{ExtractionStrategy, OcrReason, PageDecision};

use std::path::Path;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract a PDF file with the given configuration.
///
/// # Example
///
/// ```no_run
/// use arpdf::{extract_file, ExtractConfig, StrategyMode};
///
/// let config = ExtractConfig::default().with_strategy(StrategyMode::Direct);
/// let doc = extract_file("document.pdf", &config).unwrap();
/// assert_eq!(doc.ocr_pages(), 0);
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P, config: &ExtractConfig) -> Result<DocumentResult> {
    Extractor::new(config.clone())?.extract_file(path)
}

/// Extract only the embedded text layer of a PDF, normalized with the
/// standard preset. Never runs OCR.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let config = ExtractConfig::default().with_strategy(StrategyMode::Direct);
    Ok(extract_file(path, &config)?.text)
}

/// Extract a PDF and render it as JSON in the configured output mode.
pub fn to_json<P: AsRef<Path>>(path: P, config: &ExtractConfig) -> Result<String> {
    let doc = extract_file(path, config)?;
    let normalizer = TextNormalizer::new(config.normalize);
    let writer = ResultWriter::new(".", config.output_mode, config.json_format, &normalizer)?;
    writer.render(&doc)
}
