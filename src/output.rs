//! JSON output.
//!
//! Two shapes are supported:
//!
//! - **simple**: `{"filename": ..., "text": ...}`
//! - **structured**: `{"metadata", "document_info", "content", "analysis"}`
//!
//! [`ResultWriter`] serializes a [`DocumentResult`] in the configured shape
//! and writes it under an output directory, mirroring the input tree in
//! batch mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::{DocumentAnalysis, DocumentAnalyzer};
use crate::config::StrategyMode;
use crate::error::{Error, Result};
use crate::model::{DocumentInfo, DocumentResult, ExtractionMethod, PageError, PageResult};
use crate::normalize::TextNormalizer;
use crate::ocr::OcrBackendType;
use crate::strategy::OcrReason;

/// Characters of raw text kept in each page preview.
const RAW_PREVIEW_CHARS: usize = 500;

/// Output JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `{filename, text}`
    #[default]
    Simple,
    /// `{metadata, document_info, content, analysis}`
    Structured,
}

impl OutputMode {
    /// File name suffix appended to the PDF stem.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            OutputMode::Simple => "_extracted.json",
            OutputMode::Structured => "_structured.json",
        }
    }

    /// Default batch output directory.
    pub fn default_batch_dir(&self) -> &'static str {
        match self {
            OutputMode::Simple => "results",
            OutputMode::Structured => "structured_results",
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(OutputMode::Simple),
            "structured" => Ok(OutputMode::Structured),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// JSON output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Simple output shape.
#[derive(Debug, Serialize)]
pub struct SimpleOutput<'a> {
    pub filename: &'a str,
    pub text: &'a str,
}

impl<'a> From<&'a DocumentResult> for SimpleOutput<'a> {
    fn from(doc: &'a DocumentResult) -> Self {
        Self {
            filename: &doc.filename,
            text: &doc.text,
        }
    }
}

/// Structured output shape.
#[derive(Debug, Serialize)]
pub struct StructuredOutput<'a> {
    pub metadata: MetadataBlock<'a>,
    pub document_info: &'a DocumentInfo,
    pub content: ContentBlock<'a>,
    pub analysis: AnalysisBlock,
}

#[derive(Debug, Serialize)]
pub struct MetadataBlock<'a> {
    pub filename: &'a str,
    pub full_path: String,
    pub file_size: u64,
    pub total_pages: usize,
    pub extraction_date: DateTime<Utc>,
    pub extraction_method: String,
    pub strategy: StrategyMode,
    pub backend: Option<OcrBackendType>,
    pub processing_time_ms: u64,
    pub embedded_pages: usize,
    pub ocr_pages: usize,
    pub failed_pages: usize,
    pub processing_summary: String,
}

#[derive(Debug, Serialize)]
pub struct ContentBlock<'a> {
    pub full_text: &'a str,
    pub pages: Vec<PageBlock<'a>>,
    pub summary: ContentSummary,
}

#[derive(Debug, Serialize)]
pub struct PageBlock<'a> {
    pub page_number: u32,
    pub extraction_method: ExtractionMethod,
    pub needs_ocr_detected: bool,
    pub detection_reason: Option<OcrReason>,
    pub raw_text_preview: String,
    pub text: &'a str,
    pub character_count: usize,
    pub word_count: usize,
    pub confidence: Option<f32>,
    pub has_content: bool,
    pub error: Option<&'a str>,
}

impl<'a> From<&'a PageResult> for PageBlock<'a> {
    fn from(page: &'a PageResult) -> Self {
        Self {
            page_number: page.number,
            extraction_method: page.method,
            needs_ocr_detected: page.needs_ocr,
            detection_reason: page.reason,
            raw_text_preview: page.raw_text.chars().take(RAW_PREVIEW_CHARS).collect(),
            text: &page.text,
            character_count: page.char_count(),
            word_count: page.word_count(),
            confidence: page.confidence,
            has_content: page.has_content(),
            error: page.error.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentSummary {
    pub total_characters: usize,
    pub total_words: usize,
    pub non_empty_pages: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalysisBlock {
    #[serde(flatten)]
    pub document: DocumentAnalysis,
    pub errors: Vec<PageError>,
}

impl<'a> StructuredOutput<'a> {
    /// Build the structured shape from a result and its analysis.
    pub fn new(doc: &'a DocumentResult, analysis: DocumentAnalysis) -> Self {
        let metadata = MetadataBlock {
            filename: &doc.filename,
            full_path: doc.path.display().to_string(),
            file_size: doc.file_size,
            total_pages: doc.page_count(),
            extraction_date: doc.processing.extracted_at,
            extraction_method: extraction_method_label(doc),
            strategy: doc.processing.strategy,
            backend: doc.processing.backend,
            processing_time_ms: doc.processing.processing_time_ms,
            embedded_pages: doc.embedded_pages(),
            ocr_pages: doc.ocr_pages(),
            failed_pages: doc.failed_pages(),
            processing_summary: doc.summary(),
        };

        let content = ContentBlock {
            full_text: &doc.text,
            pages: doc.pages.iter().map(PageBlock::from).collect(),
            summary: ContentSummary {
                total_characters: doc.char_count(),
                total_words: doc.word_count(),
                non_empty_pages: doc.non_empty_pages(),
            },
        };

        Self {
            metadata,
            document_info: &doc.info,
            content,
            analysis: AnalysisBlock {
                document: analysis,
                errors: doc.errors(),
            },
        }
    }
}

/// "embedded", an OCR backend name, "mixed", or "none".
fn extraction_method_label(doc: &DocumentResult) -> String {
    let mut methods = doc
        .pages
        .iter()
        .filter(|p| p.method != ExtractionMethod::None)
        .map(|p| p.method);

    match methods.next() {
        None => ExtractionMethod::None.label(),
        Some(first) if methods.all(|m| m == first) => first.label(),
        Some(_) => "mixed".to_string(),
    }
}

fn serialize<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(json)
}

/// Serializes results and writes them to disk.
pub struct ResultWriter {
    output_dir: PathBuf,
    mode: OutputMode,
    format: JsonFormat,
    analyzer: DocumentAnalyzer,
}

impl ResultWriter {
    /// Create a writer. `normalizer` must be the one that produced the text
    /// so that the analyzer's term lists match it.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        mode: OutputMode,
        format: JsonFormat,
        normalizer: &TextNormalizer,
    ) -> Result<Self> {
        Ok(Self {
            output_dir: output_dir.into(),
            mode,
            format,
            analyzer: DocumentAnalyzer::new(normalizer)?,
        })
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output mode.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Analyze a document's text.
    pub fn analyze(&self, doc: &DocumentResult) -> DocumentAnalysis {
        self.analyzer.analyze(&doc.text)
    }

    /// Serialize a result to a JSON string.
    pub fn render(&self, doc: &DocumentResult) -> Result<String> {
        match self.mode {
            OutputMode::Simple => serialize(&SimpleOutput::from(doc), self.format),
            OutputMode::Structured => {
                serialize(&StructuredOutput::new(doc, self.analyze(doc)), self.format)
            }
        }
    }

    /// Serialize a result to a JSON value.
    pub fn to_value(&self, doc: &DocumentResult) -> Result<serde_json::Value> {
        let value = match self.mode {
            OutputMode::Simple => serde_json::to_value(SimpleOutput::from(doc))?,
            OutputMode::Structured => {
                serde_json::to_value(StructuredOutput::new(doc, self.analyze(doc)))?
            }
        };
        Ok(value)
    }

    /// Where the result for `input` goes.
    ///
    /// With `input_root`, the input's directory relative to that root is
    /// recreated under the output directory. When another PDF next to the
    /// input shares its stem (`a.pdf` and `a.PDF`), the extension is kept in
    /// the name so the two results do not overwrite each other.
    pub fn output_path(&self, input: &Path, input_root: Option<&Path>) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let file_name = match input.extension() {
            Some(ext) if has_stem_sibling(input) => format!(
                "{}_{}{}",
                stem,
                ext.to_string_lossy(),
                self.mode.file_suffix()
            ),
            _ => format!("{}{}", stem, self.mode.file_suffix()),
        };

        let relative_dir = input_root
            .and_then(|root| input.parent()?.strip_prefix(root).ok())
            .unwrap_or_else(|| Path::new(""));

        self.output_dir.join(relative_dir).join(file_name)
    }

    /// Write a result, creating parent directories. Returns the file written.
    pub fn write(&self, doc: &DocumentResult, input_root: Option<&Path>) -> Result<PathBuf> {
        let path = self.output_path(&doc.path, input_root);
        let json = self.render(doc)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Output(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(&path, json)
            .map_err(|e| Error::Output(format!("cannot write {}: {}", path.display(), e)))?;

        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Whether another PDF in the same directory has the same file stem.
fn has_stem_sibling(input: &Path) -> bool {
    let (Some(stem), Some(name)) = (input.file_stem(), input.file_name()) else {
        return false;
    };
    let dir = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        path.file_name() != Some(name)
            && path.file_stem() == Some(stem)
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    })
}
