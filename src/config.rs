//! Extraction configuration.
//!
//! All tunables (strategy thresholds, OCR engine and languages, normalizer
//! switches, output shape) live in one explicit [`ExtractConfig`] that is
//! passed into the pipeline. Configurations can be built in code with the
//! `with_*` builders or loaded from a JSON file; missing fields take their
//! defaults.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::{Error, Result};
use crate::normalize::{NormalizeOptions, NormalizePreset};
use crate::ocr::{Language, OcrBackendType, OcrConfig};
use crate::output::{JsonFormat, OutputMode};

/// Top-level configuration for an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// How pages are routed between embedded text and OCR
    pub strategy: StrategyMode,

    /// Smart-detection thresholds
    pub thresholds: DetectionThresholds,

    /// OCR engine settings
    pub ocr: OcrConfig,

    /// Text normalization switches
    pub normalize: NormalizeOptions,

    /// Output JSON shape
    pub output_mode: OutputMode,

    /// Pretty or compact JSON
    pub json_format: JsonFormat,

    /// Pages to process
    #[serde(skip)]
    pub pages: PageSelection,

    /// Process batch files on the rayon pool
    pub parallel: bool,
}

impl ExtractConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.ocr.validate()?;
        Ok(())
    }

    /// Set the strategy mode.
    pub fn with_strategy(mut self, mode: StrategyMode) -> Self {
        self.strategy = mode;
        self
    }

    /// Set detection thresholds.
    pub fn with_thresholds(mut self, thresholds: DetectionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the OCR backend.
    pub fn with_backend(mut self, backend: OcrBackendType) -> Self {
        self.ocr.backend = backend;
        self
    }

    /// Set OCR languages.
    pub fn with_languages(mut self, languages: Vec<Language>) -> Self {
        self.ocr.languages = languages;
        self
    }

    /// Set OCR configuration.
    pub fn with_ocr(mut self, ocr: OcrConfig) -> Self {
        self.ocr = ocr;
        self
    }

    /// Set normalization options.
    pub fn with_normalize(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Set normalization preset.
    pub fn with_normalize_preset(mut self, preset: NormalizePreset) -> Self {
        self.normalize = NormalizeOptions::from_preset(preset);
        self
    }

    /// Set output mode.
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Set JSON format.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable parallel batch processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyMode::Smart,
            thresholds: DetectionThresholds::default(),
            ocr: OcrConfig::default(),
            normalize: NormalizeOptions::default(),
            output_mode: OutputMode::Simple,
            json_format: JsonFormat::Pretty,
            pages: PageSelection::All,
            parallel: true,
        }
    }
}

/// How pages are routed between the text layer and OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Decide per page from the embedded text
    #[default]
    Smart,
    /// Always use the embedded text, never OCR
    Direct,
    /// Always OCR every page
    Ocr,
}

impl StrategyMode {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::Smart => "smart",
            StrategyMode::Direct => "direct",
            StrategyMode::Ocr => "ocr",
        }
    }

    /// Whether this mode can ever call an OCR backend.
    pub fn may_ocr(&self) -> bool {
        !matches!(self, StrategyMode::Direct)
    }
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for the smart per-page OCR decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// Minimum trimmed characters for a page to count as text-based
    pub min_chars: usize,

    /// Minimum characters per 10,000 square points of page area
    pub min_density: f32,

    /// Minimum share of recognizable Arabic/Latin/digit/punctuation characters
    pub min_valid_ratio: f32,

    /// Maximum share of extraction artifacts (replacement chars, boxes)
    pub max_artifact_ratio: f32,
}

impl DetectionThresholds {
    /// Set minimum characters.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Set minimum density.
    pub fn with_min_density(mut self, min_density: f32) -> Self {
        self.min_density = min_density;
        self
    }

    /// Set minimum valid-character ratio.
    pub fn with_min_valid_ratio(mut self, ratio: f32) -> Self {
        self.min_valid_ratio = ratio;
        self
    }

    /// Set maximum artifact ratio.
    pub fn with_max_artifact_ratio(mut self, ratio: f32) -> Self {
        self.max_artifact_ratio = ratio;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_valid_ratio", self.min_valid_ratio),
            ("max_artifact_ratio", self.max_artifact_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.min_density < 0.0 {
            return Err(Error::Config(format!(
                "min_density must not be negative, got {}",
                self.min_density
            )));
        }
        Ok(())
    }
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            min_chars: 50,
            min_density: 0.5,
            min_valid_ratio: 0.3,
            max_artifact_ratio: 0.05,
        }
    }
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// Range of pages (1-indexed, inclusive)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Resolve the selection against a document with `page_count` pages.
    pub fn resolve(&self, page_count: u32) -> Vec<u32> {
        (1..=page_count).filter(|p| self.includes(*p)).collect()
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let invalid = |part: &str| Error::InvalidPageRange(part.to_string());

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| invalid(s))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid(s))?;
                if start == 0 || start > end {
                    return Err(invalid(s));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| invalid(part))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid(part))?;
                if start == 0 || start > end {
                    return Err(invalid(part));
                }
                pages.extend(start..=end);
            } else {
                let p: u32 = part.parse().map_err(|_| invalid(part))?;
                if p == 0 {
                    return Err(invalid(part));
                }
                pages.push(p);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractConfig::default();
        assert_eq!(config.strategy, StrategyMode::Smart);
        assert_eq!(config.thresholds.min_chars, 50);
        assert_eq!(config.ocr.backend, OcrBackendType::PaddleOcr);
        assert_eq!(config.output_mode, OutputMode::Simple);
        assert!(config.parallel);
    }

    #[test]
    fn test_config_builder() {
        let config = ExtractConfig::new()
            .with_strategy(StrategyMode::Direct)
            .with_backend(OcrBackendType::Tesseract)
            .with_output_mode(OutputMode::Structured)
            .sequential();

        assert_eq!(config.strategy, StrategyMode::Direct);
        assert!(!config.strategy.may_ocr());
        assert_eq!(config.ocr.backend, OcrBackendType::Tesseract);
        assert_eq!(config.output_mode, OutputMode::Structured);
        assert!(!config.parallel);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{"strategy": "ocr", "thresholds": {"min_chars": 10}, "ocr": {"backend": "tesseract"}}"#;
        let config: ExtractConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.strategy, StrategyMode::Ocr);
        assert_eq!(config.thresholds.min_chars, 10);
        assert_eq!(config.thresholds.min_valid_ratio, 0.3);
        assert_eq!(config.ocr.backend, OcrBackendType::Tesseract);
        assert_eq!(config.ocr.dpi, 200);
    }

    #[test]
    fn test_from_file_rejects_bad_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"thresholds": {"min_valid_ratio": 1.5}}"#).unwrap();

        let result = ExtractConfig::from_file(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_page_selection_includes() {
        let range = PageSelection::Range(5..=10);
        assert!(!range.includes(4));
        assert!(range.includes(5));
        assert!(range.includes(10));
        assert!(!range.includes(11));

        let pages = PageSelection::Pages(vec![1, 3]);
        assert_eq!(pages.resolve(4), vec![1, 3]);
        assert_eq!(PageSelection::All.resolve(3), vec![1, 2, 3]);
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("2-4").unwrap(), PageSelection::Range(2..=4));
        assert_eq!(
            PageSelection::parse("1,3,5-7,3").unwrap(),
            PageSelection::Pages(vec![1, 3, 5, 6, 7])
        );
        assert!(PageSelection::parse("0").is_err());
        assert!(PageSelection::parse("5-2").is_err());
        assert!(PageSelection::parse("x").is_err());
    }
}
