//! OCR backend abstraction.
//!
//! Every engine implements [`OcrBackend`]; the pipeline only ever sees the
//! trait, so engines are selected by configuration and can be swapped for
//! test doubles.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::model::PageImage;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid engine output: {0}")]
    InvalidOutput(String),
}

/// Text recognized on one page image.
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    /// Recognized text
    pub text: String,
    /// Mean confidence in 0.0..=1.0, if the engine reports one
    pub confidence: Option<f32>,
    /// Backend that produced this result
    pub backend: OcrBackendType,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl Recognition {
    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    /// PaddleOCR through the Python bridge
    #[default]
    PaddleOcr,
    /// Tesseract via command-line
    Tesseract,
    /// EasyOCR through the Python bridge
    EasyOcr,
    /// Microsoft TrOCR through the Python bridge
    TrOcr,
}

impl OcrBackendType {
    /// Every backend, in display order.
    pub const ALL: [OcrBackendType; 4] = [
        OcrBackendType::PaddleOcr,
        OcrBackendType::Tesseract,
        OcrBackendType::EasyOcr,
        OcrBackendType::TrOcr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::PaddleOcr => "paddleocr",
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::EasyOcr => "easyocr",
            OcrBackendType::TrOcr => "trocr",
        }
    }

    /// Human-facing engine name.
    pub fn display_name(&self) -> &'static str {
        match self {
            OcrBackendType::PaddleOcr => "PaddleOCR",
            OcrBackendType::Tesseract => "Tesseract",
            OcrBackendType::EasyOcr => "EasyOCR",
            OcrBackendType::TrOcr => "TrOCR",
        }
    }

    /// Parse a comma-separated backend list (e.g. "tesseract,paddleocr").
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut backends = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let backend = part.parse::<Self>()?;
            if !backends.contains(&backend) {
                backends.push(backend);
            }
        }
        Ok(backends)
    }
}

impl FromStr for OcrBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paddleocr" | "paddle" => Ok(OcrBackendType::PaddleOcr),
            "tesseract" => Ok(OcrBackendType::Tesseract),
            "easyocr" | "easy" => Ok(OcrBackendType::EasyOcr),
            "trocr" => Ok(OcrBackendType::TrOcr),
            _ => Err(format!("unknown OCR backend: {}", s)),
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recognition language hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// ISO 639-1 code used by the Python engines.
    pub fn iso_code(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }

    /// Tesseract traineddata name.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            Language::Arabic => "ara",
            Language::English => "eng",
        }
    }

    /// Parse a comma-separated language list (e.g. "ar,en").
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut languages = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let language = part.parse::<Self>()?;
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        if languages.is_empty() {
            return Err("no language given".to_string());
        }
        Ok(languages)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ar" | "ara" | "arabic" => Ok(Language::Arabic),
            "en" | "eng" | "english" => Ok(Language::English),
            _ => Err(format!("unsupported language: {}", s)),
        }
    }
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (binaries and modules installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Recognize text on a rendered page image.
    fn recognize(&self, image: &PageImage, languages: &[Language]) -> Result<Recognition, OcrError>;
}

/// Configuration for OCR backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine used for pages routed to OCR
    pub backend: OcrBackendType,
    /// Language hints
    pub languages: Vec<Language>,
    /// Render resolution for OCR pages
    pub dpi: u32,
    /// Tesseract page segmentation mode
    pub psm: u8,
    /// Tesseract engine mode
    pub oem: u8,
    /// Lines below this confidence are dropped by the Python engines
    pub min_confidence: f32,
    /// Tesseract executable; looked up on PATH when unset
    pub tesseract_cmd: Option<PathBuf>,
    /// Python interpreter for PaddleOCR, EasyOCR and TrOCR
    pub python: PathBuf,
    /// Hugging Face model for TrOCR
    pub trocr_model: String,
    /// Horizontal strips a page is cut into before TrOCR reads it
    pub trocr_regions: u32,
    /// Whether the Python engines may use a GPU
    pub use_gpu: bool,
}

impl OcrConfig {
    /// Set the backend.
    pub fn with_backend(mut self, backend: OcrBackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the Tesseract executable.
    pub fn with_tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.tesseract_cmd = Some(cmd.into());
        self
    }

    /// Set the Python interpreter.
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if !(72..=600).contains(&self.dpi) {
            return Err(Error::Config(format!(
                "dpi must be between 72 and 600, got {}",
                self.dpi
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Config(format!(
                "min_confidence must be between 0 and 1, got {}",
                self.min_confidence
            )));
        }
        if !(1..=32).contains(&self.trocr_regions) {
            return Err(Error::Config(format!(
                "trocr_regions must be between 1 and 32, got {}",
                self.trocr_regions
            )));
        }
        if self.languages.is_empty() {
            return Err(Error::Config("at least one OCR language is required".to_string()));
        }
        Ok(())
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendType::default(),
            languages: vec![Language::Arabic, Language::English],
            dpi: 200,
            psm: 6,
            oem: 3,
            min_confidence: 0.3,
            tesseract_cmd: None,
            python: PathBuf::from("python3"),
            trocr_model: "microsoft/trocr-base-printed".to_string(),
            trocr_regions: 4,
            use_gpu: false,
        }
    }
}
