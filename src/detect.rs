//! PDF format detection and text-vs-scanned classification.

use crate::error::{Error, Result};
use crate::pdf::{PdfLoader, PdfSource};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"
const HEADER_LEN: u64 = 16;

/// Pages sampled by [`classify_document`].
const CLASSIFY_SAMPLE_PAGES: u32 = 3;

/// Trimmed characters a sampled page needs to count as text-based.
const CLASSIFY_MIN_CHARS: usize = 20;

/// Detect PDF format from a file path.
///
/// # Example
/// ```no_run
/// use arpdf::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("document.pdf").unwrap();
/// println!("PDF version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    file.take(HEADER_LEN).read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect PDF format from bytes.
///
/// Returns `Error::UnknownFormat` when the data does not start with a PDF
/// header and `Error::UnsupportedVersion` when the version is malformed.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    if !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    // Extract version string (e.g., "1.7" from "%PDF-1.7")
    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfFormat { version })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// Check if a file is a valid PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes represent a valid PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

/// Whether a document carries a usable text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfKind {
    /// At least one sampled page has real text
    Text,
    /// No sampled page has real text
    Scanned,
}

impl PdfKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfKind::Text => "text",
            PdfKind::Scanned => "scanned",
        }
    }
}

impl std::fmt::Display for PdfKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a document from its first three pages.
///
/// Pages that fail to load are treated as having no text.
pub fn classify_document(source: &dyn PdfSource) -> PdfKind {
    let sample = source.page_count().min(CLASSIFY_SAMPLE_PAGES);
    let has_text = (1..=sample).any(|n| match source.page(n) {
        Ok(page) => page.trimmed_char_count() >= CLASSIFY_MIN_CHARS,
        Err(e) => {
            log::debug!("classify: page {} unreadable: {}", n, e);
            false
        }
    });

    if has_text {
        PdfKind::Text
    } else {
        PdfKind::Scanned
    }
}

/// Open a file and classify it.
pub fn classify_file<P: AsRef<Path>>(path: P) -> Result<PdfKind> {
    let loader = PdfLoader::open(path)?;
    Ok(classify_document(&loader))
}
