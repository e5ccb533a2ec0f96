//! Page-level types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A single page as read from the PDF, before any extraction decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text from the page's content stream (may be empty)
    pub text: String,

    /// Number of image XObjects referenced by the page
    pub image_count: u32,

    /// Why the text layer could not be read, if it could not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_error: Option<String>,
}

impl Page {
    /// Create a new empty page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            text: String::new(),
            image_count: 0,
            text_error: None,
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0) // 8.5 * 72, 11 * 72
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0) // 210mm * 2.834, 297mm * 2.834
    }

    /// Set the embedded text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the number of images on the page.
    pub fn with_images(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    /// Record a failure to read the text layer.
    pub fn with_text_error(mut self, error: impl Into<String>) -> Self {
        self.text_error = Some(error.into());
        self
    }

    /// Page area in square points.
    pub fn area(&self) -> f32 {
        (self.width * self.height).abs()
    }

    /// Number of characters in the embedded text after trimming.
    pub fn trimmed_char_count(&self) -> usize {
        self.text.trim().chars().count()
    }

    /// Whether the page has any non-whitespace embedded text.
    pub fn has_text_layer(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Whether the page carries images but no text layer (typical scan).
    pub fn is_image_only(&self) -> bool {
        self.image_count > 0 && !self.has_text_layer()
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::letter(1)
    }
}

/// A rendered page image handed to an OCR backend.
///
/// When the image was rendered into a temporary directory, the directory is
/// owned here and removed when the image is dropped.
#[derive(Debug)]
pub struct PageImage {
    path: PathBuf,
    page: u32,
    dpi: u32,
    _dir: Option<TempDir>,
}

impl PageImage {
    /// Wrap an existing image file.
    pub fn new(path: impl Into<PathBuf>, page: u32, dpi: u32) -> Self {
        Self {
            path: path.into(),
            page,
            dpi,
            _dir: None,
        }
    }

    /// Wrap an image that lives inside `dir`, taking ownership of the directory.
    pub fn in_temp_dir(dir: TempDir, path: impl Into<PathBuf>, page: u32, dpi: u32) -> Self {
        Self {
            path: path.into(),
            page,
            dpi,
            _dir: Some(dir),
        }
    }

    /// Path of the image file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Page number this image was rendered from.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Resolution the page was rendered at.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}
