//! Page rendering for OCR.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::model::PageImage;
use crate::ocr::check_binary;

const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not installed. Install with: apt install poppler-utils";

/// Renders a single PDF page to an image file.
pub trait PageRenderer: Send + Sync {
    /// Render page `page` (1-indexed) of `pdf_path`.
    fn render(&self, pdf_path: &Path, page: u32) -> Result<PageImage>;

    /// Whether the renderer can run on this machine.
    fn is_available(&self) -> bool;
}

/// [`PageRenderer`] that shells out to Poppler's `pdftoppm`.
///
/// Each page is rendered into its own temporary directory, which is removed
/// when the returned [`PageImage`] is dropped.
pub struct PdftoppmRenderer {
    command: PathBuf,
    dpi: u32,
    available: OnceLock<bool>,
}

impl PdftoppmRenderer {
    /// Create a renderer at the given resolution.
    pub fn new(dpi: u32) -> Self {
        Self {
            command: PathBuf::from("pdftoppm"),
            dpi,
            available: OnceLock::new(),
        }
    }

    /// Use a specific pdftoppm executable.
    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    /// Render resolution.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, pdf_path: &Path, page: u32) -> Result<PageImage> {
        let temp_dir = TempDir::new()?;
        let page_str = page.to_string();
        let output_prefix = temp_dir.path().join("page");

        let output = Command::new(&self.command)
            .args(["-png", "-singlefile", "-r", &self.dpi.to_string()])
            .args(["-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .stdout(Stdio::null())
            .output();

        match output {
            Ok(o) if o.status.success() => {
                let image_path = find_page_image(temp_dir.path(), page).ok_or_else(|| {
                    Error::Render(format!("No image generated for page {}", page))
                })?;
                Ok(PageImage::in_temp_dir(temp_dir, image_path, page, self.dpi))
            }
            Ok(o) => Err(Error::Render(format!(
                "pdftoppm failed on page {}: {}",
                page,
                String::from_utf8_lossy(&o.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::Render(PDFTOPPM_NOT_FOUND.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| check_binary(&self.command))
    }
}

/// Find the image pdftoppm wrote for a page.
///
/// With `-singlefile` the name is `page.png`; without it pdftoppm pads the
/// page number to the width of the page count (page-1.png, page-01.png, ...).
pub fn find_page_image(dir: &Path, page: u32) -> Option<PathBuf> {
    let single = dir.join("page.png");
    if single.exists() {
        return Some(single);
    }
    (1..=4)
        .map(|width| dir.join(format!("page-{:0width$}.png", page, width = width)))
        .find(|path| path.exists())
}
