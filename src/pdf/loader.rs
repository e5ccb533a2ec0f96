//! PDF loading with lopdf.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::{DocumentInfo, Page};

/// Letter size, used when a page has no readable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Parent chain depth searched for inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 16;

/// Abstract access to a PDF's pages.
///
/// The extractor only talks to this trait, which keeps the concrete PDF
/// library out of the pipeline and lets tests feed pages directly.
pub trait PdfSource {
    /// File the document was read from; rendering works on this path.
    fn path(&self) -> &Path;

    /// Size of the source in bytes.
    fn file_size(&self) -> u64;

    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Document info dictionary.
    fn info(&self) -> DocumentInfo;

    /// Read one page (1-indexed).
    fn page(&self, number: u32) -> Result<Page>;
}

/// [`PdfSource`] backed by `lopdf::Document`.
pub struct PdfLoader {
    doc: LopdfDocument,
    path: PathBuf,
    file_size: u64,
}

impl PdfLoader {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Verify it's a PDF
        detect_format_from_path(path)?;

        let file_size = std::fs::metadata(path)?.len();
        let doc = LopdfDocument::load(path)?;

        log::debug!(
            "Loaded {} ({} pages, PDF {})",
            path.display(),
            doc.get_pages().len(),
            doc.version
        );

        Ok(Self {
            doc,
            path: path.to_path_buf(),
            file_size,
        })
    }

    /// Parse a PDF from bytes. `path` names the document in results and is
    /// the file the renderer reads, so it should exist when OCR is needed.
    pub fn from_bytes(data: &[u8], path: impl Into<PathBuf>) -> Result<Self> {
        detect_format_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self {
            doc,
            path: path.into(),
            file_size: data.len() as u64,
        })
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, number: u32) -> Result<ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&number)
            .copied()
            .ok_or(Error::PageOutOfRange(number, pages.len() as u32))
    }

    fn page_dimensions(&self, page_id: ObjectId) -> (f32, f32) {
        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| self.resolve(obj).as_array().ok());

        if let Some(array) = media_box {
            if array.len() >= 4 {
                let coord = |i: usize| self.resolve(&array[i]).as_float().ok();
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) =
                    (coord(0), coord(1), coord(2), coord(3))
                {
                    return ((x1 - x0).abs(), (y1 - y0).abs());
                }
            }
        }

        DEFAULT_PAGE_SIZE
    }

    fn page_text(&self, number: u32) -> Result<String> {
        self.doc
            .extract_text(&[number])
            .map_err(|e| Error::TextExtract(format!("page {}: {}", number, e)))
    }

    fn image_count(&self, page_id: ObjectId) -> u32 {
        let xobjects = self
            .inherited(page_id, b"Resources")
            .and_then(|res| self.as_dict(res))
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|xobj| self.as_dict(xobj));

        let Some(xobjects) = xobjects else {
            return 0;
        };

        xobjects
            .iter()
            .filter(|(_, obj)| {
                let stream = match self.resolve(obj) {
                    Object::Stream(stream) => stream,
                    _ => return false,
                };
                matches!(
                    stream.dict.get(b"Subtype").and_then(|s| s.as_name_str()),
                    Ok("Image")
                )
            })
            .count() as u32
    }

    /// Look up a page attribute, following /Parent for inheritable keys.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERIT_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).unwrap_or(obj),
            _ => obj,
        }
    }

    fn as_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).as_dict().ok()
    }
}

impl PdfSource for PdfLoader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }

    fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    fn info(&self) -> DocumentInfo {
        let mut info = DocumentInfo::with_version(self.version());
        info.page_count = self.page_count();
        info.encrypted = self.is_encrypted();

        let dict = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.as_dict(obj));

        if let Some(dict) = dict {
            info.title = get_string_from_dict(dict, b"Title");
            info.author = get_string_from_dict(dict, b"Author");
            info.subject = get_string_from_dict(dict, b"Subject");
            info.keywords = get_string_from_dict(dict, b"Keywords");
            info.creator = get_string_from_dict(dict, b"Creator");
            info.producer = get_string_from_dict(dict, b"Producer");
            info.creation_date =
                get_string_from_dict(dict, b"CreationDate").and_then(|s| parse_pdf_date(&s));
            info.modification_date =
                get_string_from_dict(dict, b"ModDate").and_then(|s| parse_pdf_date(&s));
        }

        info
    }

    fn page(&self, number: u32) -> Result<Page> {
        let page_id = self.page_id(number)?;
        let (width, height) = self.page_dimensions(page_id);
        let page = Page::new(number, width, height).with_images(self.image_count(page_id));

        // An unreadable text layer still leaves the page renderable for OCR.
        Ok(match self.page_text(number) {
            Ok(text) => page.with_text(text),
            Err(e) => {
                log::warn!("{}", e);
                page.with_text_error(e.to_string())
            }
        })
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok()?,
        _ => return None,
    };
    let value = value.trim_matches('\0').trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Decode a PDF text string: UTF-16BE with BOM, else UTF-8, else Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}
