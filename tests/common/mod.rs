//! Shared helpers for integration tests: synthetic PDFs and fake engines.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arpdf::ocr::{Language, OcrBackend, OcrBackendType, OcrError, Recognition};
use arpdf::{PageImage, PageRenderer};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// A sentence long and dense enough to pass the smart strategy on A4.
pub const TEXT_LINE: &str =
    "The quick brown fox jumps over the lazy dog and keeps running far away.";

/// Page contents for [`build_pdf`].
pub enum PageSpec<'a> {
    /// A text layer with this string
    Text(&'a str),
    /// A single full-page image and no text
    Scanned,
    /// A full-page image plus a text object whose `Tf` operand is not a
    /// font name, so the text layer cannot be read
    UnreadableText,
}

/// Build an A4 PDF in memory.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0u8],
    ));

    let mut kids: Vec<Object> = Vec::new();
    for spec in pages {
        let (operations, resources) = match spec {
            PageSpec::Text(text) => (
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 760.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                dictionary! { "Font" => dictionary! { "F1" => font_id } },
            ),
            PageSpec::Scanned => (
                vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![595.into(), 0.into(), 0.into(), 842.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ],
                dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            ),
            PageSpec::UnreadableText => (
                vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![595.into(), 0.into(), 0.into(), 842.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![12.into(), 12.into()]),
                    Operation::new("Tj", vec![Object::string_literal(TEXT_LINE)]),
                    Operation::new("ET", vec![]),
                ],
                dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Im1" => image_id },
                },
            ),
        };

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Synthetic Test Document"),
        "Producer" => Object::string_literal("arpdf tests"),
    });
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// Write a PDF built from `pages` to `dir/name`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[PageSpec]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    std::fs::write(&path, build_pdf(pages)).expect("write pdf");
    path
}

/// Renderer that never touches Poppler.
pub struct FakeRenderer;

impl PageRenderer for FakeRenderer {
    fn render(&self, _pdf_path: &Path, page: u32) -> arpdf::Result<PageImage> {
        Ok(PageImage::new(format!("page-{}.png", page), page, 200))
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// OCR engine that counts calls and returns a fixed Arabic line.
pub struct CountingOcr {
    pub calls: Arc<AtomicUsize>,
    pub available: bool,
}

impl CountingOcr {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                available: true,
            },
            calls,
        )
    }

    pub fn unavailable() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            available: false,
        }
    }
}

impl OcrBackend for CountingOcr {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn availability_hint(&self) -> String {
        "tesseract not installed".to_string()
    }

    fn recognize(
        &self,
        image: &PageImage,
        _languages: &[Language],
    ) -> Result<Recognition, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Recognition {
            text: format!("الصفحة الممسوحة رقم {}", image.page()),
            confidence: Some(0.9),
            backend: OcrBackendType::Tesseract,
            processing_time_ms: 1,
        })
    }
}
