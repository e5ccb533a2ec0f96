//! End-to-end extraction over synthetic PDFs.

mod common;

use std::sync::atomic::Ordering;

use arpdf::{
    classify_file, ExtractConfig, ExtractionMethod, Extractor, OcrReason, PageSelection, PdfKind,
    PdfLoader, PdfSource, StrategyMode,
};
use common::{build_pdf, write_pdf, CountingOcr, FakeRenderer, PageSpec, TEXT_LINE};

fn extractor(config: ExtractConfig) -> (Extractor, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
    let (ocr, calls) = CountingOcr::new();
    (
        Extractor::with_parts(config, Box::new(FakeRenderer), Box::new(ocr)),
        calls,
    )
}

#[test]
fn test_loader_reads_text_and_geometry() {
    let data = build_pdf(&[PageSpec::Text(TEXT_LINE), PageSpec::Scanned]);
    let loader = PdfLoader::from_bytes(&data, "memory.pdf").unwrap();

    assert_eq!(loader.page_count(), 2);

    let first = loader.page(1).unwrap();
    assert!(first.text.contains("quick brown fox"));
    assert_eq!(first.dimensions(), (595.0, 842.0));
    assert_eq!(first.image_count, 0);

    let second = loader.page(2).unwrap();
    assert!(second.text.trim().is_empty());
    assert_eq!(second.image_count, 1);
    assert!(second.is_image_only());

    let info = loader.info();
    assert_eq!(info.title.as_deref(), Some("Synthetic Test Document"));
    assert_eq!(info.page_count, 2);
    assert!(!info.encrypted);
}

#[test]
fn test_loader_page_out_of_range() {
    let data = build_pdf(&[PageSpec::Text(TEXT_LINE)]);
    let loader = PdfLoader::from_bytes(&data, "memory.pdf").unwrap();
    assert!(matches!(
        loader.page(3),
        Err(arpdf::Error::PageOutOfRange(3, 1))
    ));
}

#[test]
fn test_text_pdf_never_invokes_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "text.pdf",
        &[PageSpec::Text(TEXT_LINE), PageSpec::Text(TEXT_LINE)],
    );

    let (ex, calls) = extractor(ExtractConfig::default());
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.embedded_pages(), 2);
    assert!(doc
        .pages
        .iter()
        .all(|p| p.method == ExtractionMethod::Embedded && !p.needs_ocr));
    assert!(doc.text.contains("lazy dog"));
    assert_eq!(doc.processing.strategy, StrategyMode::Smart);
}

#[test]
fn test_scanned_pdf_routes_every_page_to_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "scanned.pdf",
        &[PageSpec::Scanned, PageSpec::Scanned, PageSpec::Scanned],
    );

    let (ex, calls) = extractor(ExtractConfig::default());
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(doc.ocr_pages(), 3);
    for page in &doc.pages {
        assert!(page.needs_ocr);
        assert_eq!(page.reason, Some(OcrReason::TooFewChars));
        assert!(page.method.is_ocr());
    }
    assert_eq!(
        doc.text,
        "الصفحة الممسوحة رقم 1\n\nالصفحة الممسوحة رقم 2\n\nالصفحة الممسوحة رقم 3"
    );
}

#[test]
fn test_mixed_document_only_ocrs_scanned_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "mixed.pdf",
        &[PageSpec::Text(TEXT_LINE), PageSpec::Scanned],
    );

    let (ex, calls) = extractor(ExtractConfig::default());
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(doc.pages[0].method, ExtractionMethod::Embedded);
    assert!(doc.pages[1].method.is_ocr());
}

#[test]
fn test_ocr_mode_forces_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "text.pdf", &[PageSpec::Text(TEXT_LINE)]);

    let (ex, calls) = extractor(ExtractConfig::default().with_strategy(StrategyMode::Ocr));
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(doc.pages[0].reason, Some(OcrReason::Forced));
}

#[test]
fn test_unavailable_engine_fails_scanned_pages_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "mixed.pdf",
        &[PageSpec::Text(TEXT_LINE), PageSpec::Scanned],
    );

    let ex = Extractor::with_parts(
        ExtractConfig::default(),
        Box::new(FakeRenderer),
        Box::new(CountingOcr::unavailable()),
    );
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(doc.embedded_pages(), 1);
    assert_eq!(doc.failed_pages(), 1);
    let errors = doc.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].page, 2);
    assert!(errors[0].error.contains("tesseract not installed"));
}

#[test]
fn test_unreadable_text_layer_is_recorded_not_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "broken-layer.pdf",
        &[PageSpec::Text(TEXT_LINE), PageSpec::UnreadableText],
    );

    let loader = PdfLoader::open(&path).unwrap();
    let page = loader.page(2).unwrap();
    assert!(page.text.is_empty());
    assert!(page
        .text_error
        .as_deref()
        .unwrap()
        .starts_with("Text extraction error: page 2"));
    assert!(loader.page(1).unwrap().text_error.is_none());

    let (ex, calls) = extractor(ExtractConfig::default().with_strategy(StrategyMode::Direct));
    let doc = ex.extract_file(&path).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(doc.failed_pages(), 1);
    let errors = doc.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].page, 2);
    assert!(errors[0].error.contains("Text extraction error"));

    // smart mode still recovers the page through OCR
    let (ex, calls) = extractor(ExtractConfig::default());
    let doc = ex.extract_file(&path).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(doc.pages[1].method.is_ocr());
    assert!(doc.pages[1].has_content());
    assert_eq!(doc.errors().len(), 1);
}

#[test]
fn test_page_selection_limits_work() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "pages.pdf",
        &[PageSpec::Scanned, PageSpec::Text(TEXT_LINE), PageSpec::Scanned],
    );

    let config = ExtractConfig::default().with_pages(PageSelection::parse("2-3").unwrap());
    let (ex, calls) = extractor(config);
    let doc = ex.extract_file(&path).unwrap();

    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.pages[0].number, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_corrupt_and_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let corrupt = dir.path().join("corrupt.pdf");
    std::fs::write(&corrupt, b"%PDF-1.4\nthis is not a real pdf body").unwrap();
    let not_pdf = dir.path().join("notes.pdf");
    std::fs::write(&not_pdf, b"plain text pretending to be a pdf").unwrap();

    let (ex, _) = extractor(ExtractConfig::default());
    assert!(ex.extract_file(&corrupt).is_err());
    assert!(matches!(
        ex.extract_file(&not_pdf),
        Err(arpdf::Error::UnknownFormat)
    ));
    assert!(matches!(
        ex.extract_file(dir.path().join("missing.pdf")),
        Err(arpdf::Error::Io(_))
    ));
}

#[test]
fn test_classify_file() {
    let dir = tempfile::tempdir().unwrap();
    let text = write_pdf(dir.path(), "text.pdf", &[PageSpec::Text(TEXT_LINE)]);
    let scanned = write_pdf(dir.path(), "scanned.pdf", &[PageSpec::Scanned]);

    assert_eq!(classify_file(&text).unwrap(), PdfKind::Text);
    assert_eq!(classify_file(&scanned).unwrap(), PdfKind::Scanned);
}
