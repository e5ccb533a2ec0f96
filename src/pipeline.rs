//! The extraction pipeline.
//!
//! ```text
//! PdfSource ─► ExtractionStrategy ─┬─► embedded text ──────────────┬─► TextNormalizer ─► DocumentResult
//!                                  └─► PageRenderer ─► OcrBackend ─┘
//! ```
//!
//! Pages are processed sequentially in page order. A page that cannot be
//! read, rendered or recognized never aborts the document: it is recorded
//! with an error and the remaining pages continue.

use chrono::Utc;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::model::{DocumentResult, Page, PageResult, ProcessingInfo};
use crate::normalize::TextNormalizer;
use crate::ocr::{create_backend, OcrBackend, OcrError, Recognition};
use crate::pdf::{PageRenderer, PdfLoader, PdfSource, PdftoppmRenderer};
use crate::strategy::{ExtractionStrategy, PageDecision};

/// Runs documents through strategy, OCR and normalization.
pub struct Extractor {
    config: ExtractConfig,
    strategy: ExtractionStrategy,
    normalizer: TextNormalizer,
    renderer: Box<dyn PageRenderer>,
    backend: Box<dyn OcrBackend>,
    backend_ready: OnceLock<std::result::Result<(), String>>,
}

impl Extractor {
    /// Create an extractor with the renderer and OCR backend named in `config`.
    pub fn new(config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let backend = create_backend(&config.ocr)?;
        let renderer = Box::new(PdftoppmRenderer::new(config.ocr.dpi));
        Ok(Self::with_parts(config, renderer, backend))
    }

    /// Create an extractor from explicit parts.
    pub fn with_parts(
        config: ExtractConfig,
        renderer: Box<dyn PageRenderer>,
        backend: Box<dyn OcrBackend>,
    ) -> Self {
        Self {
            strategy: ExtractionStrategy::from_config(&config),
            normalizer: TextNormalizer::new(config.normalize),
            config,
            renderer,
            backend,
            backend_ready: OnceLock::new(),
        }
    }

    /// Replace the page renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the OCR backend.
    pub fn with_backend(mut self, backend: Box<dyn OcrBackend>) -> Self {
        self.backend = backend;
        self.backend_ready = OnceLock::new();
        self
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Normalizer applied to every page.
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// OCR backend used for routed pages.
    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Extract a PDF file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentResult> {
        let loader = PdfLoader::open(path)?;
        self.extract(&loader)
    }

    /// Extract a loaded document.
    pub fn extract(&self, source: &dyn PdfSource) -> Result<DocumentResult> {
        let start = Instant::now();
        let info = source.info();
        let numbers = self.page_numbers(source)?;

        log::info!(
            "Extracting {} ({} of {} pages, {} mode)",
            source.path().display(),
            numbers.len(),
            source.page_count(),
            self.config.strategy
        );

        let pages: Vec<PageResult> = numbers
            .into_iter()
            .map(|n| self.extract_page(source, n))
            .collect();

        let filename = source
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let processing = ProcessingInfo {
            strategy: self.config.strategy,
            backend: self
                .config
                .strategy
                .may_ocr()
                .then(|| self.backend.backend_type()),
            processing_time_ms: start.elapsed().as_millis() as u64,
            extracted_at: Utc::now(),
        };

        let result = DocumentResult::new(filename, source.path(), pages, info, processing)
            .with_file_size(source.file_size());

        log::info!(
            "{}: {} ({} ms)",
            result.filename,
            result.summary(),
            result.processing.processing_time_ms
        );
        Ok(result)
    }

    /// Run only the strategy over a document's selected pages.
    pub fn decide_pages(&self, source: &dyn PdfSource) -> Result<Vec<PageDecision>> {
        self.page_numbers(source)?
            .into_iter()
            .map(|n| Ok(self.strategy.decide(&source.page(n)?)))
            .collect()
    }

    fn page_numbers(&self, source: &dyn PdfSource) -> Result<Vec<u32>> {
        let count = source.page_count();
        if count == 0 {
            return Err(Error::Corrupted("document has no pages".to_string()));
        }
        let numbers = self.config.pages.resolve(count);
        if numbers.is_empty() {
            return Err(Error::InvalidPageRange(format!(
                "no selected page exists (document has {} pages)",
                count
            )));
        }
        Ok(numbers)
    }

    /// Extract one page. Never fails: problems are recorded on the result.
    pub fn extract_page(&self, source: &dyn PdfSource, number: u32) -> PageResult {
        let page = match source.page(number) {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Page {}: {}", number, e);
                return PageResult::failed(number, e.to_string(), String::new());
            }
        };

        let text_error = page.text_error.clone();
        let result = self.route_page(page, source.path());
        match text_error {
            Some(e) => {
                let combined = match &result.error {
                    Some(other) => format!("{}; {}", other, e),
                    None => e,
                };
                result.with_error(combined)
            }
            None => result,
        }
    }

    fn route_page(&self, page: Page, pdf_path: &Path) -> PageResult {
        let number = page.number;
        let decision = self.strategy.decide(&page);
        if !decision.needs_ocr {
            let text = self.normalizer.normalize(&page.text);
            return PageResult::embedded(number, text, page.text);
        }

        log::debug!(
            "Page {}: OCR ({})",
            number,
            decision.reason.map(|r| r.description()).unwrap_or("")
        );

        match self.ocr_page(pdf_path, number) {
            Ok(recognition) => PageResult::ocr(
                number,
                self.normalizer.normalize(&recognition.text),
                recognition.backend,
                recognition.confidence,
                page.text,
            )
            .with_decision(true, decision.reason),
            Err(e) if page.has_text_layer() => {
                log::warn!("Page {}: OCR failed, keeping embedded text: {}", number, e);
                let text = self.normalizer.normalize(&page.text);
                PageResult::embedded(number, text, page.text)
                    .with_decision(true, decision.reason)
                    .with_error(e.to_string())
            }
            Err(e) => {
                log::warn!("Page {}: {}", number, e);
                PageResult::failed(number, e.to_string(), page.text)
                    .with_decision(true, decision.reason)
            }
        }
    }

    fn ocr_page(&self, pdf_path: &Path, number: u32) -> Result<Recognition> {
        self.ensure_backend()?;
        let image = self.renderer.render(pdf_path, number)?;
        Ok(self.backend.recognize(&image, &self.config.ocr.languages)?)
    }

    /// Check backend availability once per extractor.
    fn ensure_backend(&self) -> Result<()> {
        let ready = self.backend_ready.get_or_init(|| {
            if self.backend.is_available() {
                Ok(())
            } else {
                let hint = self.backend.availability_hint();
                log::warn!("{} unavailable: {}", self.backend.backend_type(), hint);
                Err(hint)
            }
        });

        ready
            .clone()
            .map_err(|hint| Error::Ocr(OcrError::BackendNotAvailable(hint)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageSelection, StrategyMode};
    use crate::model::{DocumentInfo, ExtractionMethod, PageImage};
    use crate::ocr::{Language, OcrBackendType};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Pages(Vec<Page>);

    impl PdfSource for Pages {
        fn path(&self) -> &Path {
            Path::new("memory.pdf")
        }
        fn file_size(&self) -> u64 {
            42
        }
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }
        fn info(&self) -> DocumentInfo {
            DocumentInfo::with_version("1.7")
        }
        fn page(&self, number: u32) -> Result<Page> {
            self.0
                .get(number as usize - 1)
                .cloned()
                .ok_or(Error::PageOutOfRange(number, self.0.len() as u32))
        }
    }

    struct FakeRenderer;

    impl PageRenderer for FakeRenderer {
        fn render(&self, _pdf_path: &Path, page: u32) -> Result<PageImage> {
            Ok(PageImage::new(PathBuf::from(format!("page-{}.png", page)), page, 200))
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    struct FakeOcr {
        calls: Arc<AtomicUsize>,
        available: bool,
    }

    impl OcrBackend for FakeOcr {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }
        fn is_available(&self) -> bool {
            self.available
        }
        fn availability_hint(&self) -> String {
            "fake engine missing".to_string()
        }
        fn recognize(&self, image: &PageImage, _languages: &[Language]) -> std::result::Result<Recognition, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Recognition {
                text: format!("نَص الصفحة {}", image.page()),
                confidence: Some(0.87),
                backend: OcrBackendType::Tesseract,
                processing_time_ms: 1,
            })
        }
    }

    fn extractor(config: ExtractConfig, available: bool) -> (Extractor, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let ocr = FakeOcr {
            calls: calls.clone(),
            available,
        };
        (
            Extractor::with_parts(config, Box::new(FakeRenderer), Box::new(ocr)),
            calls,
        )
    }

    fn long_text() -> String {
        "نص عربي مضمن في الصفحة بطول كاف لتجاوز العتبة الدنيا للحروف. ".repeat(2)
    }

    #[test]
    fn test_text_pages_skip_ocr() {
        let (ex, calls) = extractor(ExtractConfig::default(), true);
        let doc = ex
            .extract(&Pages(vec![Page::a4(1).with_text(long_text())]))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc.pages[0].method, ExtractionMethod::Embedded);
        assert_eq!(doc.file_size, 42);
        assert_eq!(doc.filename, "memory.pdf");
    }

    #[test]
    fn test_scanned_pages_use_ocr_and_normalize() {
        let (ex, calls) = extractor(ExtractConfig::default(), true);
        let doc = ex
            .extract(&Pages(vec![Page::a4(1).with_images(1), Page::a4(2).with_images(1)]))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(doc.ocr_pages(), 2);
        assert_eq!(doc.pages[0].text, "نص الصفحة 1");
        assert_eq!(doc.pages[0].confidence, Some(0.87));
        assert!(doc.pages[0].needs_ocr);
        assert_eq!(doc.text, "نص الصفحة 1\n\nنص الصفحة 2");
    }

    #[test]
    fn test_unavailable_backend_keeps_embedded_text() {
        let (ex, calls) = extractor(ExtractConfig::default(), false);
        let doc = ex
            .extract(&Pages(vec![
                Page::a4(1).with_text("بسم الله"),
                Page::a4(2).with_images(1),
            ]))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc.pages[0].text, "بسم الله");
        assert!(doc.pages[0].error.as_deref().unwrap().contains("fake engine missing"));
        assert!(doc.pages[1].is_failed());
        assert_eq!(doc.text, "بسم الله");
        assert_eq!(doc.errors().len(), 2);
    }

    #[test]
    fn test_direct_mode_never_calls_ocr() {
        let config = ExtractConfig::default().with_strategy(StrategyMode::Direct);
        let (ex, calls) = extractor(config, true);
        let doc = ex.extract(&Pages(vec![Page::a4(1).with_images(1)])).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc.processing.backend, None);
        assert!(!doc.pages[0].has_content());
        assert!(!doc.pages[0].is_failed());
    }

    #[test]
    fn test_page_selection() {
        let config = ExtractConfig::default()
            .with_strategy(StrategyMode::Direct)
            .with_pages(PageSelection::Pages(vec![2, 9]));
        let (ex, _) = extractor(config, true);
        let doc = ex
            .extract(&Pages(vec![Page::a4(1).with_text("a"), Page::a4(2).with_text("b")]))
            .unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.text, "b");

        let config = ExtractConfig::default().with_pages(PageSelection::Range(5..=6));
        let (ex, _) = extractor(config, true);
        assert!(matches!(
            ex.extract(&Pages(vec![Page::a4(1)])),
            Err(Error::InvalidPageRange(_))
        ));
    }

    #[test]
    fn test_decide_pages() {
        let (ex, _) = extractor(ExtractConfig::default(), true);
        let decisions = ex
            .decide_pages(&Pages(vec![Page::a4(1).with_text(long_text()), Page::a4(2)]))
            .unwrap();
        assert!(!decisions[0].needs_ocr);
        assert!(decisions[1].needs_ocr);
    }

    #[test]
    fn test_unreadable_text_layer_is_recorded() {
        let broken = || Page::a4(1).with_text_error("Text extraction error: page 1: bad Tf");

        let config = ExtractConfig::default().with_strategy(StrategyMode::Direct);
        let (ex, _) = extractor(config, true);
        let doc = ex.extract(&Pages(vec![broken()])).unwrap();
        assert!(doc.pages[0].is_failed());
        assert_eq!(doc.failed_pages(), 1);
        assert!(doc.errors()[0].error.contains("bad Tf"));

        // OCR still reads the page, and the text layer failure stays visible
        let (ex, calls) = extractor(ExtractConfig::default(), true);
        let doc = ex.extract(&Pages(vec![broken()])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(doc.pages[0].has_content());
        assert!(doc.pages[0].error.as_deref().unwrap().contains("bad Tf"));

        // both failures are kept when OCR is unavailable too
        let (ex, _) = extractor(ExtractConfig::default(), false);
        let doc = ex.extract(&Pages(vec![broken()])).unwrap();
        let error = doc.pages[0].error.as_deref().unwrap();
        assert!(error.contains("fake engine missing"));
        assert!(error.contains("bad Tf"));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        let (ex, _) = extractor(ExtractConfig::default(), true);
        assert!(matches!(ex.extract(&Pages(Vec::new())), Err(Error::Corrupted(_))));
    }
}
