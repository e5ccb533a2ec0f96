//! Side-by-side comparison of OCR backends.
//!
//! Each selected page is rendered once and handed to every backend. The
//! report ranks backends by mean confidence (an accuracy proxy), by words
//! per second, and by a weighted overall score.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ExtractConfig, PageSelection};
use crate::error::{Error, Result};
use crate::model::PageImage;
use crate::ocr::{create_backend_of, Language, OcrBackend, OcrBackendType};
use crate::pdf::{PageRenderer, PdfLoader, PdfSource, PdftoppmRenderer};

/// Weight of normalized confidence in the overall score.
const ACCURACY_WEIGHT: f64 = 0.6;
/// Weight of normalized words/sec in the overall score.
const SPEED_WEIGHT: f64 = 0.4;
/// Floor for divisors (seconds and normalization maxima).
const MIN_DIVISOR: f64 = 0.001;

/// One backend's result on one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageComparison {
    pub page: u32,
    pub text: String,
    pub confidence: Option<f32>,
    pub word_count: usize,
    pub processing_time_ms: u64,
    pub error: Option<String>,
}

/// Everything measured for one backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendEvaluation {
    pub backend: OcrBackendType,
    pub available: bool,
    pub pages: Vec<PageComparison>,
    pub total_words: usize,
    /// Mean of the page confidences the engine reported
    pub mean_confidence: Option<f32>,
    pub processing_time_ms: u64,
    pub pages_per_second: f64,
    pub words_per_second: f64,
    /// Set when the backend could not run at all
    pub error: Option<String>,
}

impl BackendEvaluation {
    fn unavailable(backend: OcrBackendType, hint: String) -> Self {
        Self {
            backend,
            available: false,
            pages: Vec::new(),
            total_words: 0,
            mean_confidence: None,
            processing_time_ms: 0,
            pages_per_second: 0.0,
            words_per_second: 0.0,
            error: Some(hint),
        }
    }

    /// Pages recognized without error.
    pub fn successful_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.error.is_none()).count()
    }
}

/// A ranked backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub rank: usize,
    pub backend: OcrBackendType,
    pub score: f64,
}

/// Rankings across the backends that ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonSummary {
    /// By mean confidence, highest first
    pub accuracy_ranking: Vec<RankEntry>,
    /// By words per second, fastest first
    pub speed_ranking: Vec<RankEntry>,
    /// By `0.6 * confidence / max_confidence + 0.4 * speed / max_speed`
    pub overall_ranking: Vec<RankEntry>,
    pub backends_evaluated: usize,
    pub average_confidence: f64,
    pub average_processing_time_ms: f64,
    pub average_words: f64,
    pub best_accuracy: Option<OcrBackendType>,
    pub fastest: Option<OcrBackendType>,
    pub best_overall: Option<OcrBackendType>,
}

/// Full comparison output.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub pdf_path: PathBuf,
    pub pages: Vec<u32>,
    pub backends: Vec<OcrBackendType>,
    pub parallel: bool,
    pub total_time_ms: u64,
    pub compared_at: DateTime<Utc>,
    pub results: Vec<BackendEvaluation>,
    pub summary: ComparisonSummary,
}

impl ComparisonReport {
    /// Look up one backend's evaluation.
    pub fn evaluation(&self, backend: OcrBackendType) -> Option<&BackendEvaluation> {
        self.results.iter().find(|e| e.backend == backend)
    }

    /// Write the report as pretty JSON into `dir`, named after the PDF.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let stem = self
            .pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let path = dir.join(format!("{}_comparison.json", stem));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        log::info!("Comparison saved to {}", path.display());
        Ok(path)
    }
}

/// Compare `backends` on the selected pages of a PDF. An empty `backends`
/// slice means every known backend.
pub fn compare_backends<P: AsRef<Path>>(
    path: P,
    pages: &PageSelection,
    backends: &[OcrBackendType],
    config: &ExtractConfig,
) -> Result<ComparisonReport> {
    let path = path.as_ref();
    config.validate()?;

    let loader = PdfLoader::open(path)?;
    let count = loader.page_count();
    let pages = pages.resolve(count);
    if pages.is_empty() {
        return Err(Error::InvalidPageRange(format!(
            "no selected page exists (document has {} pages)",
            count
        )));
    }

    let backends = if backends.is_empty() {
        OcrBackendType::ALL.to_vec()
    } else {
        backends.to_vec()
    };
    let engines = backends
        .iter()
        .map(|&b| create_backend_of(b, &config.ocr))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let renderer = PdftoppmRenderer::new(config.ocr.dpi);
    Ok(compare_with(
        path,
        &pages,
        &renderer,
        engines,
        &config.ocr.languages,
        config.parallel,
    ))
}

/// Compare already-built engines. Pages are rendered once with `renderer`.
pub fn compare_with(
    pdf_path: &Path,
    pages: &[u32],
    renderer: &dyn PageRenderer,
    engines: Vec<Box<dyn OcrBackend>>,
    languages: &[Language],
    parallel: bool,
) -> ComparisonReport {
    let start = Instant::now();
    let backends: Vec<OcrBackendType> = engines.iter().map(|e| e.backend_type()).collect();

    log::info!(
        "Comparing {} backends on {} pages of {}",
        engines.len(),
        pages.len(),
        pdf_path.display()
    );

    let images: Vec<(u32, std::result::Result<PageImage, String>)> = pages
        .iter()
        .map(|&n| {
            let image = renderer.render(pdf_path, n).map_err(|e| {
                log::warn!("Page {}: {}", n, e);
                e.to_string()
            });
            (n, image)
        })
        .collect();

    let evaluate = |engine: &Box<dyn OcrBackend>| evaluate_backend(engine.as_ref(), &images, languages);
    let results: Vec<BackendEvaluation> = if parallel && engines.len() > 1 {
        engines.par_iter().map(evaluate).collect()
    } else {
        engines.iter().map(evaluate).collect()
    };

    let summary = summarize(&results);
    if let Some(best) = summary.best_overall {
        log::info!("Best overall backend: {}", best);
    }

    ComparisonReport {
        pdf_path: pdf_path.to_path_buf(),
        pages: pages.to_vec(),
        backends,
        parallel,
        total_time_ms: start.elapsed().as_millis() as u64,
        compared_at: Utc::now(),
        results,
        summary,
    }
}

fn evaluate_backend(
    engine: &dyn OcrBackend,
    images: &[(u32, std::result::Result<PageImage, String>)],
    languages: &[Language],
) -> BackendEvaluation {
    let backend = engine.backend_type();
    if !engine.is_available() {
        let hint = engine.availability_hint();
        log::warn!("{} unavailable: {}", backend, hint);
        return BackendEvaluation::unavailable(backend, hint);
    }

    let start = Instant::now();
    let pages: Vec<PageComparison> = images
        .iter()
        .map(|(n, image)| {
            let page_start = Instant::now();
            let outcome = image
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|img| engine.recognize(img, languages).map_err(|e| e.to_string()));
            match outcome {
                Ok(rec) => PageComparison {
                    page: *n,
                    word_count: rec.word_count(),
                    confidence: rec.confidence,
                    processing_time_ms: rec.processing_time_ms,
                    text: rec.text,
                    error: None,
                },
                Err(e) => {
                    log::warn!("{} page {}: {}", backend, n, e);
                    PageComparison {
                        page: *n,
                        text: String::new(),
                        confidence: None,
                        word_count: 0,
                        processing_time_ms: page_start.elapsed().as_millis() as u64,
                        error: Some(e),
                    }
                }
            }
        })
        .collect();
    let elapsed = start.elapsed();

    let total_words: usize = pages.iter().map(|p| p.word_count).sum();
    let confidences: Vec<f32> = pages.iter().filter_map(|p| p.confidence).collect();
    let mean_confidence = (!confidences.is_empty())
        .then(|| confidences.iter().sum::<f32>() / confidences.len() as f32);
    let seconds = elapsed.as_secs_f64().max(MIN_DIVISOR);

    BackendEvaluation {
        backend,
        available: true,
        total_words,
        mean_confidence,
        processing_time_ms: elapsed.as_millis() as u64,
        pages_per_second: pages.len() as f64 / seconds,
        words_per_second: total_words as f64 / seconds,
        pages,
        error: None,
    }
}

fn ranking(scored: &[(OcrBackendType, f64)]) -> Vec<RankEntry> {
    let mut sorted = scored.to_vec();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (backend, score))| RankEntry {
            rank: i + 1,
            backend,
            score,
        })
        .collect()
}

/// Rank the evaluations of backends that ran.
pub fn summarize(results: &[BackendEvaluation]) -> ComparisonSummary {
    let ran: Vec<&BackendEvaluation> = results.iter().filter(|r| r.error.is_none()).collect();
    if ran.is_empty() {
        return ComparisonSummary::default();
    }

    let confidence = |r: &BackendEvaluation| r.mean_confidence.unwrap_or(0.0) as f64;
    let max_confidence = ran.iter().map(|r| confidence(r)).fold(0.0, f64::max);
    let max_speed = ran.iter().map(|r| r.words_per_second).fold(0.0, f64::max);

    let accuracy: Vec<_> = ran.iter().map(|r| (r.backend, confidence(r))).collect();
    let speed: Vec<_> = ran.iter().map(|r| (r.backend, r.words_per_second)).collect();
    let overall: Vec<_> = ran
        .iter()
        .map(|r| {
            let norm_confidence = confidence(r) / max_confidence.max(MIN_DIVISOR);
            let norm_speed = r.words_per_second / max_speed.max(MIN_DIVISOR);
            (r.backend, ACCURACY_WEIGHT * norm_confidence + SPEED_WEIGHT * norm_speed)
        })
        .collect();

    let n = ran.len() as f64;
    let accuracy_ranking = ranking(&accuracy);
    let speed_ranking = ranking(&speed);
    let overall_ranking = ranking(&overall);

    ComparisonSummary {
        best_accuracy: accuracy_ranking.first().map(|e| e.backend),
        fastest: speed_ranking.first().map(|e| e.backend),
        best_overall: overall_ranking.first().map(|e| e.backend),
        accuracy_ranking,
        speed_ranking,
        overall_ranking,
        backends_evaluated: ran.len(),
        average_confidence: ran.iter().map(|r| confidence(r)).sum::<f64>() / n,
        average_processing_time_ms: ran.iter().map(|r| r.processing_time_ms as f64).sum::<f64>() / n,
        average_words: ran.iter().map(|r| r.total_words as f64).sum::<f64>() / n,
    }
}
