//! Per-page routing between the embedded text layer and OCR.

use serde::Serialize;
use std::fmt;

use crate::config::{DetectionThresholds, ExtractConfig, StrategyMode};
use crate::model::Page;

/// Characters that PDF text extraction emits in place of unmappable glyphs.
const ARTIFACT_CHARS: [char; 5] = ['\u{FFFD}', '□', '▪', '◦', '●'];

/// Page area unit for density, in square points.
const DENSITY_AREA_UNIT: f32 = 10_000.0;

/// Why a page was routed to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrReason {
    /// Fewer trimmed characters than the minimum
    TooFewChars,
    /// Too few characters for the page area
    LowDensity,
    /// Too few recognizable characters
    Garbled,
    /// Too many replacement characters or boxes
    Artifacts,
    /// OCR mode was requested for every page
    Forced,
}

impl OcrReason {
    /// Short description for logs and reports.
    pub fn description(&self) -> &'static str {
        match self {
            OcrReason::TooFewChars => "too few characters",
            OcrReason::LowDensity => "low text density",
            OcrReason::Garbled => "garbled text",
            OcrReason::Artifacts => "extraction artifacts",
            OcrReason::Forced => "OCR mode",
        }
    }
}

impl fmt::Display for OcrReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Measurements of a page's embedded text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TextMetrics {
    /// Trimmed character count
    pub char_count: usize,
    /// Characters per 10,000 square points
    pub density: f32,
    /// Share of recognizable characters
    pub valid_ratio: f32,
    /// Share of artifact characters
    pub artifact_ratio: f32,
}

impl TextMetrics {
    /// Measure a page.
    pub fn measure(page: &Page) -> Self {
        let text = page.text.trim();
        let char_count = text.chars().count();
        if char_count == 0 {
            return Self::default();
        }

        let valid = text.chars().filter(|&c| is_valid_char(c)).count();
        let artifacts = text.chars().filter(|c| ARTIFACT_CHARS.contains(c)).count();

        let area_units = page.area() / DENSITY_AREA_UNIT;
        let density = if area_units > 0.0 {
            char_count as f32 / area_units
        } else {
            f32::INFINITY
        };

        Self {
            char_count,
            density,
            valid_ratio: valid as f32 / char_count as f32,
            artifact_ratio: artifacts as f32 / char_count as f32,
        }
    }
}

fn is_valid_char(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}')
        || c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | '(' | ')' | '-' | '+' | '=')
}

/// Outcome of the strategy for one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageDecision {
    /// Page number (1-indexed)
    pub page: u32,
    /// Whether the page should be rendered and recognized
    pub needs_ocr: bool,
    /// First rule that fired
    pub reason: Option<OcrReason>,
    /// Measurements the decision was based on
    pub metrics: TextMetrics,
}

/// Decides per page whether to trust the text layer.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStrategy {
    mode: StrategyMode,
    thresholds: DetectionThresholds,
}

impl ExtractionStrategy {
    /// Create a strategy.
    pub fn new(mode: StrategyMode, thresholds: DetectionThresholds) -> Self {
        Self { mode, thresholds }
    }

    /// Create a strategy from a configuration.
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.strategy, config.thresholds)
    }

    /// Strategy mode.
    pub fn mode(&self) -> StrategyMode {
        self.mode
    }

    /// Detection thresholds.
    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }

    /// Decide how to extract a page.
    pub fn decide(&self, page: &Page) -> PageDecision {
        let metrics = TextMetrics::measure(page);
        let reason = match self.mode {
            StrategyMode::Direct => None,
            StrategyMode::Ocr => Some(OcrReason::Forced),
            StrategyMode::Smart => self.smart_reason(&metrics),
        };

        PageDecision {
            page: page.number,
            needs_ocr: reason.is_some(),
            reason,
            metrics,
        }
    }

    fn smart_reason(&self, m: &TextMetrics) -> Option<OcrReason> {
        let t = &self.thresholds;
        if m.char_count < t.min_chars {
            Some(OcrReason::TooFewChars)
        } else if m.density < t.min_density {
            Some(OcrReason::LowDensity)
        } else if m.valid_ratio < t.min_valid_ratio {
            Some(OcrReason::Garbled)
        } else if m.artifact_ratio > t.max_artifact_ratio {
            Some(OcrReason::Artifacts)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smart() -> ExtractionStrategy {
        ExtractionStrategy::new(StrategyMode::Smart, DetectionThresholds::default())
    }

    fn arabic_paragraph() -> String {
        "هذا نص عربي طويل بما يكفي لاعتباره طبقة نصية صالحة في الصفحة. ".repeat(2)
    }

    #[test]
    fn test_text_page_uses_embedded_text() {
        let page = Page::a4(1).with_text(arabic_paragraph());
        let decision = smart().decide(&page);
        assert!(!decision.needs_ocr);
        assert_eq!(decision.reason, None);
        assert!(decision.metrics.valid_ratio > 0.99);
    }

    #[test]
    fn test_image_only_page_needs_ocr() {
        let page = Page::a4(1).with_images(1);
        let decision = smart().decide(&page);
        assert!(decision.needs_ocr);
        assert_eq!(decision.reason, Some(OcrReason::TooFewChars));
    }

    #[test]
    fn test_low_density() {
        let page = Page::new(1, 3000.0, 3000.0).with_text(arabic_paragraph());
        assert_eq!(smart().decide(&page).reason, Some(OcrReason::LowDensity));
    }

    #[test]
    fn test_garbled_text() {
        let page = Page::a4(1).with_text("§¤¥¦¨©ª«¬®¯°±²³´µ¶·¸¹º»¼½¾¿ÀÁÂÃÄÅÆÇÈÉÊËÌÍÎÏÐÑÒÓÔÕÖ×ØÙÚÛÜ");
        assert_eq!(smart().decide(&page).reason, Some(OcrReason::Garbled));
    }

    #[test]
    fn test_artifacts() {
        let text = format!("{}{}", arabic_paragraph(), "\u{FFFD}".repeat(10));
        let page = Page::a4(1).with_text(text);
        assert_eq!(smart().decide(&page).reason, Some(OcrReason::Artifacts));
    }

    #[test]
    fn test_rule_order_prefers_char_count() {
        let page = Page::a4(1).with_text("\u{FFFD}\u{FFFD}");
        assert_eq!(smart().decide(&page).reason, Some(OcrReason::TooFewChars));
    }

    #[test]
    fn test_direct_and_ocr_modes() {
        let page = Page::a4(3).with_images(1);
        let direct = ExtractionStrategy::new(StrategyMode::Direct, DetectionThresholds::default());
        assert!(!direct.decide(&page).needs_ocr);

        let page = Page::a4(3).with_text(arabic_paragraph());
        let ocr = ExtractionStrategy::new(StrategyMode::Ocr, DetectionThresholds::default());
        let decision = ocr.decide(&page);
        assert!(decision.needs_ocr);
        assert_eq!(decision.reason, Some(OcrReason::Forced));
        assert_eq!(decision.page, 3);
    }

    #[test]
    fn test_custom_threshold() {
        let strategy = ExtractionStrategy::new(
            StrategyMode::Smart,
            DetectionThresholds::default()
                .with_min_chars(5)
                .with_min_density(0.1),
        );
        let page = Page::a4(1).with_text("بسم الله");
        assert!(!strategy.decide(&page).needs_ocr);
    }
}
