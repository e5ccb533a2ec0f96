//! Legal-document classification for the structured output.
//!
//! A lightweight keyword classifier over the normalized document text. It
//! counts Arabic legal terms per document type, counts numbered articles,
//! looks for Hijri or Gregorian dates and keeps the first few sentences as
//! key patterns.

use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::normalize::TextNormalizer;

/// Sentences considered for key patterns.
const KEY_PATTERN_SENTENCES: usize = 5;
/// Minimum trimmed length of a key pattern sentence.
const KEY_PATTERN_MIN_CHARS: usize = 10;
/// Key patterns are cut to this many characters.
const KEY_PATTERN_MAX_CHARS: usize = 100;
/// Term count at which confidence saturates.
const CONFIDENCE_SATURATION: f32 = 10.0;

const ARTICLE_TERM: &str = "مادة";

/// Kind of legal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Regulation,
    CourtRuling,
    Contract,
    LawArticle,
    JudicialCollection,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Regulation => "regulation",
            DocumentType::CourtRuling => "court_ruling",
            DocumentType::Contract => "contract",
            DocumentType::LawArticle => "law_article",
            DocumentType::JudicialCollection => "judicial_collection",
            DocumentType::Unknown => "unknown",
        }
    }

    /// Indicator terms, in the order types are checked.
    fn terms() -> [(DocumentType, &'static [&'static str]); 5] {
        [
            (DocumentType::Regulation, &["نظام", "لائحة", "قانون", "تنظيم"]),
            (DocumentType::CourtRuling, &["حكم", "قرار", "محكمة", "قضية", "دعوى"]),
            (DocumentType::Contract, &["عقد", "اتفاقية", "مقاولة", "شراكة"]),
            (DocumentType::LawArticle, &["مادة", "فقرة", "بند", "فصل"]),
            (
                DocumentType::JudicialCollection,
                &["مجموعة", "أحكام", "قضائية", "سابقة"],
            ),
        ]
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentAnalysis {
    pub document_type: DocumentType,
    pub confidence: f32,
    pub key_patterns: Vec<String>,
    pub legal_terms_found: Vec<String>,
    pub article_count: usize,
    pub contains_dates: bool,
}

impl Default for DocumentAnalysis {
    fn default() -> Self {
        Self {
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            key_patterns: Vec::new(),
            legal_terms_found: Vec::new(),
            article_count: 0,
            contains_dates: false,
        }
    }
}

struct TermSet {
    doc_type: DocumentType,
    /// (term as listed, spellings to search for)
    terms: Vec<(&'static str, Vec<String>)>,
}

/// Keyword classifier for Arabic legal documents.
pub struct DocumentAnalyzer {
    term_sets: Vec<TermSet>,
    article_re: Regex,
    date_re: Regex,
}

impl DocumentAnalyzer {
    /// Build an analyzer whose term lists match text produced by `normalizer`.
    ///
    /// Every term is searched both as listed and in its normalized spelling,
    /// so analysis works on raw and normalized text alike.
    pub fn new(normalizer: &TextNormalizer) -> Result<Self> {
        let spellings = |term: &str| {
            let mut forms = vec![term.to_string()];
            let normalized = normalizer.normalize(term);
            if !normalized.is_empty() && normalized != term {
                forms.push(normalized);
            }
            forms
        };

        let term_sets = DocumentType::terms()
            .into_iter()
            .map(|(doc_type, terms)| TermSet {
                doc_type,
                terms: terms.iter().map(|&t| (t, spellings(t))).collect(),
            })
            .collect();

        let article_alternatives = spellings(ARTICLE_TERM)
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let article_re = Regex::new(&format!(r"(?:{})\s*(\d+)", article_alternatives))
            .map_err(|e| Error::Config(format!("article pattern: {}", e)))?;

        // Tatweel in "هـ" may already be stripped by the normalizer.
        let date_re = Regex::new(r"\d{4}/\d{1,2}/\d{1,2}|\d{4}\s*هـ?|\d{4}\s*م")
            .map_err(|e| Error::Config(format!("date pattern: {}", e)))?;

        Ok(Self {
            term_sets,
            article_re,
            date_re,
        })
    }

    /// Analyze text.
    pub fn analyze(&self, text: &str) -> DocumentAnalysis {
        let mut analysis = DocumentAnalysis::default();
        if text.trim().is_empty() {
            return analysis;
        }

        let text_lower = text.to_lowercase();
        let mut max_count = 0usize;

        for set in &self.term_sets {
            let mut count = 0usize;
            for (term, forms) in &set.terms {
                let hits: usize = forms.iter().map(|f| text_lower.matches(f.as_str()).count()).sum();
                if hits > 0 {
                    analysis.legal_terms_found.push(term.to_string());
                }
                count += hits;
            }
            if count > max_count {
                max_count = count;
                analysis.document_type = set.doc_type;
            }
        }

        analysis.confidence = (max_count as f32 / CONFIDENCE_SATURATION).min(1.0);
        analysis.article_count = self.article_re.captures_iter(text).count();
        analysis.contains_dates = self.date_re.is_match(text);
        analysis.key_patterns = key_patterns(text);
        analysis
    }
}

fn key_patterns(text: &str) -> Vec<String> {
    text.split('.')
        .take(KEY_PATTERN_SENTENCES)
        .map(str::trim)
        .filter(|s| s.chars().count() > KEY_PATTERN_MIN_CHARS)
        .map(|s| s.chars().take(KEY_PATTERN_MAX_CHARS).collect())
        .collect()
}
