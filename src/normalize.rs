//! Arabic text normalization.
//!
//! The normalizer canonicalizes text coming out of the PDF text layer or an
//! OCR engine so that the same word is always spelled with the same code
//! points. Every step is a pure character mapping or whitespace rewrite, and
//! the steps run in a fixed order that makes the whole pass idempotent.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Normalization preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizePreset {
    /// Unicode NFC and whitespace only
    Minimal,
    /// Alef forms, Persian letter variants, diacritics, tatweel
    #[default]
    Standard,
    /// Standard plus taa marbuta, yeh, punctuation and Western digits
    Aggressive,
}

impl std::str::FromStr for NormalizePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(format!("unknown cleanup preset: {}", s)),
        }
    }
}

/// How whitespace is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    /// Every whitespace run becomes one space; lines are joined
    #[default]
    Flatten,
    /// Collapse spaces within lines, keep at most one blank line
    Lines,
    /// Leave whitespace untouched
    Preserve,
}

/// Target form for digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitStyle {
    /// Leave digits as found
    #[default]
    Keep,
    /// 0-9
    Western,
    /// ٠-٩
    ArabicIndic,
}

impl std::str::FromStr for DigitStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "western" => Ok(Self::Western),
            "arabic-indic" | "arabic_indic" | "eastern" => Ok(Self::ArabicIndic),
            _ => Err(format!("unknown digit style: {}", s)),
        }
    }
}

/// Switches for each normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Apply Unicode NFC composition
    pub unicode_nfc: bool,

    /// Keheh → Kaf, Farsi Yeh → Yeh
    pub unify_persian: bool,

    /// أ إ آ ٱ → ا
    pub unify_alef: bool,

    /// ة → ه
    pub taa_marbuta_to_heh: bool,

    /// ي → ى
    pub yeh_to_alef_maksura: bool,

    /// Remove harakat, tanween and superscript alef
    pub strip_diacritics: bool,

    /// Remove tatweel (kashida)
    pub strip_tatweel: bool,

    /// Arabic full stop and question marks → '.'
    pub normalize_punctuation: bool,

    /// Digit form
    pub digits: DigitStyle,

    /// Whitespace handling
    pub whitespace: WhitespaceMode,
}

impl NormalizeOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: NormalizePreset) -> Self {
        match preset {
            NormalizePreset::Minimal => Self::minimal(),
            NormalizePreset::Standard => Self::standard(),
            NormalizePreset::Aggressive => Self::aggressive(),
        }
    }

    /// Minimal options.
    pub fn minimal() -> Self {
        Self {
            unicode_nfc: true,
            unify_persian: false,
            unify_alef: false,
            taa_marbuta_to_heh: false,
            yeh_to_alef_maksura: false,
            strip_diacritics: false,
            strip_tatweel: false,
            normalize_punctuation: false,
            digits: DigitStyle::Keep,
            whitespace: WhitespaceMode::Flatten,
        }
    }

    /// Standard options.
    pub fn standard() -> Self {
        Self {
            unify_persian: true,
            unify_alef: true,
            strip_diacritics: true,
            strip_tatweel: true,
            ..Self::minimal()
        }
    }

    /// Aggressive options, matching the spelling used for search indexes.
    pub fn aggressive() -> Self {
        Self {
            taa_marbuta_to_heh: true,
            yeh_to_alef_maksura: true,
            normalize_punctuation: true,
            digits: DigitStyle::Western,
            ..Self::standard()
        }
    }

    /// Set digit style.
    pub fn with_digits(mut self, digits: DigitStyle) -> Self {
        self.digits = digits;
        self
    }

    /// Set whitespace mode.
    pub fn with_whitespace(mut self, whitespace: WhitespaceMode) -> Self {
        self.whitespace = whitespace;
        self
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::standard()
    }
}

const TATWEEL: char = '\u{0640}';
const SUPERSCRIPT_ALEF: char = '\u{0670}';

fn is_diacritic(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}') || c == SUPERSCRIPT_ALEF
}

/// Applies [`NormalizeOptions`] to text.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    options: NormalizeOptions,
}

impl TextNormalizer {
    /// Create a normalizer with the given options.
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Create a normalizer from a preset.
    pub fn from_preset(preset: NormalizePreset) -> Self {
        Self::new(NormalizeOptions::from_preset(preset))
    }

    /// Options in effect.
    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize text.
    pub fn normalize(&self, text: &str) -> String {
        let o = &self.options;

        // Tatweel is a starter and blocks composition, so it goes before NFC.
        let text: String = if o.strip_tatweel {
            text.chars().filter(|&c| c != TATWEEL).collect()
        } else {
            text.to_string()
        };

        let composed: String = if o.unicode_nfc {
            text.nfc().collect()
        } else {
            text
        };

        let mut mapped = self.map_chars(&composed);

        // A mapped letter can compose with the mark after it, and the
        // composed letter can map again. Each round that composes shrinks
        // the text, so this terminates.
        if o.unicode_nfc {
            loop {
                let recomposed: String = mapped.nfc().collect();
                if recomposed == mapped {
                    break;
                }
                mapped = self.map_chars(&recomposed);
            }
        }

        match self.options.whitespace {
            WhitespaceMode::Flatten => flatten_whitespace(&mapped),
            WhitespaceMode::Lines => collapse_lines(&mapped),
            WhitespaceMode::Preserve => mapped,
        }
    }

    fn map_chars(&self, text: &str) -> String {
        text.chars().filter_map(|c| self.map_char(c)).collect()
    }

    // Persian variants are unified before yeh → alef maksura so that
    // Farsi Yeh ends in the same place on the first and second pass.
    fn map_char(&self, c: char) -> Option<char> {
        let o = &self.options;

        if o.strip_diacritics && is_diacritic(c) {
            return None;
        }

        let c = if o.unify_persian {
            match c {
                '\u{06A9}' => '\u{0643}', // ک → ك
                '\u{06CC}' => '\u{064A}', // ی → ي
                _ => c,
            }
        } else {
            c
        };

        let c = match c {
            '\u{0623}' | '\u{0625}' | '\u{0622}' | '\u{0671}' if o.unify_alef => '\u{0627}',
            '\u{0629}' if o.taa_marbuta_to_heh => '\u{0647}',
            '\u{064A}' if o.yeh_to_alef_maksura => '\u{0649}',
            '\u{06D4}' | '\u{060D}' | '\u{060E}' | '\u{060F}' | '\u{061E}' | '\u{061F}'
                if o.normalize_punctuation =>
            {
                '.'
            }
            _ => c,
        };

        Some(match o.digits {
            DigitStyle::Keep => c,
            DigitStyle::Western => to_western_digit(c),
            DigitStyle::ArabicIndic => to_arabic_indic_digit(c),
        })
    }
}

fn to_western_digit(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => shift_digit(c, 0x0660, '0' as u32),
        '\u{06F0}'..='\u{06F9}' => shift_digit(c, 0x06F0, '0' as u32),
        _ => c,
    }
}

fn to_arabic_indic_digit(c: char) -> char {
    match c {
        '0'..='9' => shift_digit(c, '0' as u32, 0x0660),
        '\u{06F0}'..='\u{06F9}' => shift_digit(c, 0x06F0, 0x0660),
        _ => c,
    }
}

fn shift_digit(c: char, from: u32, to: u32) -> char {
    char::from_u32(c as u32 - from + to).unwrap_or(c)
}

fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collapse_lines(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = flatten_whitespace(line);
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
