//! Tesseract OCR backend implementation.
//!
//! Runs the `tesseract` CLI with TSV output so that word confidences come
//! back alongside the text. The backend only counts as available when the
//! traineddata for every configured language is installed.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Instant;

use super::backend::{Language, OcrBackend, OcrBackendType, OcrConfig, OcrError, Recognition};
use super::util::check_binary;
use crate::model::PageImage;

const TSV_COLUMNS: usize = 12;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    command: PathBuf,
    psm: u8,
    oem: u8,
    languages: Vec<Language>,
    installed: OnceLock<Option<Vec<String>>>,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self::with_config(&OcrConfig::default())
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: &OcrConfig) -> Self {
        Self {
            command: config
                .tesseract_cmd
                .clone()
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            psm: config.psm,
            oem: config.oem,
            languages: config.languages.clone(),
            installed: OnceLock::new(),
        }
    }

    /// Executable this backend runs.
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Languages reported by `tesseract --list-langs`, or `None` when the
    /// binary is missing or the list could not be read.
    pub fn installed_languages(&self) -> Option<&[String]> {
        self.installed
            .get_or_init(|| {
                if !check_binary(&self.command) {
                    return None;
                }
                match Command::new(&self.command).arg("--list-langs").output() {
                    Ok(output) if output.status.success() => {
                        // Older releases print the list on stderr.
                        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                        text.push('\n');
                        text.push_str(&String::from_utf8_lossy(&output.stderr));
                        Some(parse_language_list(&text))
                    }
                    Ok(output) => {
                        log::warn!("tesseract --list-langs exited with {}", output.status);
                        None
                    }
                    Err(e) => {
                        log::warn!("Could not list tesseract languages: {}", e);
                        None
                    }
                }
            })
            .as_deref()
    }

    /// Traineddata codes for `languages` that are not installed.
    ///
    /// Empty when the installed list could not be read.
    pub fn missing_languages(&self, languages: &[Language]) -> Vec<&'static str> {
        let Some(installed) = self.installed_languages() else {
            return Vec::new();
        };
        let wanted = if languages.is_empty() {
            &[Language::Arabic, Language::English][..]
        } else {
            languages
        };
        wanted
            .iter()
            .map(|l| l.tesseract_code())
            .filter(|code| !installed.iter().any(|i| i == code))
            .collect()
    }

    fn missing_language_hint(missing: &[&str]) -> String {
        let packages = missing
            .iter()
            .map(|code| format!("tesseract-ocr-{}", code))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "Tesseract is missing language data for {}. Install with: apt install {}",
            missing.join(", "),
            packages
        )
    }

    fn run_tesseract(&self, image_path: &Path, languages: &[Language]) -> Result<String, OcrError> {
        let langs = tesseract_languages(languages);
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &langs])
            .args(["--psm", &self.psm.to_string()])
            .args(["--oem", &self.oem.to_string()])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.command.display()
                )))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.command) && self.missing_languages(&self.languages).is_empty()
    }

    fn availability_hint(&self) -> String {
        if !check_binary(&self.command) {
            return "Tesseract not installed. Install with: apt install tesseract-ocr tesseract-ocr-ara"
                .to_string();
        }
        let missing = self.missing_languages(&self.languages);
        if !missing.is_empty() {
            return Self::missing_language_hint(&missing);
        }
        match self.installed_languages() {
            Some(installed) => format!("Tesseract is available ({})", installed.join(", ")),
            None => "Tesseract is available (language list unknown)".to_string(),
        }
    }

    fn recognize(&self, image: &PageImage, languages: &[Language]) -> Result<Recognition, OcrError> {
        let missing = self.missing_languages(languages);
        if !missing.is_empty() {
            return Err(OcrError::BackendNotAvailable(Self::missing_language_hint(
                &missing,
            )));
        }

        let start = Instant::now();
        let tsv = self.run_tesseract(image.path(), languages)?;
        let parsed = parse_tsv(&tsv)?;

        log::debug!(
            "tesseract page {}: {} words, confidence {:?}",
            image.page(),
            parsed.words,
            parsed.confidence
        );

        Ok(Recognition {
            text: parsed.text,
            confidence: parsed.confidence,
            backend: OcrBackendType::Tesseract,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Join language codes the way `-l` expects them (e.g. "ara+eng").
pub fn tesseract_languages(languages: &[Language]) -> String {
    if languages.is_empty() {
        return "ara+eng".to_string();
    }
    languages
        .iter()
        .map(|l| l.tesseract_code())
        .collect::<Vec<_>>()
        .join("+")
}

/// Read language codes from `tesseract --list-langs` output.
pub fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of") && !l.contains(' '))
        .map(str::to_string)
        .collect()
}

/// Text and mean word confidence read from Tesseract TSV output.
#[derive(Debug, Clone, PartialEq)]
pub struct TsvText {
    pub text: String,
    pub confidence: Option<f32>,
    pub words: usize,
}

/// Parse Tesseract TSV output.
///
/// Words are joined with spaces within a line and lines with newlines.
/// Confidence is the mean of word confidences above zero, scaled to 0..=1.
pub fn parse_tsv(tsv: &str) -> Result<TsvText, OcrError> {
    let mut lines = tsv.lines();
    match lines.next() {
        Some(header) if header.starts_with("level") => {}
        Some(header) => {
            return Err(OcrError::InvalidOutput(format!(
                "unexpected TSV header: {}",
                header
            )))
        }
        None => {
            return Ok(TsvText {
                text: String::new(),
                confidence: None,
                words: 0,
            })
        }
    }

    let mut text_lines: Vec<String> = Vec::new();
    let mut current_key: Option<(u32, u32, u32)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;
    let mut words = 0usize;

    for row in lines {
        let cols: Vec<&str> = row.splitn(TSV_COLUMNS, '\t').collect();
        if cols.len() < TSV_COLUMNS || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let key = (num(2), num(3), num(4));
        if current_key != Some(key) || text_lines.is_empty() {
            text_lines.push(String::new());
            current_key = Some(key);
        }
        if let Some(line) = text_lines.last_mut() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        words += 1;

        if let Ok(conf) = cols[10].trim().parse::<f32>() {
            if conf > 0.0 {
                conf_sum += conf / 100.0;
                conf_count += 1;
            }
        }
    }

    Ok(TsvText {
        text: text_lines.join("\n"),
        confidence: (conf_count > 0).then(|| conf_sum / conf_count as f32),
        words,
    })
}
