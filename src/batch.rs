//! Directory batch processing.
//!
//! Every PDF under an input directory is extracted and written to the
//! output directory, mirroring the input's subdirectories. Files are
//! independent: a corrupt PDF or an unwritable result is recorded in the
//! [`BatchReport`] and the run continues.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::output::ResultWriter;
use crate::pipeline::Extractor;

/// Find all PDF files under `dir`, sorted by path.
pub fn find_pdfs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory not found: {}", dir.display()),
        )));
    }

    let mut pdfs: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    pdfs.sort();
    Ok(pdfs)
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Input PDF
    pub input: PathBuf,
    /// Written JSON file, when successful
    pub output: Option<PathBuf>,
    /// Pages processed
    pub pages: usize,
    /// Pages taken from the text layer
    pub embedded_pages: usize,
    /// Pages recognized by OCR
    pub ocr_pages: usize,
    /// Pages with no text and an error
    pub failed_pages: usize,
    /// Characters extracted
    pub characters: usize,
    /// File-level error
    pub error: Option<String>,
    /// Wall-clock time for this file
    pub processing_time_ms: u64,
}

impl FileOutcome {
    /// Whether the file produced an output.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Per-file outcomes, sorted by input path
    pub files: Vec<FileOutcome>,
    pub total_time_ms: u64,
}

impl BatchReport {
    /// Number of files found.
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Files that produced an output.
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    /// Files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_success())
    }

    /// Total pages across successful files.
    pub fn total_pages(&self) -> usize {
        self.files.iter().map(|f| f.pages).sum()
    }

    /// Total OCR pages across successful files.
    pub fn total_ocr_pages(&self) -> usize {
        self.files.iter().map(|f| f.ocr_pages).sum()
    }

    /// Total characters across successful files.
    pub fn total_characters(&self) -> usize {
        self.files.iter().map(|f| f.characters).sum()
    }
}

/// Runs an [`Extractor`] over a directory tree.
pub struct BatchRunner<'a> {
    extractor: &'a Extractor,
    writer: &'a ResultWriter,
}

impl<'a> BatchRunner<'a> {
    /// Create a runner.
    pub fn new(extractor: &'a Extractor, writer: &'a ResultWriter) -> Self {
        Self { extractor, writer }
    }

    /// Process every PDF under `input_dir`.
    pub fn run<P: AsRef<Path>>(&self, input_dir: P) -> Result<BatchReport> {
        self.run_with_progress(input_dir, |_| {})
    }

    /// Process every PDF under `input_dir`, calling `on_file` as each one finishes.
    pub fn run_with_progress<P, F>(&self, input_dir: P, on_file: F) -> Result<BatchReport>
    where
        P: AsRef<Path>,
        F: Fn(&FileOutcome) + Sync,
    {
        let input_dir = input_dir.as_ref();
        let pdfs = find_pdfs(input_dir)?;
        log::info!(
            "Found {} PDF files in {}",
            pdfs.len(),
            input_dir.display()
        );
        Ok(self.run_files(input_dir, &pdfs, on_file))
    }

    /// Process `pdfs`, a list already collected from `input_dir` with
    /// [`find_pdfs`]. Output paths mirror each file's place under `input_dir`.
    pub fn run_files<F>(&self, input_dir: &Path, pdfs: &[PathBuf], on_file: F) -> BatchReport
    where
        F: Fn(&FileOutcome) + Sync,
    {
        let start = Instant::now();

        let process = |path: &PathBuf| {
            let outcome = self.process_file(path, input_dir);
            on_file(&outcome);
            outcome
        };

        let mut files: Vec<FileOutcome> = if self.extractor.config().parallel {
            pdfs.par_iter().map(process).collect()
        } else {
            pdfs.iter().map(process).collect()
        };
        files.sort_by(|a, b| a.input.cmp(&b.input));

        let report = BatchReport {
            input_dir: input_dir.to_path_buf(),
            output_dir: self.writer.output_dir().to_path_buf(),
            files,
            total_time_ms: start.elapsed().as_millis() as u64,
        };

        log::info!(
            "Batch finished: {}/{} files, {} pages ({} OCR)",
            report.succeeded(),
            report.total(),
            report.total_pages(),
            report.total_ocr_pages()
        );
        report
    }

    fn process_file(&self, path: &Path, input_root: &Path) -> FileOutcome {
        let start = Instant::now();
        let mut outcome = FileOutcome {
            input: path.to_path_buf(),
            output: None,
            pages: 0,
            embedded_pages: 0,
            ocr_pages: 0,
            failed_pages: 0,
            characters: 0,
            error: None,
            processing_time_ms: 0,
        };

        let result = self.extractor.extract_file(path).and_then(|doc| {
            let written = self.writer.write(&doc, Some(input_root))?;
            Ok((doc, written))
        });

        match result {
            Ok((doc, written)) => {
                outcome.output = Some(written);
                outcome.pages = doc.page_count();
                outcome.embedded_pages = doc.embedded_pages();
                outcome.ocr_pages = doc.ocr_pages();
                outcome.failed_pages = doc.failed_pages();
                outcome.characters = doc.char_count();
            }
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome.processing_time_ms = start.elapsed().as_millis() as u64;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_pdfs_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("sub/A.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("sub/deeper/c.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let pdfs = find_pdfs(dir.path()).unwrap();
        assert_eq!(pdfs.len(), 3);
        assert!(pdfs.windows(2).all(|w| w[0] <= w[1]));
        assert!(pdfs.iter().all(|p| p.extension().is_some()));
    }

    #[test]
    fn test_find_pdfs_missing_dir() {
        assert!(matches!(
            find_pdfs("/nonexistent/arpdf/input"),
            Err(Error::Io(_))
        ));
    }
}
