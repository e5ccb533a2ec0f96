//! Batch processing over directory trees.

mod common;

use arpdf::{
    find_pdfs, BatchRunner, ExtractConfig, Extractor, JsonFormat, OutputMode, ResultWriter,
    StrategyMode,
};
use common::{write_pdf, CountingOcr, FakeRenderer, PageSpec, TEXT_LINE};
use walkdir::WalkDir;

fn extractor(config: ExtractConfig) -> Extractor {
    let (ocr, _) = CountingOcr::new();
    Extractor::with_parts(config, Box::new(FakeRenderer), Box::new(ocr))
}

fn writer(ex: &Extractor, dir: &std::path::Path, mode: OutputMode) -> ResultWriter {
    ResultWriter::new(dir, mode, JsonFormat::Pretty, ex.normalizer()).unwrap()
}

fn json_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_batch_writes_one_file_per_pdf() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for i in 0..4 {
        write_pdf(
            input.path(),
            &format!("doc{}.pdf", i),
            &[PageSpec::Text(TEXT_LINE), PageSpec::Scanned],
        );
    }

    let ex = extractor(ExtractConfig::default());
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let report = BatchRunner::new(&ex, &w).run(input.path()).unwrap();

    assert_eq!(report.total(), 4);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failures().count(), 0);
    assert_eq!(report.total_pages(), 8);
    assert_eq!(report.total_ocr_pages(), 4);
    assert_eq!(json_files(output.path()).len(), 4);
    assert!(output.path().join("doc0_extracted.json").exists());
}

#[test]
fn test_batch_records_corrupt_files_and_continues() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for i in 0..3 {
        write_pdf(input.path(), &format!("good{}.pdf", i), &[PageSpec::Text(TEXT_LINE)]);
    }
    std::fs::write(input.path().join("broken.pdf"), b"%PDF-1.4\n%%garbage").unwrap();
    std::fs::write(input.path().join("fake.pdf"), b"definitely not a pdf file").unwrap();

    let ex = extractor(ExtractConfig::default().sequential());
    let w = writer(&ex, output.path(), OutputMode::Structured);
    let report = BatchRunner::new(&ex, &w).run(input.path()).unwrap();

    assert_eq!(report.total(), 5);
    assert_eq!(report.succeeded(), 3);

    let failed: Vec<_> = report
        .failures()
        .map(|f| f.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, vec!["broken.pdf", "fake.pdf"]);
    assert!(report.failures().all(|f| f.error.is_some() && f.output.is_none()));

    let outputs = json_files(output.path());
    assert_eq!(outputs.len(), 3);
    assert!(outputs
        .iter()
        .all(|p| p.to_string_lossy().ends_with("_structured.json")));
}

#[test]
fn test_batch_mirrors_subdirectories() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "top.pdf", &[PageSpec::Text(TEXT_LINE)]);
    write_pdf(input.path(), "laws/2023/decree.pdf", &[PageSpec::Text(TEXT_LINE)]);

    let ex = extractor(ExtractConfig::default().with_strategy(StrategyMode::Direct));
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let report = BatchRunner::new(&ex, &w).run(input.path()).unwrap();

    assert_eq!(report.succeeded(), 2);
    assert!(output.path().join("top_extracted.json").exists());
    assert!(output
        .path()
        .join("laws/2023/decree_extracted.json")
        .exists());
}

#[test]
fn test_batch_progress_callback_sees_every_file() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    for i in 0..5 {
        write_pdf(input.path(), &format!("{}.pdf", i), &[PageSpec::Text(TEXT_LINE)]);
    }

    let ex = extractor(ExtractConfig::default());
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let seen = std::sync::atomic::AtomicUsize::new(0);
    let report = BatchRunner::new(&ex, &w)
        .run_with_progress(input.path(), |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(seen.into_inner(), 5);
    assert!(report.files.windows(2).all(|w| w[0].input <= w[1].input));
}

#[test]
fn test_batch_runs_the_listed_files_only() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "first.pdf", &[PageSpec::Text(TEXT_LINE)]);
    write_pdf(input.path(), "sub/second.pdf", &[PageSpec::Text(TEXT_LINE)]);

    let pdfs = find_pdfs(input.path()).unwrap();
    // appears after the listing, so the run must not pick it up
    write_pdf(input.path(), "late.pdf", &[PageSpec::Text(TEXT_LINE)]);

    let ex = extractor(ExtractConfig::default().sequential());
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let report = BatchRunner::new(&ex, &w).run_files(input.path(), &pdfs, |_| {});

    assert_eq!(report.total(), pdfs.len());
    assert_eq!(report.succeeded(), 2);
    assert!(output.path().join("sub/second_extracted.json").exists());
    assert!(!output.path().join("late_extracted.json").exists());
}

#[test]
fn test_batch_same_stem_pdfs_do_not_overwrite() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_pdf(input.path(), "a.pdf", &[PageSpec::Text(TEXT_LINE)]);
    write_pdf(input.path(), "a.PDF", &[PageSpec::Text(TEXT_LINE)]);
    if find_pdfs(input.path()).unwrap().len() < 2 {
        // case-insensitive filesystem
        return;
    }

    let ex = extractor(ExtractConfig::default());
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let report = BatchRunner::new(&ex, &w).run(input.path()).unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(json_files(output.path()).len(), 2);
    assert!(output.path().join("a_pdf_extracted.json").exists());
    assert!(output.path().join("a_PDF_extracted.json").exists());
}

#[test]
fn test_batch_empty_and_missing_directories() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let ex = extractor(ExtractConfig::default());
    let w = writer(&ex, output.path(), OutputMode::Simple);
    let runner = BatchRunner::new(&ex, &w);

    let report = runner.run(input.path()).unwrap();
    assert_eq!(report.total(), 0);
    assert!(runner.run(input.path().join("nope")).is_err());
}
