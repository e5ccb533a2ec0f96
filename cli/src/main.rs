//! arpdf CLI - Arabic/English PDF text extraction tool

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use arpdf::ocr::{check_pdftoppm_hint, create_backend_of};
use arpdf::{
    classify_document, compare_backends, BatchRunner, DigitStyle, Extractor, ExtractConfig,
    JsonFormat, Language, NormalizePreset, OcrBackendType, OutputMode, PageSelection, PdfLoader,
    PdfSource, ResultWriter, StrategyMode,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "arpdf")]
#[command(version)]
#[command(about = "Extract Arabic/English PDF text to JSON with a smart OCR fallback", long_about = None)]
struct Cli {
    /// Input PDF file (shorthand for `arpdf extract FILE`)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one PDF to JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", env = "ARPDF_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Print the JSON instead of writing a file
        #[arg(long)]
        stdout: bool,

        #[command(flatten)]
        options: ExtractArgs,
    },

    /// Extract every PDF under a directory
    Batch {
        /// Input directory
        #[arg(value_name = "INPUT_DIR", default_value = "data")]
        input: PathBuf,

        /// Output directory [default: results or structured_results]
        #[arg(value_name = "OUTPUT_DIR", env = "ARPDF_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Process files one at a time
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        options: ExtractArgs,
    },

    /// Run several OCR backends on the same pages and rank them
    Compare {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to compare (e.g., "1,2,3"; all if not specified)
        #[arg(long)]
        pages: Option<String>,

        /// Backends to compare (e.g., "tesseract,paddleocr"; all if not specified)
        #[arg(long)]
        backends: Option<String>,

        /// Directory for the comparison report
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Classify a PDF as text or scanned and show per-page decisions
    Detect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Check external tools and OCR engines
    Check {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Show version information
    Version,
}

/// Options shared by `extract` and `batch`.
#[derive(Args, Default)]
struct ExtractArgs {
    /// Output JSON shape
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Page routing strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Text cleanup preset
    #[arg(long, value_enum)]
    cleanup: Option<CleanupLevel>,

    /// Digit style
    #[arg(long, value_enum)]
    digits: Option<DigitsArg>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

/// OCR engine options.
#[derive(Args, Default)]
struct EngineArgs {
    /// OCR backend (paddleocr, tesseract, easyocr, trocr)
    #[arg(long, env = "ARPDF_BACKEND")]
    backend: Option<OcrBackendType>,

    /// OCR languages (e.g., "ar,en")
    #[arg(long, value_name = "LANGS")]
    lang: Option<String>,

    /// Render resolution for OCR pages
    #[arg(long)]
    dpi: Option<u32>,

    /// Tesseract executable
    #[arg(long, value_name = "PATH", env = "TESSERACT_CMD")]
    tesseract_cmd: Option<PathBuf>,

    /// Python interpreter for PaddleOCR, EasyOCR and TrOCR
    #[arg(long, value_name = "PATH", env = "ARPDF_PYTHON")]
    python: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// {filename, text}
    Simple,
    /// {metadata, document_info, content, analysis}
    Structured,
}

impl From<FormatArg> for OutputMode {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Simple => OutputMode::Simple,
            FormatArg::Structured => OutputMode::Structured,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Embedded text, OCR only where it looks unusable (default)
    Smart,
    /// Embedded text only
    Direct,
    /// OCR every page
    Ocr,
}

impl From<StrategyArg> for StrategyMode {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Smart => StrategyMode::Smart,
            StrategyArg::Direct => StrategyMode::Direct,
            StrategyArg::Ocr => StrategyMode::Ocr,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// Unicode NFC and whitespace only
    Minimal,
    /// Alef forms, Persian letters, diacritics and tatweel (default)
    Standard,
    /// Standard plus taa marbuta, yeh, punctuation and Western digits
    Aggressive,
}

impl From<CleanupLevel> for NormalizePreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => NormalizePreset::Minimal,
            CleanupLevel::Standard => NormalizePreset::Standard,
            CleanupLevel::Aggressive => NormalizePreset::Aggressive,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DigitsArg {
    /// Leave digits as they are
    Keep,
    /// 0-9
    Western,
    /// ٠-٩
    ArabicIndic,
}

impl From<DigitsArg> for DigitStyle {
    fn from(digits: DigitsArg) -> Self {
        match digits {
            DigitsArg::Keep => DigitStyle::Keep,
            DigitsArg::Western => DigitStyle::Western,
            DigitsArg::ArabicIndic => DigitStyle::ArabicIndic,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_file = cli.config.as_deref();
    let result = match cli.command {
        Some(Commands::Extract {
            input,
            output,
            stdout,
            options,
        }) => cmd_extract(&input, output.as_deref(), stdout, &options, config_file),
        Some(Commands::Batch {
            input,
            output,
            sequential,
            options,
        }) => cmd_batch(&input, output.as_deref(), sequential, &options, config_file),
        Some(Commands::Compare {
            input,
            pages,
            backends,
            output,
            engine,
        }) => cmd_compare(
            &input,
            pages.as_deref(),
            backends.as_deref(),
            output.as_deref(),
            &engine,
            config_file,
        ),
        Some(Commands::Detect { input }) => cmd_detect(&input, config_file),
        Some(Commands::Check { engine }) => cmd_check(&engine, config_file),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: extract if input is provided
            if let Some(input) = cli.input {
                cmd_extract(&input, None, false, &ExtractArgs::default(), config_file)
            } else {
                println!("{}", "Usage: arpdf <FILE>".yellow());
                println!("       arpdf --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_config(config_file: Option<&Path>) -> Result<ExtractConfig, Box<dyn std::error::Error>> {
    Ok(match config_file {
        Some(path) => ExtractConfig::from_file(path)?,
        None => ExtractConfig::default(),
    })
}

impl EngineArgs {
    fn apply(&self, mut config: ExtractConfig) -> Result<ExtractConfig, Box<dyn std::error::Error>> {
        if let Some(backend) = self.backend {
            config = config.with_backend(backend);
        }
        if let Some(ref lang) = self.lang {
            config = config.with_languages(Language::parse_list(lang)?);
        }
        if let Some(dpi) = self.dpi {
            config.ocr = config.ocr.with_dpi(dpi);
        }
        if let Some(ref cmd) = self.tesseract_cmd {
            config.ocr = config.ocr.with_tesseract_cmd(cmd);
        }
        if let Some(ref python) = self.python {
            config.ocr = config.ocr.with_python(python);
        }
        Ok(config)
    }
}

impl ExtractArgs {
    fn apply(&self, mut config: ExtractConfig) -> Result<ExtractConfig, Box<dyn std::error::Error>> {
        if let Some(format) = self.format {
            config = config.with_output_mode(format.into());
        }
        if let Some(strategy) = self.strategy {
            config = config.with_strategy(strategy.into());
        }
        if let Some(level) = self.cleanup {
            config = config.with_normalize_preset(level.into());
        }
        if let Some(digits) = self.digits {
            config.normalize = config.normalize.with_digits(digits.into());
        }
        if let Some(ref pages) = self.pages {
            let selection =
                PageSelection::parse(pages).map_err(|e| format!("Invalid page range: {}", e))?;
            config = config.with_pages(selection);
        }
        if self.compact {
            config = config.with_json_format(JsonFormat::Compact);
        }
        self.engine.apply(config)
    }
}

fn writer_for(extractor: &Extractor, output_dir: &Path) -> arpdf::Result<ResultWriter> {
    let config = extractor.config();
    ResultWriter::new(
        output_dir,
        config.output_mode,
        config.json_format,
        extractor.normalizer(),
    )
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    stdout: bool,
    options: &ExtractArgs,
    config_file: Option<&Path>,
) -> CliResult {
    let config = options.apply(load_config(config_file)?)?;
    let extractor = Extractor::new(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Extracting {}...", input.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let doc = extractor.extract_file(input);
    spinner.finish_and_clear();
    let doc = doc?;

    let writer = writer_for(&extractor, output.unwrap_or_else(|| Path::new(".")))?;
    if stdout {
        println!("{}", writer.render(&doc)?);
        return Ok(());
    }

    let path = writer.write(&doc, None)?;
    println!("{} {}", "Saved to".green(), path.display());
    println!("  {} {}", "├─".dimmed(), doc.summary());
    for error in doc.errors() {
        println!(
            "  {} page {}: {}",
            "├─".dimmed(),
            error.page,
            error.error.yellow()
        );
    }
    println!(
        "  {} {} words, {} characters",
        "└─".dimmed(),
        doc.word_count(),
        doc.char_count()
    );

    Ok(())
}

fn cmd_batch(
    input: &Path,
    output: Option<&Path>,
    sequential: bool,
    options: &ExtractArgs,
    config_file: Option<&Path>,
) -> CliResult {
    let mut config = options.apply(load_config(config_file)?)?;
    if sequential {
        config = config.sequential();
    }

    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(config.output_mode.default_batch_dir()));

    let extractor = Extractor::new(config)?;
    let writer = writer_for(&extractor, &output_dir)?;
    let pdfs = arpdf::find_pdfs(input)?;
    let total = pdfs.len();

    if total == 0 {
        println!("{} {}", "No PDF files found in".yellow(), input.display());
        return Ok(());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = BatchRunner::new(&extractor, &writer).run_files(input, &pdfs, |outcome| {
        if let Some(name) = outcome.input.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
        pb.inc(1);
    });
    pb.finish_with_message("Done!");

    println!("\n{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}/{}",
        "Files".bold(),
        report.succeeded().to_string().green(),
        report.total()
    );
    println!(
        "{}: {} ({} OCR)",
        "Pages".bold(),
        report.total_pages(),
        report.total_ocr_pages()
    );
    println!("{}: {}", "Characters".bold(), report.total_characters());
    println!("{}: {} ms", "Time".bold(), report.total_time_ms);
    println!("{}: {}", "Output".bold(), report.output_dir.display());

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("\n{}", "Failures".red().bold());
        for failure in failures {
            println!(
                "  {} {}: {}",
                "✗".red(),
                failure.input.display(),
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn cmd_compare(
    input: &Path,
    pages: Option<&str>,
    backends: Option<&str>,
    output: Option<&Path>,
    engine: &EngineArgs,
    config_file: Option<&Path>,
) -> CliResult {
    let config = engine.apply(load_config(config_file)?)?;

    let pages = match pages {
        Some(p) => PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?,
        None => PageSelection::All,
    };
    let backends = match backends {
        Some(b) => OcrBackendType::parse_list(b)?,
        None => Vec::new(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Comparing OCR backends...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = compare_backends(input, &pages, &backends, &config);
    spinner.finish_and_clear();
    let report = report?;

    println!("{}", "Backend Comparison".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "{:<12} {:>8} {:>10} {:>10} {:>10}",
        "Backend".bold(),
        "Words".bold(),
        "Conf".bold(),
        "Words/s".bold(),
        "Time ms".bold()
    );
    for eval in &report.results {
        if let Some(ref error) = eval.error {
            println!("{:<12} {}", eval.backend.as_str(), error.red());
            continue;
        }
        let confidence = eval
            .mean_confidence
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>8} {:>10} {:>10.1} {:>10}",
            eval.backend.as_str(),
            eval.total_words,
            confidence,
            eval.words_per_second,
            eval.processing_time_ms
        );
    }

    let summary = &report.summary;
    println!();
    if let Some(best) = summary.best_accuracy {
        println!("{}: {}", "Best accuracy".bold(), best.display_name().green());
    }
    if let Some(fastest) = summary.fastest {
        println!("{}: {}", "Fastest".bold(), fastest.display_name().green());
    }
    if let Some(best) = summary.best_overall {
        println!("{}: {}", "Best overall".bold(), best.display_name().green());
    }

    let path = report.save(output.unwrap_or_else(|| Path::new(".")))?;
    println!("\n{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_detect(input: &Path, config_file: Option<&Path>) -> CliResult {
    let config = load_config(config_file)?;
    let loader = PdfLoader::open(input)?;
    let extractor = Extractor::new(config)?;

    let info = loader.info();
    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), info.pdf_version);
    println!("{}: {}", "Pages".bold(), loader.page_count());
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if loader.is_encrypted() { "Yes" } else { "No" }
    );
    if let Some(ref title) = info.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref producer) = info.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    println!(
        "{}: {}",
        "Type".bold(),
        classify_document(&loader).as_str().green()
    );

    println!();
    println!("{}", "Page Decisions".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "{:>5} {:>7} {:>8} {:>6} {:>9}  {}",
        "Page".bold(),
        "Chars".bold(),
        "Density".bold(),
        "Valid".bold(),
        "Artifact".bold(),
        "Decision".bold()
    );
    for decision in extractor.decide_pages(&loader)? {
        let m = &decision.metrics;
        let verdict = match decision.reason {
            Some(reason) if decision.needs_ocr => format!("OCR ({})", reason.description()).yellow(),
            _ => "embedded".green(),
        };
        println!(
            "{:>5} {:>7} {:>8.2} {:>6.2} {:>9.3}  {}",
            decision.page, m.char_count, m.density, m.valid_ratio, m.artifact_ratio, verdict
        );
    }

    Ok(())
}

fn cmd_check(engine: &EngineArgs, config_file: Option<&Path>) -> CliResult {
    let config = engine.apply(load_config(config_file)?)?;

    println!("{}", "External Tools".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    match check_pdftoppm_hint() {
        None => println!("  {} pdftoppm", "✓".green()),
        Some(hint) => println!("  {} pdftoppm: {}", "✗".red(), hint.dimmed()),
    }

    println!();
    println!("{}", "OCR Backends".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for backend in OcrBackendType::ALL {
        let marker = if backend == config.ocr.backend { " (selected)" } else { "" };
        match create_backend_of(backend, &config.ocr) {
            Ok(engine) if engine.is_available() => println!(
                "  {} {}{}: {}",
                "✓".green(),
                backend.display_name(),
                marker,
                engine.availability_hint().dimmed()
            ),
            Ok(engine) => println!(
                "  {} {}{}: {}",
                "✗".red(),
                backend.display_name(),
                marker,
                engine.availability_hint().dimmed()
            ),
            Err(e) => println!("  {} {}{}: {}", "✗".red(), backend.display_name(), marker, e),
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "arpdf".cyan().bold(), arpdf::VERSION);
    println!("Arabic/English PDF text extraction tool");
    println!();
    println!("License: MIT");
}
