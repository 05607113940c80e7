//! CLI binary for scan2text.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` / `ExtractionRequest`, drives a progress bar and turns
//! Ctrl-C into cooperative cancellation.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2text::{
    inspect, language_code, resolve_document,
    run::write_text, CancellationToken, ExtractionConfig, ExtractionPipeline,
    ExtractionProgressCallback, ExtractionRequest, ProgressCallback, ProviderKind, RunStatus,
    UnitPart, VisionCredentials, PAGE_CEILING,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while pages render, then a bar
/// counting page-units with one log line per finished unit.
struct CliProgressCallback {
    bar: ProgressBar,
    current: Mutex<Option<(String, Instant)>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading OCR engine…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} units  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_state_change(&self, state: scan2text::RunState) {
        if state == scan2text::RunState::Rasterizing {
            self.bar.set_prefix("Rendering");
            self.bar.set_message("Rasterising pages…");
        }
    }

    fn on_run_start(&self, total_pages: usize, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Extracting {total_units} units from {total_pages} pages…"
            ))
        ));
    }

    fn on_unit_start(&self, _index: usize, _total: usize, page: usize, part: UnitPart) {
        let label = match part {
            UnitPart::Whole => format!("page {page}"),
            part => format!("page {page} ({part})"),
        };
        self.bar.set_message(label.clone());
        if let Ok(mut current) = self.current.lock() {
            *current = Some((label, Instant::now()));
        }
    }

    fn on_unit_complete(&self, completed: usize, total: usize, text_len: usize) {
        let (label, elapsed_ms) = self
            .current
            .lock()
            .ok()
            .and_then(|mut c| c.take())
            .map(|(label, t)| (label, t.elapsed().as_millis()))
            .unwrap_or_default();

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<18}  {:<12}  {}",
            green("✓"),
            completed,
            total,
            label,
            dim(&format!("{text_len:>6} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_cancelled(&self, completed: usize, total: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} cancelled after {}/{} units",
            yellow("⚠"),
            bold(&completed.to_string()),
            total
        );
    }

    fn on_run_failed(&self, _error: &str) {
        self.bar.finish_and_clear();
    }

    fn on_run_complete(&self, total_units: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} units extracted",
            green("✔"),
            bold(&total_units.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Burmese + English book, first 10 pages (default), to stdout
  scan2text --lang mya,eng book.pdf

  # Double-page scans, every page up to the 20-page ceiling
  scan2text --split --page-limit 0 spreads.pdf -o spreads.txt

  # Google Cloud Vision instead of the local engine
  GOOGLE_VISION_API_KEY=AIza... scan2text --engine cloud scan.jpg

  # Download and process a remote PDF
  scan2text https://example.com/scan.pdf -o scan.txt

  # Page count without running OCR
  scan2text --inspect-only book.pdf

  # JSON output with per-unit fragments and timings
  scan2text --json book.pdf > book.json

LANGUAGES:
  --lang takes tesseract codes (eng, mya, tha, chi_sim, …) or the names
  English / Myanmar. Order matters: put the dominant script first.
  Missing <code>.traineddata files are downloaded into --tessdata-dir.

ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY      Cloud Vision API key (sent as x-goog-api-key)
  GOOGLE_OAUTH_ACCESS_TOKEN  OAuth access token (sent as a bearer header)
  TESSERACT_CMD              Path to the tesseract executable
  PDFIUM_LIB_PATH            Path to an existing libpdfium
  SCAN2TEXT_CACHE_DIR        Override the pdfium cache directory
  RUST_LOG                   Override log filtering (e.g. scan2text=debug)

Press Ctrl-C once to stop after the current unit and keep partial text.
"#;

/// Extract text from scanned PDFs and images with Tesseract or Cloud Vision.
#[derive(Parser, Debug)]
#[command(
    name = "scan2text",
    version,
    about = "Extract text from scanned PDFs and images with Tesseract or Cloud Vision",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/PNG/JPEG path or HTTP/HTTPS URL.
    input: String,

    /// Write text to this file instead of stdout.
    #[arg(short, long, env = "SCAN2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// OCR engine.
    #[arg(long, env = "SCAN2TEXT_ENGINE", value_enum, default_value = "local")]
    engine: EngineArg,

    /// Languages for the local engine, in priority order.
    #[arg(
        short,
        long = "lang",
        env = "SCAN2TEXT_LANG",
        value_delimiter = ',',
        default_value = "eng"
    )]
    languages: Vec<String>,

    /// Maximum pages to process (0 = no limit; 20 is always the ceiling).
    #[arg(long, env = "SCAN2TEXT_PAGE_LIMIT", default_value_t = 10)]
    page_limit: usize,

    /// Split each page into left and right halves (double-page scans).
    #[arg(long, env = "SCAN2TEXT_SPLIT")]
    split: bool,

    /// Rendering DPI (72–600).
    #[arg(long, env = "SCAN2TEXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Directory holding <code>.traineddata files.
    #[arg(long, env = "SCAN2TEXT_TESSDATA_DIR", default_value = "tessdata")]
    tessdata_dir: PathBuf,

    /// Base URL missing language data is fetched from.
    #[arg(long, env = "SCAN2TEXT_TESSDATA_URL")]
    tessdata_url: Option<String>,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract: Option<PathBuf>,

    /// Path to the PDFium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Cloud Vision endpoint (scheme + host).
    #[arg(long, env = "SCAN2TEXT_VISION_ENDPOINT")]
    vision_endpoint: Option<String>,

    /// Per-unit cloud OCR timeout in seconds.
    #[arg(long, env = "SCAN2TEXT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs, language data).
    #[arg(long, env = "SCAN2TEXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (ExtractionResult) instead of plain text.
    #[arg(long, env = "SCAN2TEXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Print document info only, no extraction.
    #[arg(long, env = "SCAN2TEXT_INSPECT_ONLY")]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2TEXT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Local,
    Cloud,
}

impl From<EngineArg> for ProviderKind {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Local => ProviderKind::Local,
            EngineArg::Cloud => ProviderKind::Cloud,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Kind:         {}", info.kind);
            println!("Size:         {} bytes", info.size_bytes);
            println!("Pages:        {}", info.page_count);
            println!(
                "Processable:  {} (ceiling {})",
                info.processable_pages, PAGE_CEILING
            );
        }
        return Ok(());
    }

    // ── Build config and request ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let request = build_request(&cli);
    request.validate().context("Invalid request")?;

    // ── Cancellation on Ctrl-C ───────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let quiet = cli.quiet;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                if !quiet {
                    eprintln!("{} stopping after the current unit…", yellow("⚠"));
                }
                cancel.cancel();
            }
        });
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let document = resolve_document(&cli.input, &config)
        .await
        .context("Failed to load input")?;
    let result = ExtractionPipeline::new(config)
        .run(document, &request, &cancel)
        .await
        .context("Extraction failed")?;

    if let Some(ref output_path) = cli.output {
        write_text(output_path, &result.text)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} units  {}ms  →  {}",
                if result.is_complete() {
                    green("✔")
                } else {
                    yellow("⚠")
                },
                result.stats.completed_units,
                result.stats.total_units,
                result.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !result.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Extracted {}/{} units from {} pages in {}ms",
            result.stats.completed_units,
            result.stats.total_units,
            result.stats.total_pages,
            result.stats.total_duration_ms
        );
    }

    if result.status == RunStatus::Cancelled {
        std::process::exit(130);
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .tessdata_dir(&cli.tessdata_dir)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.tessdata_url {
        builder = builder.tessdata_base_url(url);
    }
    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_path(path);
    }
    if let Some(ref path) = cli.pdfium {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(ref endpoint) = cli.vision_endpoint {
        builder = builder.vision_endpoint(endpoint);
    }
    if let Some(credentials) = VisionCredentials::from_env() {
        builder = builder.vision_credentials(credentials);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `ExtractionRequest`.
fn build_request(cli: &Cli) -> ExtractionRequest {
    let provider: ProviderKind = cli.engine.into();
    let request = match provider {
        ProviderKind::Local => ExtractionRequest::local(
            cli.languages
                .iter()
                .map(|l| language_code(l))
                .filter(|l| !l.is_empty()),
        ),
        ProviderKind::Cloud => ExtractionRequest::cloud(),
    };
    request
        .with_page_limit(cli.page_limit)
        .with_split(cli.split)
}
