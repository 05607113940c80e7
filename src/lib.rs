//! # scan2text
//!
//! Extract text from scanned PDFs and page images with a local OCR engine
//! (Tesseract) or Google Cloud Vision.
//!
//! Scanned books rarely carry a text layer, and many mix scripts on one page
//! (Burmese body text with English headings, say). This crate rasterises each
//! page, optionally splits double-page spreads into their left and right
//! halves, sends every resulting unit to an OCR provider one at a time, and
//! joins the fragments back together in reading order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Rasterise  render up to 20 pages via pdfium (spawn_blocking)
//!  ├─ 3. Split      optional left/right halves per page
//!  ├─ 4. Extract    tesseract -l mya+eng  |  Cloud Vision TEXT_DETECTION
//!  └─ 5. Output     fragments joined with '\n' + per-unit stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2text::{extract, ExtractionConfig, ExtractionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Missing mya/eng traineddata is fetched into ./tessdata on first use.
//!     let request = ExtractionRequest::local(["mya", "eng"])
//!         .with_page_limit(10)
//!         .with_split(true);
//!     let result = extract("book.pdf", &request, &ExtractionConfig::default()).await?;
//!     println!("{}", result.text);
//!     eprintln!("{} units in {}ms", result.stats.completed_units, result.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation
//!
//! [`ExtractionPipeline::run`] takes a [`CancellationToken`]. Cancelling it
//! stops the run before the next unit; the result then has
//! [`RunStatus::Cancelled`] and holds every fragment finished so far.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2text = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod run;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancellationToken;
pub use config::{
    language_code, ExtractionConfig, ExtractionConfigBuilder, ExtractionRequest, ProviderKind,
};
pub use document::{Document, DocumentKind, PageImage, PageUnit, UnitPart};
pub use error::{ErrorKind, ExtractError};
pub use output::{DocumentInfo, ExtractionResult, ExtractionStats, RunStatus, UnitText};
pub use pipeline::rasterize::{effective_page_count, PdfRenderer, PdfiumRenderer, PAGE_CEILING};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, RunState};
pub use provider::tesseract::TesseractExtractor;
pub use provider::vision::{VisionCredentials, VisionExtractor};
pub use provider::{ExtractionContext, TextExtractor};
pub use run::{
    extract, extract_sync, extract_to_file, inspect, resolve_document, ExtractionPipeline,
};
pub use stream::{extract_stream, ProgressEvent, ProgressStream};
