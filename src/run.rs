//! The extraction run loop and the top-level entry points.
//!
//! A run walks `Idle → Rasterizing → ExtractingUnit(1..=n) → Done`, with
//! `Cancelled` and `Failed` as the other terminal states. Units are
//! dispatched one at a time; the cancellation token is sampled before each
//! dispatch.
//!
//! The two early exits are deliberately asymmetric. A cancelled run returns
//! `Ok` with [`RunStatus::Cancelled`] and every fragment finished so far. A
//! failed run returns `Err` and its partial text is discarded.

use crate::cancel::CancellationToken;
use crate::config::{ExtractionConfig, ExtractionRequest};
use crate::document::Document;
use crate::error::ExtractError;
use crate::output::{DocumentInfo, ExtractionResult, ExtractionStats, RunStatus, UnitText};
use crate::pipeline::{input, rasterize, split};
use crate::pipeline::rasterize::{PdfRenderer, PdfiumRenderer};
use crate::progress::{ExtractionProgressCallback, NoopProgressCallback, RunState};
use crate::provider::{resolve_extractor, ExtractionContext};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs extractions against one configuration.
///
/// Holds no per-run state, so one pipeline can serve any number of
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    config: ExtractionConfig,
}

impl ExtractionPipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn renderer(&self) -> Arc<dyn PdfRenderer> {
        match self.config.renderer {
            Some(ref r) => Arc::clone(r),
            None => Arc::new(PdfiumRenderer::from_config(&self.config)),
        }
    }

    /// Extract the text of `document`.
    ///
    /// # Returns
    /// - `Ok` with [`RunStatus::Done`] when every unit was extracted
    /// - `Ok` with [`RunStatus::Cancelled`] and the fragments completed before
    ///   `cancel` was observed
    ///
    /// # Errors
    /// Any rasterisation, split or provider failure aborts the run; no
    /// partial text is returned.
    pub async fn run(
        &self,
        document: Document,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult, ExtractError> {
        let noop = NoopProgressCallback;
        let cb: &dyn ExtractionProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };

        cb.on_state_change(RunState::Idle);
        match self.run_inner(document, request, cancel, cb).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Extraction failed: {}", e);
                cb.on_state_change(RunState::Failed);
                cb.on_run_failed(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        document: Document,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
        cb: &dyn ExtractionProgressCallback,
    ) -> Result<ExtractionResult, ExtractError> {
        let total_start = Instant::now();
        info!(
            "Starting extraction: {} ({} bytes), provider={}, page_limit={}, split={}",
            document.kind(),
            document.len(),
            request.provider,
            request.page_limit,
            request.split
        );

        // ── Step 1: Validate and prepare the provider ────────────────────
        request.validate()?;
        let extractor = resolve_extractor(request, &self.config).await?;

        // ── Step 2: Rasterise ────────────────────────────────────────────
        cb.on_state_change(RunState::Rasterizing);
        let render_start = Instant::now();
        let pages = rasterize::rasterize(document, request.page_limit, self.renderer()).await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        let total_pages = pages.len();
        info!("Rasterised {} pages in {}ms", total_pages, render_duration_ms);

        // ── Step 3: Expand into page-units ───────────────────────────────
        let units = split::expand_units(pages, request.split)?;
        let total = units.len();
        cb.on_run_start(total_pages, total);

        // ── Step 4: Extract unit by unit ─────────────────────────────────
        let extract_start = Instant::now();
        let mut fragments: Vec<UnitText> = Vec::with_capacity(total);
        let mut status = RunStatus::Done;

        for (i, unit) in units.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Extraction cancelled after {}/{} units", fragments.len(), total);
                status = RunStatus::Cancelled;
                break;
            }

            let index = i + 1;
            cb.on_state_change(RunState::ExtractingUnit(index));
            cb.on_unit_start(index, total, unit.page, unit.part);

            let ctx = ExtractionContext::for_unit(unit, index, total);
            let unit_start = Instant::now();
            let text = extractor.extract_text(unit, &ctx).await?;
            let duration_ms = unit_start.elapsed().as_millis() as u64;
            debug!(
                "Unit {}/{} ({}) → {} chars in {}ms",
                index,
                total,
                unit.label(),
                text.len(),
                duration_ms
            );

            let text_len = text.len();
            fragments.push(UnitText {
                page: unit.page,
                part: unit.part,
                text,
                duration_ms,
            });
            cb.on_unit_complete(fragments.len(), total, text_len);
        }

        // ── Step 5: Assemble ─────────────────────────────────────────────
        let stats = ExtractionStats {
            total_pages,
            total_units: total,
            completed_units: fragments.len(),
            render_duration_ms,
            extract_duration_ms: extract_start.elapsed().as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        match status {
            RunStatus::Done => {
                info!(
                    "Extraction complete: {} units from {} pages, {}ms total",
                    total, total_pages, stats.total_duration_ms
                );
                cb.on_state_change(RunState::Done);
                cb.on_run_complete(total);
            }
            RunStatus::Cancelled => {
                cb.on_state_change(RunState::Cancelled);
                cb.on_run_cancelled(stats.completed_units, total);
            }
        }

        Ok(ExtractionResult::assemble(fragments, status, stats))
    }
}

/// Read a local path or download an HTTP(S) URL into a [`Document`].
pub async fn resolve_document(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<Document, ExtractError> {
    input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await
}

/// Extract the text of a file or URL.
///
/// This is the primary entry point for the library. Use
/// [`ExtractionPipeline::run`] directly to supply a [`CancellationToken`].
///
/// # Example
/// ```rust,no_run
/// use scan2text::{extract, ExtractionConfig, ExtractionRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ExtractionRequest::local(["mya", "eng"]).with_page_limit(10);
/// let result = extract("scan.pdf", &request, &ExtractionConfig::default()).await?;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    input_str: impl AsRef<str>,
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    let document = resolve_document(input_str, config).await?;
    ExtractionPipeline::new(config.clone())
        .run(document, request, &CancellationToken::new())
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, request, config))
}

/// Extract and write the joined text to `output_path`.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    let result = extract(input_str, request, config).await?;
    write_text(output_path.as_ref(), &result.text).await?;
    Ok(result)
}

/// Write `text` to `path` through a temp file and a rename, so readers never
/// see a half-written file.
pub async fn write_text(path: &Path, text: &str) -> Result<(), ExtractError> {
    let write_failed = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, text).await.map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

/// Describe a document without extracting anything.
///
/// Needs the PDF backend for PDFs but no OCR provider or credentials.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentInfo, ExtractError> {
    let document = resolve_document(input_str, config).await?;
    let renderer = ExtractionPipeline::new(config.clone()).renderer();

    let kind = document.kind();
    let size_bytes = document.len();
    let page_count = tokio::task::spawn_blocking(move || {
        rasterize::page_count_blocking(&document, renderer.as_ref())
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Inspect task panicked: {}", e)))??;

    Ok(DocumentInfo {
        kind,
        size_bytes,
        page_count,
        processable_pages: rasterize::effective_page_count(page_count, 0),
    })
}
