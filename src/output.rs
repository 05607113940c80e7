//! Result types produced by an extraction run.

use crate::document::{DocumentKind, UnitPart};
use serde::{Deserialize, Serialize};

/// How a run that returned `Ok` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every unit was extracted.
    Done,
    /// Cancellation stopped the run; `fragments` holds what finished first.
    Cancelled,
}

/// Text extracted from one page-unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitText {
    /// Originating page number (1-based).
    pub page: usize,
    pub part: UnitPart,
    /// Text as returned by the provider; may be empty.
    pub text: String,
    pub duration_ms: u64,
}

/// Timing and counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages rasterised (after the limit and ceiling).
    pub total_pages: usize,
    /// Units that would have been extracted on full completion.
    pub total_units: usize,
    /// Units actually extracted.
    pub completed_units: usize,
    pub render_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The outcome of a run that was not aborted by an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Fragments joined with `\n` in production order.
    pub text: String,
    pub status: RunStatus,
    /// One entry per completed unit, page order then left before right.
    pub fragments: Vec<UnitText>,
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// Assemble a result from ordered fragments.
    pub fn assemble(fragments: Vec<UnitText>, status: RunStatus, stats: ExtractionStats) -> Self {
        let text = fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            text,
            status,
            fragments,
            stats,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Done
    }
}

/// What [`crate::inspect`] reports about a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub kind: DocumentKind,
    pub size_bytes: usize,
    /// Pages in the document (1 for images).
    pub page_count: usize,
    /// Pages a run with no explicit limit would process.
    pub processable_pages: usize,
}
