//! Progress-callback trait and run-state reporting.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as a run walks through its states and page-units.
//!
//! Units are processed strictly one at a time, so events for one run arrive
//! in order: `on_run_start`, then for each unit `on_unit_start` /
//! `on_unit_complete`, then exactly one of `on_run_complete`,
//! `on_run_cancelled` or `on_run_failed`. The `completed` counter passed to
//! `on_unit_complete` never decreases and equals `total` only when the last
//! unit finished.
//!
//! # Example
//!
//! ```rust
//! use scan2text::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for Counter {
//!     fn on_unit_complete(&self, completed: usize, total: usize, _text_len: usize) {
//!         self.0.store(completed, Ordering::SeqCst);
//!         eprintln!("{completed}/{total}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::document::UnitPart;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// States of one extraction run.
///
/// `Idle → Rasterizing → ExtractingUnit(1) → … → Done | Cancelled | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "unit", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Rasterizing,
    /// 1-based index of the unit being extracted.
    ExtractingUnit(usize),
    Done,
    Cancelled,
    Failed,
}

impl RunState {
    /// True for `Done`, `Cancelled` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Cancelled | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Rasterizing => f.write_str("rasterizing"),
            RunState::ExtractingUnit(i) => write!(f, "extracting unit {i}"),
            RunState::Done => f.write_str("done"),
            RunState::Cancelled => f.write_str("cancelled"),
            RunState::Failed => f.write_str("failed"),
        }
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: one callback
/// can be shared by concurrent runs.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called on every state transition, including the terminal one.
    fn on_state_change(&self, state: RunState) {
        let _ = state;
    }

    /// Called once pages are rasterised and the unit count is known.
    ///
    /// # Arguments
    /// * `total_pages`: pages that will be processed (after the limit)
    /// * `total_units`: units that will be sent to the provider
    fn on_run_start(&self, total_pages: usize, total_units: usize) {
        let _ = (total_pages, total_units);
    }

    /// Called just before a unit is dispatched.
    ///
    /// # Arguments
    /// * `index`: 1-based unit index
    /// * `total`: total units
    /// * `page`: originating page number
    /// * `part`: which part of the page
    fn on_unit_start(&self, index: usize, total: usize, page: usize, part: UnitPart) {
        let _ = (index, total, page, part);
    }

    /// Called after a unit's text has been appended.
    ///
    /// # Arguments
    /// * `completed`: units finished so far
    /// * `total`: total units
    /// * `text_len`: byte length of the unit's text
    fn on_unit_complete(&self, completed: usize, total: usize, text_len: usize) {
        let _ = (completed, total, text_len);
    }

    /// Called when cancellation stopped the run early.
    fn on_run_cancelled(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called when a fatal error aborted the run.
    fn on_run_failed(&self, error: &str) {
        let _ = error;
    }

    /// Called once after every unit was extracted.
    fn on_run_complete(&self, total_units: usize) {
        let _ = total_units;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<RunState>>,
        progress: Mutex<Vec<(usize, usize)>>,
    }

    impl ExtractionProgressCallback for Recorder {
        fn on_state_change(&self, state: RunState) {
            self.states.lock().unwrap().push(state);
        }

        fn on_unit_complete(&self, completed: usize, total: usize, _text_len: usize) {
            self.progress.lock().unwrap().push((completed, total));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_state_change(RunState::Rasterizing);
        cb.on_run_start(2, 4);
        cb.on_unit_start(1, 4, 1, UnitPart::Left);
        cb.on_unit_complete(1, 4, 42);
        cb.on_run_cancelled(1, 4);
        cb.on_run_failed("boom");
        cb.on_run_complete(4);
    }

    #[test]
    fn recorder_receives_events() {
        let rec = Recorder::default();
        rec.on_state_change(RunState::Idle);
        rec.on_state_change(RunState::ExtractingUnit(1));
        rec.on_unit_complete(1, 2, 10);
        rec.on_unit_complete(2, 2, 0);
        rec.on_state_change(RunState::Done);

        assert_eq!(
            *rec.states.lock().unwrap(),
            vec![RunState::Idle, RunState::ExtractingUnit(1), RunState::Done]
        );
        assert_eq!(*rec.progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn terminal_states() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Cancelled.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::ExtractingUnit(3).is_terminal());
        assert_eq!(RunState::ExtractingUnit(3).to_string(), "extracting unit 3");
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1, 1);
        cb.on_unit_complete(1, 1, 5);
    }
}
