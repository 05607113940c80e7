//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a shared flag. Any clone can call
//! [`cancel`](CancellationToken::cancel); the pipeline samples it before
//! dispatching each page-unit. A provider call already in flight is never
//! interrupted, so a run stops at most one unit after the flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable, thread-safe stop signal for one run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
