//! Streaming progress API: pull run events instead of implementing a callback.
//!
//! [`extract_stream`] spawns the run on the tokio runtime and hands back a
//! `Stream` of [`ProgressEvent`]s plus the run's `JoinHandle`. Events arrive
//! in the same order the callback would see them; the stream ends once the
//! run has finished and dropped its sender.

use crate::cancel::CancellationToken;
use crate::config::{ExtractionConfig, ExtractionRequest};
use crate::document::{Document, UnitPart};
use crate::error::ExtractError;
use crate::output::ExtractionResult;
use crate::progress::{ExtractionProgressCallback, ProgressCallback, RunState};
use crate::run::ExtractionPipeline;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

/// One progress notification, mirroring [`ExtractionProgressCallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StateChanged {
        state: RunState,
    },
    RunStarted {
        total_pages: usize,
        total_units: usize,
    },
    UnitStarted {
        index: usize,
        total: usize,
        page: usize,
        part: UnitPart,
    },
    UnitCompleted {
        completed: usize,
        total: usize,
        text_len: usize,
    },
    RunCancelled {
        completed: usize,
        total: usize,
    },
    RunFailed {
        error: String,
    },
    RunCompleted {
        total_units: usize,
    },
}

/// A boxed stream of progress events.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Callback that forwards every event into a channel, and optionally on to
/// a callback the caller had already configured.
pub struct ChannelProgressCallback {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    inner: Option<ProgressCallback>,
}

impl ChannelProgressCallback {
    fn send(&self, event: ProgressEvent) {
        // The receiver may be gone; progress is best-effort.
        let _ = self.tx.send(event);
    }
}

impl ExtractionProgressCallback for ChannelProgressCallback {
    fn on_state_change(&self, state: RunState) {
        self.send(ProgressEvent::StateChanged { state });
        if let Some(ref cb) = self.inner {
            cb.on_state_change(state);
        }
    }

    fn on_run_start(&self, total_pages: usize, total_units: usize) {
        self.send(ProgressEvent::RunStarted {
            total_pages,
            total_units,
        });
        if let Some(ref cb) = self.inner {
            cb.on_run_start(total_pages, total_units);
        }
    }

    fn on_unit_start(&self, index: usize, total: usize, page: usize, part: UnitPart) {
        self.send(ProgressEvent::UnitStarted {
            index,
            total,
            page,
            part,
        });
        if let Some(ref cb) = self.inner {
            cb.on_unit_start(index, total, page, part);
        }
    }

    fn on_unit_complete(&self, completed: usize, total: usize, text_len: usize) {
        self.send(ProgressEvent::UnitCompleted {
            completed,
            total,
            text_len,
        });
        if let Some(ref cb) = self.inner {
            cb.on_unit_complete(completed, total, text_len);
        }
    }

    fn on_run_cancelled(&self, completed: usize, total: usize) {
        self.send(ProgressEvent::RunCancelled { completed, total });
        if let Some(ref cb) = self.inner {
            cb.on_run_cancelled(completed, total);
        }
    }

    fn on_run_failed(&self, error: &str) {
        self.send(ProgressEvent::RunFailed {
            error: error.to_string(),
        });
        if let Some(ref cb) = self.inner {
            cb.on_run_failed(error);
        }
    }

    fn on_run_complete(&self, total_units: usize) {
        self.send(ProgressEvent::RunCompleted { total_units });
        if let Some(ref cb) = self.inner {
            cb.on_run_complete(total_units);
        }
    }
}

/// Create a forwarding callback and the stream it feeds.
pub fn progress_channel(inner: Option<ProgressCallback>) -> (ProgressCallback, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cb: ProgressCallback = Arc::new(ChannelProgressCallback { tx, inner });
    (cb, Box::pin(UnboundedReceiverStream::new(rx)))
}

/// Run an extraction in the background, streaming its progress.
///
/// # Example
/// ```rust,no_run
/// use scan2text::{extract_stream, CancellationToken, Document, ExtractionConfig, ExtractionRequest};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = Document::pdf(std::fs::read("scan.pdf")?);
/// let (mut events, handle) = extract_stream(
///     doc,
///     ExtractionRequest::cloud(),
///     &ExtractionConfig::default(),
///     CancellationToken::new(),
/// );
/// while let Some(event) = events.next().await {
///     println!("{event:?}");
/// }
/// let result = handle.await??;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
pub fn extract_stream(
    document: Document,
    request: ExtractionRequest,
    config: &ExtractionConfig,
    cancel: CancellationToken,
) -> (
    ProgressStream,
    JoinHandle<Result<ExtractionResult, ExtractError>>,
) {
    let (cb, events) = progress_channel(config.progress_callback.clone());
    let mut config = config.clone();
    config.progress_callback = Some(cb);

    let handle = tokio::spawn(async move {
        ExtractionPipeline::new(config)
            .run(document, &request, &cancel)
            .await
    });
    (events, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn channel_forwards_in_order() {
        let (cb, events) = progress_channel(None);
        cb.on_state_change(RunState::Rasterizing);
        cb.on_run_start(1, 2);
        cb.on_unit_complete(1, 2, 10);
        drop(cb);

        let got: Vec<ProgressEvent> = events.collect().await;
        assert_eq!(
            got,
            vec![
                ProgressEvent::StateChanged {
                    state: RunState::Rasterizing
                },
                ProgressEvent::RunStarted {
                    total_pages: 1,
                    total_units: 2
                },
                ProgressEvent::UnitCompleted {
                    completed: 1,
                    total: 2,
                    text_len: 10
                },
            ]
        );
    }

    #[test]
    fn events_serialise_with_a_tag() {
        let json = serde_json::to_string(&ProgressEvent::RunCancelled {
            completed: 2,
            total: 5,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"run_cancelled","completed":2,"total":5}"#);
    }

    #[tokio::test]
    async fn dropped_receiver_is_ignored() {
        let (cb, events) = progress_channel(None);
        drop(events);
        cb.on_run_failed("boom");
    }
}
