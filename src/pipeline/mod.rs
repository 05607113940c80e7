//! Pipeline stages for scan-to-text extraction.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own; the run loop in [`crate::run`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ split ──▶ encode ──▶ provider
//! (URL/path) (pdfium)    (halves)   (PNG)     (OCR)
//! ```
//!
//! 1. [`input`]: read a local path or download a URL, sniff PDF vs image
//! 2. [`rasterize`]: render the pages a run will process; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`split`]: optionally cut each page into left and right halves
//! 4. [`encode`]: PNG bytes for the OCR engine or base64 for JSON APIs

pub mod encode;
pub mod input;
pub mod rasterize;
pub mod split;
