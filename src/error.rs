//! Error types for the scan2text library.
//!
//! Every failure is fatal to the run that hit it: there is no per-page retry
//! and no skip-and-continue. The core's job is to classify what went wrong so
//! the caller can show the right guidance. [`ExtractError::kind`] collapses
//! the variants into the small [`ErrorKind`] taxonomy callers match on, while
//! the variant itself keeps the detail (and the underlying cause, via
//! `#[source]`) for diagnostics.
//!
//! Cancellation is not an error; it is a normal terminal state reported on
//! [`crate::output::ExtractionResult::status`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors returned by the scan2text library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Host errors ───────────────────────────────────────────────────────
    /// A required native backend (PDF renderer, OCR engine) is not installed.
    #[error("Required backend '{dependency}' is not available: {detail}\n{hint}")]
    DependencyMissing {
        dependency: String,
        detail: String,
        hint: String,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Document bytes could not be parsed as a PDF or decoded as an image.
    #[error("Document is corrupt or unsupported: {detail}")]
    CorruptDocument {
        detail: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// The document parsed but has nothing to extract.
    #[error("Document is empty: {detail}")]
    EmptyDocument { detail: String },

    /// A page image is degenerate (e.g. zero width) and cannot be processed.
    #[error("Invalid image for page {page}: {detail}")]
    InvalidImage { page: usize, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// Language data for the local engine is absent and could not be fetched.
    #[error("Language data '{code}' is missing and could not be fetched: {detail}")]
    LanguageResourceMissing { code: String, detail: String },

    /// Cloud provider rejected or lacked credentials.
    #[error(
        "Credential error from provider '{provider}': {detail}\n\
Set GOOGLE_VISION_API_KEY or GOOGLE_OAUTH_ACCESS_TOKEN, and make sure the Cloud Vision API \
is enabled for the project the credential belongs to."
    )]
    CredentialError { provider: String, detail: String },

    /// Any other extraction failure: transport, timeout, malformed response,
    /// non-zero engine exit.
    #[error("Provider '{provider}' failed on page {page}: {detail}")]
    ProviderError {
        provider: String,
        page: usize,
        detail: String,
        #[source]
        source: Option<BoxedCause>,
    },

    // ── Request / config errors ───────────────────────────────────────────
    /// The extraction request is not acceptable for the selected provider.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DependencyMissing,
    CorruptDocument,
    EmptyDocument,
    InvalidImage,
    LanguageResourceMissing,
    CredentialError,
    ProviderError,
    InvalidInput,
    Internal,
}

impl ExtractError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::DependencyMissing { .. } => ErrorKind::DependencyMissing,
            ExtractError::CorruptDocument { .. } => ErrorKind::CorruptDocument,
            ExtractError::EmptyDocument { .. } => ErrorKind::EmptyDocument,
            ExtractError::InvalidImage { .. } => ErrorKind::InvalidImage,
            ExtractError::LanguageResourceMissing { .. } => ErrorKind::LanguageResourceMissing,
            ExtractError::CredentialError { .. } => ErrorKind::CredentialError,
            ExtractError::ProviderError { .. } => ErrorKind::ProviderError,
            ExtractError::FileNotFound { .. }
            | ExtractError::DownloadFailed { .. }
            | ExtractError::InvalidRequest(_)
            | ExtractError::InvalidConfig(_) => ErrorKind::InvalidInput,
            ExtractError::OutputWriteFailed { .. } | ExtractError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Shorthand for a [`ExtractError::CorruptDocument`] with a cause.
    pub fn corrupt(
        detail: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ExtractError::CorruptDocument {
            detail: detail.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a [`ExtractError::ProviderError`] without a cause.
    pub fn provider(provider: impl Into<String>, page: usize, detail: impl Into<String>) -> Self {
        ExtractError::ProviderError {
            provider: provider.into(),
            page,
            detail: detail.into(),
            source: None,
        }
    }
}

impl From<backend_locate::LocateError> for ExtractError {
    fn from(e: backend_locate::LocateError) -> Self {
        let dependency = e
            .backend()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "native backend".to_string());
        let hint = match e.backend() {
            Some(backend_locate::Backend::Pdfium) => {
                "Install a PDFium build (https://github.com/bblanchon/pdfium-binaries) and \
set PDFIUM_LIB_PATH=/path/to/libpdfium, or copy it into the scan2text cache directory."
            }
            Some(backend_locate::Backend::Tesseract) => {
                "Install Tesseract (apt install tesseract-ocr / brew install tesseract) or \
set TESSERACT_CMD=/path/to/tesseract."
            }
            None => "This platform is not supported.",
        };
        ExtractError::DependencyMissing {
            dependency,
            detail: e.to_string(),
            hint: hint.to_string(),
        }
    }
}
