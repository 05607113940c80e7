//! Configuration types for scan-to-text extraction.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ExtractionConfig`] describes the host: where the language data lives,
//!   which endpoint and credentials the cloud engine uses, how pages are
//!   rendered. It is built once through [`ExtractionConfigBuilder`] and can be
//!   shared by any number of concurrent runs; nothing in it is mutated.
//! * [`ExtractionRequest`] describes one run: which languages, which
//!   provider, how many pages, whether to split double-page scans.

use crate::error::ExtractError;
use crate::pipeline::rasterize::PdfRenderer;
use crate::progress::ProgressCallback;
use crate::provider::vision::VisionCredentials;
use crate::provider::TextExtractor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where missing `*.traineddata` files are fetched from.
pub const DEFAULT_TESSDATA_BASE_URL: &str = "https://raw.githubusercontent.com/nchanko/Myanmar-Ebook-OCR/44c4777dbfcf744390c5081c6341b11499499bf6/Tesseract-OCR/tessdata";

/// Google Cloud Vision REST endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";

/// Configuration shared by extraction runs.
///
/// # Example
/// ```rust
/// use scan2text::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .tessdata_dir("/var/lib/scan2text/tessdata")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for PDF pages. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for ~300 DPI scans; lower values visibly hurt
    /// accuracy on small print, higher ones mostly cost memory.
    pub dpi: u32,

    /// Longest rendered edge in pixels. Default: 6000.
    ///
    /// An A4 page at 300 DPI is 2480 × 3508 px. The cap only bites on
    /// oversized pages (posters, maps), where it scales the render down
    /// proportionally instead of allocating hundreds of megabytes.
    pub max_rendered_pixels: u32,

    /// Directory holding `{code}.traineddata` files. Default: `./tessdata`.
    pub tessdata_dir: PathBuf,

    /// Base URL for fetching missing language data.
    pub tessdata_base_url: String,

    /// Explicit tesseract executable. If None, discovered on the host.
    pub tesseract_path: Option<PathBuf>,

    /// Explicit PDFium library. If None, discovered on the host.
    pub pdfium_library_path: Option<PathBuf>,

    /// Cloud Vision endpoint (scheme + host). Default: Google's public API.
    pub vision_endpoint: String,

    /// Cloud Vision credentials. If None, resolved from the environment
    /// when a cloud run starts.
    pub vision_credentials: Option<VisionCredentials>,

    /// Timeout for one cloud OCR call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for URL inputs and language-data downloads, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed provider. Takes precedence over the request's
    /// provider variant.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Pre-constructed PDF renderer. If None, pdfium is used.
    pub renderer: Option<Arc<dyn PdfRenderer>>,

    /// Per-unit progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            tessdata_dir: PathBuf::from("tessdata"),
            tessdata_base_url: DEFAULT_TESSDATA_BASE_URL.to_string(),
            tesseract_path: None,
            pdfium_library_path: None,
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            vision_credentials: None,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            extractor: None,
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("tessdata_base_url", &self.tessdata_base_url)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("vision_endpoint", &self.vision_endpoint)
            .field("vision_credentials", &self.vision_credentials)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("extractor", &self.extractor.as_ref().map(|e| e.name().to_string()))
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PdfRenderer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = dir.into();
        self
    }

    pub fn tessdata_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.tessdata_base_url = url.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn vision_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.vision_endpoint = endpoint.into();
        self
    }

    pub fn vision_credentials(mut self, credentials: VisionCredentials) -> Self {
        self.config.vision_credentials = Some(credentials);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        for (name, url) in [
            ("tessdata base URL", &c.tessdata_base_url),
            ("vision endpoint", &c.vision_endpoint),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ExtractError::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// Which text-extraction provider a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Tesseract, offline, multi-language.
    #[default]
    Local,
    /// Google Cloud Vision text detection, online.
    Cloud,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Local => f.write_str("local"),
            ProviderKind::Cloud => f.write_str("cloud"),
        }
    }
}

/// Languages with a friendly name, as offered by the CLI.
pub const KNOWN_LANGUAGES: &[(&str, &str)] = &[("English", "eng"), ("Myanmar", "mya")];

/// Map a friendly language name (case-insensitive) or a raw code to a code.
pub fn language_code(name_or_code: &str) -> String {
    let trimmed = name_or_code.trim();
    KNOWN_LANGUAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Configuration for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Ordered language codes. Order is script priority for the local engine;
    /// for multi-script pages put the dominant script first (e.g. `mya`
    /// before `eng`). Ignored by the cloud provider.
    pub languages: Vec<String>,

    /// Provider variant, fixed for the whole run.
    pub provider: ProviderKind,

    /// Maximum pages to process; 0 means no explicit limit. The page
    /// ceiling always applies on top.
    pub page_limit: usize,

    /// Split every page into left and right halves.
    pub split: bool,
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            provider: ProviderKind::Local,
            page_limit: 0,
            split: false,
        }
    }
}

impl ExtractionRequest {
    /// A local-engine request for the given ordered languages.
    pub fn local<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            provider: ProviderKind::Local,
            ..Default::default()
        }
    }

    /// A cloud-engine request.
    pub fn cloud() -> Self {
        Self {
            languages: Vec::new(),
            provider: ProviderKind::Cloud,
            ..Default::default()
        }
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    /// Language argument for tesseract's `-l` flag, e.g. `mya+eng`.
    pub fn tesseract_languages(&self) -> String {
        self.languages.join("+")
    }

    /// Check the request against the selected provider.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.provider == ProviderKind::Cloud {
            return Ok(());
        }
        if self.languages.is_empty() {
            return Err(ExtractError::InvalidRequest(
                "the local OCR engine needs at least one language".into(),
            ));
        }
        if let Some(bad) = self.languages.iter().find(|c| !LANGUAGE_CODE.is_match(c)) {
            return Err(ExtractError::InvalidRequest(format!(
                "invalid language code '{bad}' (expected letters, digits or '_')"
            )));
        }
        Ok(())
    }
}
