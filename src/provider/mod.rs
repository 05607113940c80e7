//! Text-extraction providers: one page-unit image in, one text fragment out.
//!
//! Two variants ship with the crate:
//!
//! * [`tesseract::TesseractExtractor`]: local, offline, multi-language. Needs
//!   the `tesseract` executable and one `{code}.traineddata` per language.
//! * [`vision::VisionExtractor`]: Google Cloud Vision `TEXT_DETECTION`,
//!   one HTTP call per unit.
//!
//! Anything else (an in-house engine, a test stub) can implement
//! [`TextExtractor`] and be injected through
//! [`crate::config::ExtractionConfigBuilder::extractor`].

pub mod tessdata;
pub mod tesseract;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_server;

use crate::config::{ExtractionConfig, ExtractionRequest, ProviderKind};
use crate::document::{PageUnit, UnitPart};
use crate::error::ExtractError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Where a unit sits in the run, passed to every provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionContext {
    /// 1-based unit index.
    pub index: usize,
    pub total: usize,
    /// Originating page number.
    pub page: usize,
    pub part: UnitPart,
}

impl ExtractionContext {
    pub fn for_unit(unit: &PageUnit, index: usize, total: usize) -> Self {
        Self {
            index,
            total,
            page: unit.page,
            part: unit.part,
        }
    }
}

/// An image → text capability.
///
/// Implementations are called once per unit, strictly one at a time within
/// a run. They must not retry; any failure is fatal to the run.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Extract the text of one unit. An empty string is a valid result.
    async fn extract_text(
        &self,
        unit: &PageUnit,
        ctx: &ExtractionContext,
    ) -> Result<String, ExtractError>;
}

/// Pick the provider for a run.
///
/// An extractor injected through the config wins. Otherwise the request's
/// variant decides; the local engine is prepared here (executable located,
/// language data fetched) so a missing resource fails the run before any
/// rendering work.
pub async fn resolve_extractor(
    request: &ExtractionRequest,
    config: &ExtractionConfig,
) -> Result<Arc<dyn TextExtractor>, ExtractError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }

    let extractor: Arc<dyn TextExtractor> = match request.provider {
        ProviderKind::Local => {
            Arc::new(tesseract::TesseractExtractor::prepare(&request.languages, config).await?)
        }
        ProviderKind::Cloud => Arc::new(vision::VisionExtractor::from_config(config)?),
    };
    info!("Using {} provider ({})", request.provider, extractor.name());
    Ok(extractor)
}
