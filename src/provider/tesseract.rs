//! Local OCR through the `tesseract` executable.
//!
//! Each unit is staged as a PNG in a temp file and the engine is run as
//!
//! ```text
//! tesseract <unit.png> stdout --tessdata-dir <dir> -l mya+eng
//! ```
//!
//! Language order is script priority, so the dominant script goes first.
//! The temp file is removed as soon as the call returns.

use super::tessdata::LanguageStore;
use super::{ExtractionContext, TextExtractor};
use crate::config::ExtractionConfig;
use crate::document::PageUnit;
use crate::error::ExtractError;
use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::debug;

const NAME: &str = "tesseract";

/// Tesseract bound to one executable, one language directory and one
/// language list.
#[derive(Debug, Clone)]
pub struct TesseractExtractor {
    executable: PathBuf,
    tessdata_dir: PathBuf,
    languages: String,
}

impl TesseractExtractor {
    /// Use `executable` as-is; language data is assumed to be in place.
    pub fn new(
        executable: impl Into<PathBuf>,
        tessdata_dir: impl Into<PathBuf>,
        languages: &[String],
    ) -> Self {
        Self {
            executable: executable.into(),
            tessdata_dir: tessdata_dir.into(),
            languages: languages.join("+"),
        }
    }

    /// Locate the executable and fetch any missing language data.
    pub async fn prepare(
        languages: &[String],
        config: &ExtractionConfig,
    ) -> Result<Self, ExtractError> {
        if languages.is_empty() {
            return Err(ExtractError::InvalidRequest(
                "the local OCR engine needs at least one language".into(),
            ));
        }

        let executable = backend_locate::locate_tesseract(config.tesseract_path.as_deref())?;
        debug!("Tesseract executable: {}", executable.display());

        let store = LanguageStore::from_config(config)?;
        store.ensure_all(languages).await?;

        Ok(Self::new(executable, store.dir(), languages))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The `-l` argument, e.g. `mya+eng`.
    pub fn languages(&self) -> &str {
        &self.languages
    }
}

/// Encode the unit and write it to a `.png` temp file.
fn stage_png(unit: &PageUnit) -> Result<NamedTempFile, String> {
    let png = encode_png(&unit.image).map_err(|e| format!("PNG encoding failed: {e}"))?;
    let mut file = tempfile::Builder::new()
        .prefix("scan2text-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| format!("could not create temp file: {e}"))?;
    file.write_all(&png)
        .and_then(|_| file.flush())
        .map_err(|e| format!("could not write temp file: {e}"))?;
    Ok(file)
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &str {
        NAME
    }

    async fn extract_text(
        &self,
        unit: &PageUnit,
        ctx: &ExtractionContext,
    ) -> Result<String, ExtractError> {
        let start = Instant::now();

        let staged_unit = unit.clone();
        let staged = tokio::task::spawn_blocking(move || stage_png(&staged_unit))
            .await
            .map_err(|e| ExtractError::Internal(format!("PNG staging task panicked: {e}")))?
            .map_err(|detail| ExtractError::provider(NAME, ctx.page, detail))?;

        let output = tokio::process::Command::new(&self.executable)
            .arg(staged.path())
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&self.tessdata_dir)
            .arg("-l")
            .arg(&self.languages)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractError::ProviderError {
                provider: NAME.into(),
                page: ctx.page,
                detail: format!("could not run '{}'", self.executable.display()),
                source: Some(Box::new(e)),
            })?;
        drop(staged);

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ExtractError::provider(
                NAME,
                ctx.page,
                format!("{} ({})", output.status, stderr.trim()),
            ));
        }
        if !stderr.trim().is_empty() {
            debug!("tesseract stderr for {}: {}", unit.label(), stderr.trim());
        }

        let text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        debug!(
            "{} → {} chars in {} ms",
            unit.label(),
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UnitPart;
    use image::DynamicImage;

    fn unit() -> (PageUnit, ExtractionContext) {
        let unit = PageUnit {
            page: 3,
            part: UnitPart::Whole,
            image: DynamicImage::new_rgb8(16, 8),
        };
        let ctx = ExtractionContext::for_unit(&unit, 1, 1);
        (unit, ctx)
    }

    #[test]
    fn languages_join_in_priority_order() {
        let t = TesseractExtractor::new("tesseract", "tessdata", &["mya".into(), "eng".into()]);
        assert_eq!(t.languages(), "mya+eng");
    }

    #[tokio::test]
    async fn prepare_rejects_empty_languages() {
        let config = ExtractionConfig::default();
        let err = TesseractExtractor::prepare(&[], &config).await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn prepare_without_engine_is_dependency_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::builder()
            .tesseract_path(dir.path().join("no-such-tesseract"))
            .tessdata_dir(dir.path().join("tessdata"))
            .build()
            .unwrap();

        let err = TesseractExtractor::prepare(&["eng".into()], &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DependencyMissing, "got: {err}");
        assert!(err.to_string().contains("no-such-tesseract"), "got: {err}");
        assert!(!dir.path().join("tessdata").exists());
    }

    #[tokio::test]
    async fn missing_executable_is_a_provider_error() {
        let t = TesseractExtractor::new("/nonexistent/tesseract", "tessdata", &["eng".into()]);
        let (unit, ctx) = unit();
        let err = t.extract_text(&unit, &ctx).await.unwrap_err();
        assert!(matches!(err, ExtractError::ProviderError { page: 3, .. }), "got: {err}");
    }

    #[cfg(unix)]
    fn fake_engine(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_engine_with_expected_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(
            dir.path(),
            r#"test -s "$1" || exit 3
shift
echo "$@"
printf '\n\f'"#,
        );
        let t = TesseractExtractor::new(&exe, "/data/tessdata", &["mya".into(), "eng".into()]);
        let (unit, ctx) = unit();

        let text = t.extract_text(&unit, &ctx).await.unwrap();
        assert_eq!(text, "stdout --tessdata-dir /data/tessdata -l mya+eng");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(
            dir.path(),
            "echo 'Failed loading language xyz' >&2\nexit 1",
        );
        let t = TesseractExtractor::new(&exe, "tessdata", &["xyz".into()]);
        let (unit, ctx) = unit();

        let err = t.extract_text(&unit, &ctx).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed loading language xyz"), "got: {msg}");
        assert_eq!(err.kind(), crate::error::ErrorKind::ProviderError);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prepare_uses_configured_executable_and_present_data() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "echo ok");
        let tessdata = dir.path().join("tessdata");
        std::fs::create_dir_all(&tessdata).unwrap();
        std::fs::write(tessdata.join("eng.traineddata"), b"model").unwrap();

        let config = ExtractionConfig::builder()
            .tesseract_path(&exe)
            .tessdata_dir(&tessdata)
            .tessdata_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let t = TesseractExtractor::prepare(&["eng".into()], &config).await.unwrap();
        assert_eq!(t.executable(), exe.as_path());
        let (unit, ctx) = unit();
        assert_eq!(t.extract_text(&unit, &ctx).await.unwrap(), "ok");
    }
}
