//! Language-data store for the local OCR engine.
//!
//! Tesseract needs one `{code}.traineddata` per requested language in the
//! directory passed as `--tessdata-dir`. A file that is already present is
//! used as-is and never overwritten; a missing one is fetched once from
//! `{base_url}/{code}.traineddata`. Downloads land in a `.part` file first
//! and are renamed into place, so a crash mid-download never leaves a
//! truncated model behind.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A directory of `*.traineddata` files plus where to fetch missing ones.
#[derive(Debug, Clone)]
pub struct LanguageStore {
    dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl LanguageStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            dir: dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::new(
            &config.tessdata_dir,
            &config.tessdata_base_url,
            config.download_timeout_secs,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}.traineddata"))
    }

    pub fn url_for(&self, code: &str) -> String {
        format!("{}/{code}.traineddata", self.base_url)
    }

    /// Make sure `{code}.traineddata` exists, downloading it if needed.
    pub async fn ensure(&self, code: &str) -> Result<PathBuf, ExtractError> {
        let dest = self.path_for(code);
        if is_file(&dest).await {
            debug!("Language data present: {}", dest.display());
            return Ok(dest);
        }

        let missing = |detail: String| {
            warn!("Language data '{}' unavailable: {}", code, detail);
            ExtractError::LanguageResourceMissing {
                code: code.to_string(),
                detail,
            }
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            missing(format!(
                "could not create directory '{}': {e}",
                self.dir.display()
            ))
        })?;

        let url = self.url_for(code);
        info!("Downloading language data '{}' from {}", code, url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| missing(format!("request to {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(missing(format!("{url} returned HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| missing(format!("download from {url} interrupted: {e}")))?;
        if bytes.is_empty() {
            return Err(missing(format!("{url} returned an empty body")));
        }

        // Another run may have finished the same download meanwhile.
        if is_file(&dest).await {
            return Ok(dest);
        }

        let tmp_path = dest.with_extension(format!("traineddata.{}.part", std::process::id()));
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| missing(format!("could not write '{}': {e}", tmp_path.display())))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &dest).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(missing(format!(
                "could not move download into '{}': {e}",
                dest.display()
            )));
        }

        info!("Saved {} ({} bytes)", dest.display(), bytes.len());
        Ok(dest)
    }

    /// [`ensure`](Self::ensure) every code, in order; the first failure wins.
    pub async fn ensure_all(&self, codes: &[String]) -> Result<(), ExtractError> {
        for code in codes {
            self.ensure(code).await?;
        }
        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_server::TestServer;

    #[tokio::test]
    async fn present_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eng.traineddata"), b"local model").unwrap();
        // Nothing listens here; a fetch attempt would fail.
        let store = LanguageStore::new(dir.path(), "http://127.0.0.1:9", 2).unwrap();

        let path = store.ensure("eng").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"local model");
    }

    #[tokio::test]
    async fn missing_file_is_fetched_once() {
        let server = TestServer::start(200, "fake model bytes").await;
        let dir = tempfile::tempdir().unwrap();
        let store = LanguageStore::new(dir.path().join("tessdata"), &server.url, 5).unwrap();

        let path = store.ensure("mya").await.unwrap();
        assert_eq!(path, dir.path().join("tessdata").join("mya.traineddata"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fake model bytes");

        store.ensure("mya").await.unwrap();
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /mya.traineddata "), "got: {}", requests[0]);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("tessdata"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_language_resource_missing() {
        let server = TestServer::start(404, "").await;
        let dir = tempfile::tempdir().unwrap();
        let store = LanguageStore::new(dir.path(), &server.url, 5).unwrap();

        let err = store.ensure("xyz").await.unwrap_err();
        match err {
            ExtractError::LanguageResourceMissing { code, detail } => {
                assert_eq!(code, "xyz");
                assert!(detail.contains("404"), "got: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("xyz.traineddata").exists());
    }

    #[tokio::test]
    async fn unreachable_host_is_language_resource_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LanguageStore::new(dir.path(), "http://127.0.0.1:9", 2).unwrap();
        let err = store.ensure_all(&["eng".to_string()]).await.unwrap_err();
        assert!(matches!(err, ExtractError::LanguageResourceMissing { .. }), "got: {err}");
    }

    #[test]
    fn urls_and_paths() {
        let store = LanguageStore::new("/data/tess", "https://example.com/tessdata/", 5).unwrap();
        assert_eq!(store.url_for("eng"), "https://example.com/tessdata/eng.traineddata");
        assert_eq!(store.path_for("eng"), PathBuf::from("/data/tess/eng.traineddata"));
    }
}
