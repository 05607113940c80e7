//! Input resolution: normalise a user-supplied path or URL to a [`Document`].
//!
//! Both pdfium and the image decoder work from byte slices, so nothing is
//! staged on disk: local files are read, URLs are downloaded, and the kind is
//! sniffed from magic bytes. Anything that is neither a PDF nor a PNG/JPEG is
//! rejected here, before a provider is prepared.

use crate::document::{Document, DocumentKind};
use crate::error::ExtractError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Document, ExtractError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

/// Wrap raw bytes, detecting their kind.
pub fn document_from_bytes(bytes: Vec<u8>) -> Result<Document, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::EmptyDocument {
            detail: "no bytes received".into(),
        });
    }
    match DocumentKind::detect(&bytes) {
        Some(kind) => Ok(Document::new(bytes, kind)),
        None => {
            let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
            Err(ExtractError::CorruptDocument {
                detail: format!("not a PDF, PNG or JPEG (first bytes: {magic:?})"),
                source: None,
            })
        }
    }
}

async fn resolve_local(path_str: &str) -> Result<Document, ExtractError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::FileNotFound { path });
        }
        Err(e) => {
            return Err(ExtractError::corrupt(
                format!("could not read '{}'", path.display()),
                e,
            ));
        }
    };

    let document = document_from_bytes(bytes)?;
    debug!(
        "Resolved local {} ({} bytes): {}",
        document.kind(),
        document.len(),
        path.display()
    );
    Ok(document)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, ExtractError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("timed out after {timeout_secs}s")
        } else {
            e.to_string()
        };
        ExtractError::DownloadFailed {
            url: url.to_string(),
            reason,
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    document_from_bytes(bytes.to_vec())
}
