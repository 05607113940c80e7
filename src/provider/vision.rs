//! Google Cloud Vision text detection.
//!
//! One `POST {endpoint}/v1/images:annotate` per unit with a single
//! `TEXT_DETECTION` feature. The first text annotation holds the full text
//! of the image; an image with no text yields no annotations and maps to
//! `""`.
//!
//! Credentials are ambient: an API key (sent in the `x-goog-api-key` header)
//! or an OAuth access token (sent as a bearer header), taken from the config
//! or, failing that, from `GOOGLE_VISION_API_KEY` / `GOOGLE_OAUTH_ACCESS_TOKEN`.

use super::{ExtractionContext, TextExtractor};
use crate::config::ExtractionConfig;
use crate::document::PageUnit;
use crate::error::ExtractError;
use crate::pipeline::encode::encode_base64_png;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

const NAME: &str = "google-vision";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub const API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// How requests to Cloud Vision are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum VisionCredentials {
    ApiKey(String),
    AccessToken(String),
}

impl VisionCredentials {
    /// Read credentials from the process environment. The API key wins when
    /// both are set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name| lookup(name).filter(|v: &String| !v.trim().is_empty());
        non_empty(API_KEY_ENV)
            .map(VisionCredentials::ApiKey)
            .or_else(|| non_empty(ACCESS_TOKEN_ENV).map(VisionCredentials::AccessToken))
    }
}

impl fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionCredentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            VisionCredentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateBatch<'a> {
    requests: [AnnotateRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    image: ImageContent<'a>,
    features: [Feature; 1],
}

#[derive(Serialize)]
struct ImageContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateBatchResponse {
    #[serde(default)]
    responses: Vec<AnnotateResponse>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a failed call to `CredentialError` or `ProviderError`.
///
/// HTTP 401/403, an API status of `UNAUTHENTICATED` / `PERMISSION_DENIED`,
/// or a message that mentions credentials all count as credential problems.
pub fn classify_failure(
    http_status: Option<u16>,
    api_status: Option<&str>,
    message: &str,
    page: usize,
) -> ExtractError {
    let credential = matches!(http_status, Some(401) | Some(403))
        || matches!(api_status, Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED"))
        || message.to_lowercase().contains("credential");

    let detail = match (http_status, api_status) {
        (Some(code), Some(status)) if !status.is_empty() => {
            format!("HTTP {code} {status}: {message}")
        }
        (Some(code), _) => format!("HTTP {code}: {message}"),
        (None, Some(status)) if !status.is_empty() => format!("{status}: {message}"),
        _ => message.to_string(),
    };

    if credential {
        ExtractError::CredentialError {
            provider: NAME.into(),
            detail,
        }
    } else {
        ExtractError::provider(NAME, page, detail)
    }
}

/// Pull the text out of a successful `images:annotate` body.
fn parse_response(body: &str, page: usize) -> Result<String, ExtractError> {
    let parsed: AnnotateBatchResponse = serde_json::from_str(body).map_err(|e| {
        ExtractError::ProviderError {
            provider: NAME.into(),
            page,
            detail: "malformed images:annotate response".into(),
            source: Some(Box::new(e)),
        }
    })?;

    if let Some(err) = parsed.error {
        return Err(classify_failure(None, Some(err.status.as_str()), &err.message, page));
    }
    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(err) = first.error {
        if err.code != 0 || !err.message.is_empty() {
            return Err(classify_failure(None, Some(err.status.as_str()), &err.message, page));
        }
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

/// Cloud Vision client for one endpoint and credential.
#[derive(Debug, Clone)]
pub struct VisionExtractor {
    endpoint: String,
    credentials: VisionCredentials,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl VisionExtractor {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: VisionCredentials,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
            timeout_secs,
            client,
        })
    }

    /// Build from config; credentials fall back to the environment.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::from_config_with_lookup(config, |name| std::env::var(name).ok())
    }

    /// Like [`from_config`](Self::from_config) with a custom variable source.
    pub fn from_config_with_lookup(
        config: &ExtractionConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ExtractError> {
        let credentials = config
            .vision_credentials
            .clone()
            .or_else(|| VisionCredentials::from_lookup(lookup))
            .ok_or_else(|| ExtractError::CredentialError {
                provider: NAME.into(),
                detail: format!("no credentials configured ({API_KEY_ENV} and {ACCESS_TOKEN_ENV} are unset)"),
            })?;
        Self::new(&config.vision_endpoint, credentials, config.api_timeout_secs)
    }

    fn annotate_url(&self) -> String {
        format!("{}/v1/images:annotate", self.endpoint)
    }
}

#[async_trait]
impl TextExtractor for VisionExtractor {
    fn name(&self) -> &str {
        NAME
    }

    async fn extract_text(
        &self,
        unit: &PageUnit,
        ctx: &ExtractionContext,
    ) -> Result<String, ExtractError> {
        let start = Instant::now();
        let page = ctx.page;

        let image = unit.image.clone();
        let content = tokio::task::spawn_blocking(move || encode_base64_png(&image))
            .await
            .map_err(|e| ExtractError::Internal(format!("PNG encoding task panicked: {e}")))?
            .map_err(|e| ExtractError::ProviderError {
                provider: NAME.into(),
                page,
                detail: "PNG encoding failed".into(),
                source: Some(Box::new(e)),
            })?;

        let body = AnnotateBatch {
            requests: [AnnotateRequest {
                image: ImageContent { content: &content },
                features: [Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let mut request = self.client.post(self.annotate_url()).json(&body);
        request = match &self.credentials {
            VisionCredentials::ApiKey(key) => request.header(API_KEY_HEADER, key.as_str()),
            VisionCredentials::AccessToken(token) => request.bearer_auth(token),
        };

        // Transport errors are reported without the request URL.
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::provider(NAME, page, format!("timed out after {}s", self.timeout_secs))
            } else {
                classify_failure(None, None, &e.without_url().to_string(), page)
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            classify_failure(Some(status.as_u16()), None, &e.without_url().to_string(), page)
        })?;

        if !status.is_success() {
            let api = serde_json::from_str::<AnnotateBatchResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_default();
            let message = if api.message.is_empty() {
                text.chars().take(200).collect()
            } else {
                api.message
            };
            return Err(classify_failure(
                Some(status.as_u16()),
                Some(api.status.as_str()),
                &message,
                page,
            ));
        }

        let extracted = parse_response(&text, page)?;
        debug!(
            "{} → {} chars in {} ms",
            unit.label(),
            extracted.len(),
            start.elapsed().as_millis()
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UnitPart;
    use crate::error::ErrorKind;
    use crate::provider::test_server::TestServer;
    use image::DynamicImage;
    use std::collections::HashMap;

    fn unit() -> (PageUnit, ExtractionContext) {
        let unit = PageUnit {
            page: 2,
            part: UnitPart::Left,
            image: DynamicImage::new_rgb8(4, 4),
        };
        let ctx = ExtractionContext::for_unit(&unit, 3, 4);
        (unit, ctx)
    }

    #[test]
    fn credentials_from_lookup() {
        let env: HashMap<&str, &str> = [(ACCESS_TOKEN_ENV, "tok")].into();
        let creds = VisionCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds, Some(VisionCredentials::AccessToken("tok".into())));

        let env: HashMap<&str, &str> = [(ACCESS_TOKEN_ENV, "tok"), (API_KEY_ENV, "key")].into();
        let creds = VisionCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds, Some(VisionCredentials::ApiKey("key".into())));

        let env: HashMap<&str, &str> = [(API_KEY_ENV, "  ")].into();
        assert!(VisionCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let dbg = format!("{:?}", VisionCredentials::ApiKey("AIza-secret".into()));
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn classification() {
        for err in [
            classify_failure(Some(401), None, "unauthorized", 1),
            classify_failure(Some(403), None, "forbidden", 1),
            classify_failure(None, Some("UNAUTHENTICATED"), "bad token", 1),
            classify_failure(None, Some("PERMISSION_DENIED"), "api disabled", 1),
            classify_failure(None, None, "Could not load default Credentials", 1),
        ] {
            assert_eq!(err.kind(), ErrorKind::CredentialError, "got: {err}");
        }

        let err = classify_failure(Some(500), Some("INTERNAL"), "backend error", 7);
        assert!(matches!(err, ExtractError::ProviderError { page: 7, .. }), "got: {err}");
        let err = classify_failure(None, None, "connection reset", 1);
        assert_eq!(err.kind(), ErrorKind::ProviderError);
    }

    #[test]
    fn parse_first_annotation() {
        let body = r#"{"responses":[{"textAnnotations":[
            {"description":"Hello\nworld","locale":"en"},
            {"description":"Hello"}]}]}"#;
        assert_eq!(parse_response(body, 1).unwrap(), "Hello\nworld");
    }

    #[test]
    fn parse_no_text_is_empty() {
        assert_eq!(parse_response(r#"{"responses":[{}]}"#, 1).unwrap(), "");
        assert_eq!(parse_response(r#"{"responses":[]}"#, 1).unwrap(), "");
    }

    #[test]
    fn parse_embedded_error() {
        let body = r#"{"responses":[{"error":{"code":7,"message":"denied","status":"PERMISSION_DENIED"}}]}"#;
        assert_eq!(parse_response(body, 1).unwrap_err().kind(), ErrorKind::CredentialError);

        let body = r#"{"responses":[{"error":{"code":3,"message":"Bad image data.","status":"INVALID_ARGUMENT"}}]}"#;
        assert_eq!(parse_response(body, 1).unwrap_err().kind(), ErrorKind::ProviderError);
    }

    #[test]
    fn parse_garbage_is_provider_error() {
        let err = parse_response("<html>oops</html>", 4).unwrap_err();
        assert!(matches!(err, ExtractError::ProviderError { page: 4, .. }));
    }

    #[test]
    fn from_config_prefers_explicit_credentials() {
        let config = ExtractionConfig::builder()
            .vision_endpoint("http://localhost:1/")
            .vision_credentials(VisionCredentials::AccessToken("t".into()))
            .build()
            .unwrap();
        let v = VisionExtractor::from_config(&config).unwrap();
        assert_eq!(v.annotate_url(), "http://localhost:1/v1/images:annotate");
        assert_eq!(v.credentials, VisionCredentials::AccessToken("t".into()));
    }

    #[tokio::test]
    async fn api_key_request_and_text() {
        let server = TestServer::start(
            200,
            r#"{"responses":[{"textAnnotations":[{"description":"မင်္ဂလာပါ"}]}]}"#,
        )
        .await;
        let v = VisionExtractor::new(&server.url, VisionCredentials::ApiKey("k123".into()), 5)
            .unwrap();
        let (unit, ctx) = unit();

        assert_eq!(v.extract_text(&unit, &ctx).await.unwrap(), "မင်္ဂလာပါ");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(
            requests[0].starts_with("POST /v1/images:annotate "),
            "got: {}",
            requests[0]
        );
        assert!(requests[0].to_lowercase().contains("x-goog-api-key: k123"));
        assert!(requests[0].contains(r#""type":"TEXT_DETECTION""#));
        assert!(requests[0].contains(r#""content":""#));
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = TestServer::start(200, r#"{"responses":[{}]}"#).await;
        let v = VisionExtractor::new(&server.url, VisionCredentials::AccessToken("ya29".into()), 5)
            .unwrap();
        let (unit, ctx) = unit();

        assert_eq!(v.extract_text(&unit, &ctx).await.unwrap(), "");
        let request = server.requests().remove(0).to_lowercase();
        assert!(request.contains("authorization: bearer ya29"), "got: {request}");
    }

    #[tokio::test]
    async fn unauthorized_is_credential_error() {
        let server = TestServer::start(
            401,
            r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#,
        )
        .await;
        let v = VisionExtractor::new(&server.url, VisionCredentials::ApiKey("bad".into()), 5)
            .unwrap();
        let (unit, ctx) = unit();

        let err = v.extract_text(&unit, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialError, "got: {err}");
        assert!(err.to_string().contains("UNAUTHENTICATED"));
    }

    #[tokio::test]
    async fn server_error_is_provider_error() {
        let server = TestServer::start(500, "upstream exploded").await;
        let v = VisionExtractor::new(&server.url, VisionCredentials::ApiKey("k".into()), 5)
            .unwrap();
        let (unit, ctx) = unit();

        let err = v.extract_text(&unit, &ctx).await.unwrap_err();
        assert!(matches!(err, ExtractError::ProviderError { page: 2, .. }), "got: {err}");
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_api_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let v = VisionExtractor::new(&url, VisionCredentials::ApiKey("SECRETKEY123".into()), 5)
            .unwrap();
        let (unit, ctx) = unit();

        let err = v.extract_text(&unit, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderError, "got: {err}");
        let msg = err.to_string();
        assert!(!msg.contains("SECRETKEY123"), "got: {msg}");
        assert!(!format!("{err:?}").contains("SECRETKEY123"));
    }

    #[test]
    fn from_config_without_credentials_is_credential_error() {
        let config = ExtractionConfig::builder()
            .vision_endpoint("http://localhost:1")
            .build()
            .unwrap();
        let err = VisionExtractor::from_config_with_lookup(&config, |_| None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialError, "got: {err}");
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn from_config_falls_back_to_lookup() {
        let config = ExtractionConfig::builder()
            .vision_endpoint("http://localhost:1")
            .build()
            .unwrap();
        let v = VisionExtractor::from_config_with_lookup(&config, |k| {
            (k == ACCESS_TOKEN_ENV).then(|| "ya29".to_string())
        })
        .unwrap();
        assert_eq!(v.credentials, VisionCredentials::AccessToken("ya29".into()));
    }
}
