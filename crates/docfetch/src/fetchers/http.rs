//! HTTP fetcher
//!
//! Plain GET over reqwest with redirect following, binary content detection
//! and a body deadline that keeps partial content.

use crate::error::FetchError;
use crate::fetchers::{Fetcher, Page};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Accept header sent with every request
const ACCEPT_HTML: &str = "text/html, application/xhtml+xml, text/plain;q=0.9, */*;q=0.8";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for the connect phase
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default redirect limit
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// reqwest-backed [`Fetcher`]
///
/// The client is built once and shared by every worker.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Start building a fetcher
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::default()
    }
}

/// Builder for [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcherBuilder {
    user_agent: String,
    timeout: Duration,
    max_redirects: usize,
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl HttpFetcherBuilder {
    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout (response headers and body each)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of redirects to follow
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Result<HttpFetcher, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.timeout.min(MAX_CONNECT_TIMEOUT))
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(HttpFetcher {
            client,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FetchError::InvalidUrlScheme);
        }

        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                return Err(FetchError::UnsupportedContent(ct.clone()));
            }
        }

        let (body, truncated) = read_body_with_timeout(response, self.timeout).await;
        debug!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            truncated,
            "Fetched page"
        );

        Ok(Page {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

/// Check if content type indicates binary content
pub(crate) fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read response body with timeout, returning partial content if timeout occurs
async fn read_body_with_timeout(response: reqwest::Response, timeout: Duration) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => {
                        return (Bytes::from(body), false);
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary_content_type() {
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("Image/JPEG"));
        assert!(is_binary_content_type("application/pdf"));
        assert!(is_binary_content_type("application/octet-stream"));
        assert!(is_binary_content_type("application/vnd.ms-excel"));
        assert!(is_binary_content_type("font/woff2"));

        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("text/plain"));
        assert!(!is_binary_content_type("application/xhtml+xml"));
    }

    #[test]
    fn test_builder_defaults() {
        let builder = HttpFetcher::builder();
        assert_eq!(builder.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert_eq!(builder.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_builder_accepts_invalid_user_agent() {
        let fetcher = HttpFetcher::builder()
            .user_agent("bad\nagent")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(fetcher.name(), "http");
        assert_eq!(fetcher.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpFetcher::builder().build().unwrap();
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert!(matches!(
            fetcher.fetch(&url).await,
            Err(FetchError::InvalidUrlScheme)
        ));
    }
}
