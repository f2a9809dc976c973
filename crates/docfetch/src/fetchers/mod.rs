//! Page fetchers
//!
//! Design: the crawler only sees the [`Fetcher`] trait, so politeness and
//! transport are layered as wrappers around the HTTP implementation and
//! tests can drive the crawler with an in-memory site.

mod http;
mod rate_limit;

pub use http::{HttpFetcher, HttpFetcherBuilder, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
pub use rate_limit::RateLimitedFetcher;

use crate::error::FetchError;
use async_trait::async_trait;
use url::Url;

/// A fetched page, before extraction
#[derive(Debug, Clone)]
pub struct Page {
    /// URL that was requested
    pub url: Url,
    /// URL after following redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header, if any
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
    /// Body read stopped at the deadline; content is partial
    pub truncated: bool,
}

impl Page {
    /// True if the request was redirected to a different URL
    pub fn was_redirected(&self) -> bool {
        self.url != self.final_url
    }
}

/// Trait for page fetchers
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &'static str;

    /// Fetch one page
    ///
    /// Returns the page on a 2xx response with textual content; every other
    /// outcome is a [`FetchError`].
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}
