//! Per-host politeness
//!
//! Wraps any [`Fetcher`] with a keyed rate limiter so consecutive requests
//! to one host are spaced by at least the configured delay, while different
//! hosts proceed independently.

use crate::error::FetchError;
use crate::fetchers::{Fetcher, Page};
use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::time::Duration;
use url::Url;

/// A fetcher wrapper that enforces a minimum delay per host
pub struct RateLimitedFetcher<F> {
    inner: F,
    /// `None` when the delay is zero
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl<F: Fetcher> RateLimitedFetcher<F> {
    /// Wrap `inner`; a zero delay passes requests straight through
    pub fn new(inner: F, delay: Duration) -> Self {
        Self {
            inner,
            limiter: Quota::with_period(delay).map(RateLimiter::keyed),
        }
    }

    async fn wait_for_permit(&self, url: &Url) {
        if let Some(limiter) = &self.limiter {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            limiter.until_key_ready(&host).await;
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RateLimitedFetcher<F> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.wait_for_permit(url).await;
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    struct CountingFetcher(Arc<AtomicUsize>);

    #[async_trait]
    impl Fetcher for CountingFetcher {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: String::new(),
                truncated: false,
            })
        }
    }

    #[tokio::test]
    async fn test_zero_delay_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = RateLimitedFetcher::new(CountingFetcher(calls.clone()), Duration::ZERO);
        let url = Url::parse("https://example.com/").unwrap();

        let start = Instant::now();
        for _ in 0..5 {
            fetcher.fetch(&url).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_same_host_requests_are_spaced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher =
            RateLimitedFetcher::new(CountingFetcher(calls.clone()), Duration::from_millis(50));
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();

        let start = Instant::now();
        fetcher.fetch(&a).await.unwrap();
        fetcher.fetch(&b).await.unwrap();
        fetcher.fetch(&a).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(95));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.name(), "counting");
    }

    #[tokio::test]
    async fn test_hosts_are_limited_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher =
            RateLimitedFetcher::new(CountingFetcher(calls.clone()), Duration::from_secs(5));

        let start = Instant::now();
        fetcher
            .fetch(&Url::parse("https://one.example/").unwrap())
            .await
            .unwrap();
        fetcher
            .fetch(&Url::parse("https://two.example/").unwrap())
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
