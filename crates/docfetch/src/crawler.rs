//! Crawl worker pool
//!
//! Design: a fixed number of tasks loop on [`Frontier::claim_next`]. Each
//! claimed page is fetched (the only suspension point), then extracted and
//! converted synchronously, its links are enqueued and the result is sent to
//! the collector as a [`PageOutcome`]. Workers exit when the frontier is
//! exhausted or the cancellation token fires; a fetch already in progress is
//! allowed to finish.

use crate::convert::is_html;
use crate::error::FetchError;
use crate::extract::ExtractOptions;
use crate::fetchers::{Fetcher, Page};
use crate::frontier::{Claim, Enqueue, Frontier, FrontierEntry};
use crate::layout::OutputLayout;
use crate::pipeline::{process_page, MarkdownArtifact};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Result of visiting one frontier entry
#[derive(Debug)]
pub enum PageOutcome {
    /// Page converted to markdown
    Converted(MarkdownArtifact),
    /// Page fetched but not converted
    Skipped { url: Url, reason: String },
    /// Page could not be fetched
    Failed { url: Url, reason: String },
}

/// Worker pool settings
#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    pub workers: usize,
    /// Consecutive failures against one host before backing off; 0 disables
    pub failure_threshold: u32,
    pub failure_backoff: Duration,
    pub extract: ExtractOptions,
}

/// Consecutive failure counts per host
#[derive(Debug)]
struct HostHealth {
    threshold: u32,
    failures: Mutex<HashMap<String, u32>>,
}

impl HostHealth {
    fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn record_success(&self, host: &str) {
        self.lock().remove(host);
    }

    fn record_failure(&self, host: &str) -> u32 {
        let mut failures = self.lock();
        let count = failures.entry(host.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// True if the next request to `host` must wait; resets the counter
    fn take_backoff(&self, host: &str) -> bool {
        if self.threshold == 0 {
            return false;
        }
        let mut failures = self.lock();
        match failures.get(host) {
            Some(&count) if count >= self.threshold => {
                failures.remove(host);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A configured crawl, ready to start
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    frontier: Arc<Frontier>,
    layout: OutputLayout,
    settings: CrawlerSettings,
    health: HostHealth,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        frontier: Frontier,
        layout: OutputLayout,
        settings: CrawlerSettings,
    ) -> Self {
        let health = HostHealth::new(settings.failure_threshold);
        Self {
            fetcher,
            frontier: Arc::new(frontier),
            layout,
            settings,
            health,
        }
    }

    /// Seed the frontier with the root and spawn the workers
    pub fn start(self, cancel: CancellationToken) -> CrawlHandle {
        self.frontier.seed();
        let workers = self.settings.workers.max(1);
        let (tx, rx) = mpsc::channel(workers * 4);
        let frontier = Arc::clone(&self.frontier);
        let crawler = Arc::new(self);

        info!(
            root = %crawler.frontier.target().root(),
            workers,
            fetcher = crawler.fetcher.name(),
            "Starting crawl"
        );

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let crawler = Arc::clone(&crawler);
            let tx = tx.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { crawler.worker(id, tx, cancel).await });
        }

        CrawlHandle {
            outcomes: rx,
            tasks,
            frontier,
        }
    }

    async fn worker(&self, id: usize, tx: mpsc::Sender<PageOutcome>, cancel: CancellationToken) {
        loop {
            let entry = match self.frontier.claim_next(&cancel).await {
                Claim::Ready(entry) => entry,
                Claim::Exhausted => break,
            };
            let outcome = AssertUnwindSafe(self.visit(&entry, &cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let reason = format!("page processing panicked: {}", panic_message(&*payload));
                    error!(url = %entry.url, reason = %reason, "Worker recovered from panic");
                    Some(PageOutcome::Failed {
                        url: entry.url.clone(),
                        reason,
                    })
                });
            // Every claim is balanced, panic or not.
            self.frontier.complete();

            if let Some(outcome) = outcome {
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        }
        debug!(worker = id, "Worker finished");
    }

    /// Fetch, convert and expand one entry
    ///
    /// Returns `None` only if cancellation interrupted a backoff wait before
    /// the fetch started.
    async fn visit(&self, entry: &FrontierEntry, cancel: &CancellationToken) -> Option<PageOutcome> {
        let host = entry.url.host_str().unwrap_or_default().to_ascii_lowercase();

        if self.health.take_backoff(&host) {
            warn!(
                host = %host,
                backoff_ms = self.settings.failure_backoff.as_millis() as u64,
                "Repeated failures, backing off"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.settings.failure_backoff) => {}
                _ = cancel.cancelled() => return None,
            }
        }

        let page = match self.fetcher.fetch(&entry.url).await {
            Ok(page) => {
                self.health.record_success(&host);
                page
            }
            Err(FetchError::UnsupportedContent(content_type)) => {
                self.health.record_success(&host);
                return Some(skipped(entry, format!("unsupported content type {content_type}")));
            }
            Err(e) => {
                let failures = self.health.record_failure(&host);
                warn!(url = %entry.url, error = %e, consecutive_failures = failures, "Fetch failed");
                return Some(PageOutcome::Failed {
                    url: entry.url.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(reason) = self.check_redirect(entry, &page) {
            return Some(skipped(entry, reason));
        }

        if !is_html(&page.content_type, &page.body) {
            let content_type = page.content_type.as_deref().unwrap_or("unknown");
            return Some(skipped(entry, format!("not HTML ({content_type})")));
        }

        let processed = process_page(
            &page,
            entry,
            self.frontier.target(),
            &self.layout,
            &self.settings.extract,
        );

        let mut queued = 0;
        for link in &processed.links {
            if self.frontier.try_enqueue(link, entry.depth + 1, Some(&processed.artifact.url))
                == Enqueue::Queued
            {
                queued += 1;
            }
        }
        debug!(
            url = %processed.artifact.url,
            depth = entry.depth,
            links = processed.links.len(),
            queued,
            "Converted page"
        );

        Some(PageOutcome::Converted(processed.artifact))
    }

    /// Reason to skip a redirected page, if any
    fn check_redirect(&self, entry: &FrontierEntry, page: &Page) -> Option<String> {
        if !page.was_redirected() {
            return None;
        }
        let target = self.frontier.target();
        if !target.in_scope(&page.final_url) {
            return Some(format!("redirected out of scope to {}", page.final_url));
        }
        let final_url = target.normalize(&page.final_url);
        if final_url != entry.url && !self.frontier.mark_seen(&final_url) {
            return Some(format!("redirect target {final_url} already crawled"));
        }
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn skipped(entry: &FrontierEntry, reason: String) -> PageOutcome {
    debug!(url = %entry.url, reason = %reason, "Skipped page");
    PageOutcome::Skipped {
        url: entry.url.clone(),
        reason,
    }
}

/// Running crawl
pub struct CrawlHandle {
    outcomes: mpsc::Receiver<PageOutcome>,
    tasks: JoinSet<()>,
    frontier: Arc<Frontier>,
}

impl CrawlHandle {
    /// Next page outcome; `None` once every worker has exited
    pub async fn next_outcome(&mut self) -> Option<PageOutcome> {
        self.outcomes.recv().await
    }

    /// Wait for the workers and return the frontier for inspection
    pub async fn join(mut self) -> Arc<Frontier> {
        self.outcomes.close();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Crawl worker panicked");
            }
        }
        self.frontier
    }
}
