//! Run orchestration
//!
//! Validates the configuration, checks the output is writable, starts the crawler and
//! consumes its outcomes: writing artifacts, collecting index entries and
//! building the [`RunSummary`].

use crate::config::CrawlConfig;
use crate::crawler::{Crawler, CrawlerSettings, PageOutcome};
use crate::error::DocFetchError;
use crate::extract::ExtractOptions;
use crate::fetchers::{Fetcher, HttpFetcher, RateLimitedFetcher};
use crate::frontier::Frontier;
use crate::index::IndexBuilder;
use crate::summary::{RunSummary, StopReason};
use crate::writer::{write_atomic, Writer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Crawl, convert and write according to `config`
///
/// Cancelling `cancel` stops the crawl gracefully: no new pages are claimed,
/// in-flight fetches finish and everything converted so far is written.
pub async fn run(
    config: &CrawlConfig,
    cancel: CancellationToken,
) -> Result<RunSummary, DocFetchError> {
    config.validate()?;
    let http = HttpFetcher::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout)
        .max_redirects(config.max_redirects)
        .build()
        .map_err(DocFetchError::Fetcher)?;
    let fetcher = Arc::new(RateLimitedFetcher::new(http, config.delay));
    run_with_fetcher(config, fetcher, cancel).await
}

/// Same as [`run`] with a caller-supplied fetcher
pub async fn run_with_fetcher(
    config: &CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<RunSummary, DocFetchError> {
    let started = Instant::now();
    let target = config.validate()?;
    let layout = config.output_layout();
    Writer::check_writable(&layout).await?;

    let mut summary = RunSummary::new(target.root().as_str());
    let crawl_cancel = cancel.child_token();
    let timed_out = Arc::new(AtomicBool::new(false));
    let timer = config.run_timeout.map(|limit| {
        let crawl_cancel = crawl_cancel.clone();
        let timed_out = Arc::clone(&timed_out);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(limit) => {
                    warn!(limit_secs = limit.as_secs(), "Run timeout reached, stopping crawl");
                    timed_out.store(true, Ordering::SeqCst);
                    crawl_cancel.cancel();
                }
                _ = crawl_cancel.cancelled() => {}
            }
        })
    });

    let frontier = Frontier::new(target, config.max_depth, config.max_pages);
    let settings = CrawlerSettings {
        workers: config.workers,
        failure_threshold: config.failure_threshold,
        failure_backoff: config.failure_backoff,
        extract: ExtractOptions {
            min_content_chars: config.min_content_chars,
        },
    };
    let mut handle = Crawler::new(fetcher, frontier, layout.clone(), settings)
        .start(crawl_cancel.clone());

    let mut writer = Writer::new(layout.clone());
    let mut index = IndexBuilder::new();

    while let Some(outcome) = handle.next_outcome().await {
        match outcome {
            PageOutcome::Converted(artifact) => {
                summary.fetched += 1;
                match writer.accept(&artifact).await {
                    Ok(_) => {
                        summary.converted += 1;
                        index.add_artifact(&artifact);
                    }
                    Err(e) => summary.record_failure(artifact.url.as_str(), e.to_string()),
                }
            }
            PageOutcome::Skipped { url, reason } => {
                summary.fetched += 1;
                summary.record_skip(url, reason);
            }
            PageOutcome::Failed { url, reason } => summary.record_failure(url, reason),
        }
    }

    let frontier = handle.join().await;
    crawl_cancel.cancel();
    if let Some(timer) = timer {
        let _ = timer.await;
    }

    let report = writer.finish().await?;
    summary.files = report.files;

    if config.llm_txt {
        let path = layout.index_path();
        write_atomic(&path, index.render().as_bytes()).await?;
        summary.files.push(path.clone());
        summary.index_file = Some(path);
        summary.indexed = index.len();
    }

    summary.stop_reason = if timed_out.load(Ordering::SeqCst) {
        StopReason::Timeout
    } else if cancel.is_cancelled() {
        StopReason::Interrupted
    } else if frontier.budget_reached() {
        StopReason::PageBudget
    } else {
        StopReason::Completed
    };
    summary.elapsed = started.elapsed();

    info!(
        stop_reason = %summary.stop_reason,
        fetched = summary.fetched,
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed,
        seen = frontier.seen_count(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Crawl finished"
    );
    if summary.is_partial() {
        warn!(
            failed = summary.failed,
            stop_reason = %summary.stop_reason,
            "Output is incomplete"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, FetchError, WriteError};
    use crate::fetchers::Page;
    use async_trait::async_trait;
    use std::time::Duration;
    use url::Url;

    /// Serves every path with a page linking to one deeper path
    struct EndlessSite {
        delay: Duration,
    }

    #[async_trait]
    impl Fetcher for EndlessSite {
        fn name(&self) -> &'static str {
            "endless"
        }

        async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
            tokio::time::sleep(self.delay).await;
            let next = format!("{}x/", url.path());
            Ok(Page {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: format!(
                    "<html><head><title>Page</title></head><body><main>\
                     <p>Some page content long enough to count.</p>\
                     <a href=\"{next}\">next</a><a href=\"{next}y\">other</a></main></body></html>"
                ),
                truncated: false,
            })
        }
    }

    fn config(dir: &std::path::Path) -> CrawlConfig {
        CrawlConfig::new("https://docs.test/")
            .output(dir.join("docs.md"))
            .depth(10)
            .workers(2)
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_crawling() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(&config(dir.path()).depth(11), CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(DocFetchError::Config(ConfigError::DepthTooHigh { .. }))
        ));
        assert!(!dir.path().join("docs.md").exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // The output path is an existing directory but a single file is forced.
        let config = config(dir.path())
            .output(dir.path())
            .layout(crate::layout::LayoutMode::File);
        let site = Arc::new(EndlessSite {
            delay: Duration::ZERO,
        });
        let result = run_with_fetcher(&config, site, CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(DocFetchError::Output(WriteError::Unwritable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_page_budget_stop_reason() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(EndlessSite {
            delay: Duration::ZERO,
        });
        let summary = run_with_fetcher(
            &config(dir.path()).max_pages(5).llm_txt(true),
            site,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.stop_reason, StopReason::PageBudget);
        assert_eq!(summary.converted, 5);
        assert_eq!(summary.indexed, 5);
        assert_eq!(
            summary.index_file.as_deref(),
            Some(dir.path().join("docs.llm.txt").as_path())
        );
        assert!(dir.path().join("docs.md").exists());
    }

    #[tokio::test]
    async fn test_run_timeout_stops_crawl_and_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(EndlessSite {
            delay: Duration::from_millis(30),
        });
        let summary = run_with_fetcher(
            &config(dir.path()).run_timeout(Some(Duration::from_millis(200))),
            site,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Timeout);
        assert!(summary.converted >= 1);
        let text = std::fs::read_to_string(dir.path().join("docs.md")).unwrap();
        assert!(text.starts_with("# Documentation"));
    }

    #[tokio::test]
    async fn test_interrupt() {
        let dir = tempfile::tempdir().unwrap();
        let site = Arc::new(EndlessSite {
            delay: Duration::from_millis(30),
        });
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let summary = run_with_fetcher(&config(dir.path()), site, cancel)
            .await
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert!(summary.converted >= 1);
    }
}
