//! DocFetch - documentation site crawler and Markdown converter
//!
//! This crate crawls a documentation site breadth-first, isolates the main
//! content of every page, converts it to Markdown and optionally writes an
//! `llm.txt` index that groups pages by kind for LLM tooling.
//!
//! ## Pipeline
//!
//! - [`Frontier`] - the shared work queue and seen-set of a crawl
//! - [`Fetcher`] - page retrieval; [`HttpFetcher`] wrapped in a per-host
//!   [`RateLimitedFetcher`] by default
//! - [`extract`] - noise removal and main content selection over an arena DOM
//! - [`convert`] - deterministic HTML to Markdown
//! - [`IndexBuilder`] - the `llm.txt` semantic index
//! - [`Writer`] - single-file or directory output with atomic writes
//!
//! [`run`] ties these together:
//!
//! ```no_run
//! use docfetch::{run, CrawlConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), docfetch::DocFetchError> {
//! let config = CrawlConfig::new("https://docs.example.com/")
//!     .output("docs.md")
//!     .llm_txt(true);
//! let summary = run(&config, CancellationToken::new()).await?;
//! eprintln!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod config;
pub mod convert;
mod crawler;
pub mod dom;
mod error;
pub mod extract;
pub mod fetchers;
mod frontier;
mod index;
pub mod layout;
mod pipeline;
mod run;
mod scope;
mod summary;
mod writer;

pub use classify::{classify, Category};
pub use config::{CrawlConfig, ScopeMode, MAX_DEPTH, MAX_WORKERS};
pub use convert::{html_to_markdown, LinkRewriter};
pub use crawler::{CrawlHandle, Crawler, CrawlerSettings, PageOutcome};
pub use error::{ConfigError, DocFetchError, FetchError, WriteError};
pub use extract::{ExtractOptions, ExtractedDocument};
pub use fetchers::{Fetcher, HttpFetcher, Page, RateLimitedFetcher};
pub use frontier::{Claim, Enqueue, Frontier, FrontierEntry};
pub use index::{IndexBuilder, IndexEntry, LLM_TXT_HEADER};
pub use layout::{LayoutMode, OutputLayout};
pub use pipeline::{process_page, MarkdownArtifact, ProcessedPage};
pub use run::{run, run_with_fetcher};
pub use scope::{CrawlTarget, QueryPolicy, ScopeRule};
pub use summary::{PageReport, RunSummary, StopReason};
pub use writer::{write_atomic, WriteReport, Writer, SINGLE_FILE_HEADER};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "DocFetch/1.0";
