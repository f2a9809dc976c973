//! End-of-run summary

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why the crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Frontier exhausted
    Completed,
    /// Page budget spent with work still queued
    PageBudget,
    /// Whole-run timeout fired
    Timeout,
    /// Cancelled by the caller (Ctrl-C)
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Completed => "completed",
            StopReason::PageBudget => "page budget reached",
            StopReason::Timeout => "run timeout reached",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// A page that was skipped or failed, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub url: String,
    pub reason: String,
}

impl PageReport {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Crawl root
    pub root: String,
    pub stop_reason: StopReason,
    /// Successful HTTP responses
    pub fetched: usize,
    /// Pages converted to markdown and written
    pub converted: usize,
    /// Fetched pages that were not converted
    pub skipped: usize,
    /// Pages that could not be fetched or written
    pub failed: usize,
    /// Entries in the llm.txt index
    pub indexed: usize,
    pub skips: Vec<PageReport>,
    pub failures: Vec<PageReport>,
    /// Files written, index included
    pub files: Vec<PathBuf>,
    pub index_file: Option<PathBuf>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Empty summary for a root URL
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            stop_reason: StopReason::Completed,
            fetched: 0,
            converted: 0,
            skipped: 0,
            failed: 0,
            indexed: 0,
            skips: Vec::new(),
            failures: Vec::new(),
            files: Vec::new(),
            index_file: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn record_skip(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        self.skipped += 1;
        self.skips.push(PageReport::new(url, reason));
    }

    pub fn record_failure(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.failures.push(PageReport::new(url, reason));
    }

    /// True if pages failed or the crawl stopped before the frontier ran dry
    pub fn is_partial(&self) -> bool {
        self.failed > 0 || self.stop_reason != StopReason::Completed
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Crawl of {} {} in {:.1}s: {} fetched, {} converted, {} skipped, {} failed",
            self.root,
            self.stop_reason,
            self.elapsed.as_secs_f64(),
            self.fetched,
            self.converted,
            self.skipped,
            self.failed
        )?;
        if !self.failures.is_empty() {
            writeln!(f, "Failed:")?;
            for page in &self.failures {
                writeln!(f, "  {} ({})", page.url, page.reason)?;
            }
        }
        if !self.skips.is_empty() {
            writeln!(f, "Skipped:")?;
            for page in &self.skips {
                writeln!(f, "  {} ({})", page.url, page.reason)?;
            }
        }
        if let Some(index) = &self.index_file {
            writeln!(f, "Index: {} ({} entries)", index.display(), self.indexed)?;
        }
        Ok(())
    }
}
