//! Run configuration
//!
//! [`CrawlConfig`] carries every knob of a run with the defaults used by the
//! command line. Builder-style setters allow `CrawlConfig::new(url).depth(3)`.
//! Nothing is checked until [`CrawlConfig::validate`], which runs before any
//! network or file system activity.

use crate::error::ConfigError;
use crate::extract::DEFAULT_MIN_CONTENT_CHARS;
use crate::fetchers::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use crate::layout::{LayoutMode, OutputLayout};
use crate::scope::{CrawlTarget, QueryPolicy, ScopeRule};
use crate::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::time::Duration;
use url::{Host, Url};

/// Hard limit on crawl depth
pub const MAX_DEPTH: u32 = 10;

/// Hard limit on concurrent workers
pub const MAX_WORKERS: usize = 20;

pub const DEFAULT_OUTPUT: &str = "docs.md";
pub const DEFAULT_DEPTH: u32 = 2;
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_MAX_PAGES: usize = 500;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(5);

/// Which URLs belong to the crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Same scheme, host and port as the root
    #[default]
    Origin,
    /// Same origin, under the root URL's directory
    Prefix,
}

/// Configuration of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Crawl root
    pub url: String,
    /// Output file or directory
    pub output: PathBuf,
    pub layout: LayoutMode,
    /// Also write the llm.txt index
    pub llm_txt: bool,
    /// Maximum link distance from the root
    pub max_depth: u32,
    /// Number of concurrent fetch workers
    pub workers: usize,
    /// Maximum number of fetch attempts
    pub max_pages: usize,
    pub user_agent: String,
    /// Minimum delay between requests to one host; zero disables
    pub delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Whole-run timeout; `None` disables
    pub run_timeout: Option<Duration>,
    pub scope: ScopeMode,
    pub query: QueryPolicy,
    /// Permit loopback, private and link-local hosts
    pub allow_private_hosts: bool,
    /// Consecutive failures against a host before backing off
    pub failure_threshold: u32,
    pub failure_backoff: Duration,
    /// Content shorter than this many characters is low-value
    pub min_content_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            layout: LayoutMode::Auto,
            llm_txt: false,
            max_depth: DEFAULT_DEPTH,
            workers: DEFAULT_WORKERS,
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            delay: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            run_timeout: Some(DEFAULT_RUN_TIMEOUT),
            scope: ScopeMode::Origin,
            query: QueryPolicy::Drop,
            allow_private_hosts: false,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
        }
    }
}

impl CrawlConfig {
    /// Default configuration for a root URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn layout(mut self, layout: LayoutMode) -> Self {
        self.layout = layout;
        self
    }

    pub fn llm_txt(mut self, enable: bool) -> Self {
        self.llm_txt = enable;
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn scope(mut self, scope: ScopeMode) -> Self {
        self.scope = scope;
        self
    }

    pub fn query(mut self, query: QueryPolicy) -> Self {
        self.query = query;
        self
    }

    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Set the consecutive-failure threshold and the backoff that follows it
    pub fn failure_backoff(mut self, threshold: u32, backoff: Duration) -> Self {
        self.failure_threshold = threshold;
        self.failure_backoff = backoff;
        self
    }

    /// Check limits and the root URL, returning the crawl target
    pub fn validate(&self) -> Result<CrawlTarget, ConfigError> {
        let root = self.root_url()?;

        if self.max_depth > MAX_DEPTH {
            return Err(ConfigError::DepthTooHigh {
                depth: self.max_depth,
                max: MAX_DEPTH,
            });
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkers {
                workers: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroPageBudget);
        }

        Ok(match self.scope {
            ScopeMode::Origin => CrawlTarget::new(&root, ScopeRule::SameOrigin, self.query),
            ScopeMode::Prefix => CrawlTarget::with_path_prefix(&root, self.query),
        })
    }

    /// Output layout for this configuration
    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout::resolve(&self.output, self.layout)
    }

    fn root_url(&self) -> Result<Url, ConfigError> {
        let raw = self.url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        let Some(host) = url.host() else {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            });
        };
        if !self.allow_private_hosts && is_private_host(&host) {
            return Err(ConfigError::PrivateHost(host.to_string()));
        }
        Ok(url)
    }
}

/// True for localhost names and loopback, private, link-local, multicast or
/// unspecified addresses
pub fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_ipv4(ip),
        Host::Ipv6(ip) => is_private_ipv6(ip),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_unspecified()
        || ip.is_broadcast()
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::new("https://docs.rs/");
        assert_eq!(config.output, PathBuf::from("docs.md"));
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.workers, 3);
        assert_eq!(config.user_agent, "DocFetch/1.0");
        assert_eq!(config.delay, Duration::from_millis(100));
        assert_eq!(config.run_timeout, Some(Duration::from_secs(600)));
        assert!(!config.llm_txt);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = CrawlConfig::new("https://docs.rs/")
            .output("site/")
            .depth(4)
            .workers(8)
            .llm_txt(true)
            .scope(ScopeMode::Prefix)
            .failure_backoff(2, Duration::from_millis(10));
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.workers, 8);
        assert_eq!(config.failure_threshold, 2);
        assert!(config.output_layout().is_directory());
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            CrawlConfig::new("").validate(),
            Err(ConfigError::MissingUrl)
        ));
        assert!(matches!(
            CrawlConfig::new("not a url").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            CrawlConfig::new("ftp://example.com/").validate(),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_rejects_private_hosts() {
        for url in [
            "http://localhost:8080/",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://192.168.0.10/",
            "http://169.254.1.1/",
            "http://0.0.0.0/",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://[::ffff:127.0.0.1]/",
        ] {
            assert!(
                matches!(
                    CrawlConfig::new(url).validate(),
                    Err(ConfigError::PrivateHost(_))
                ),
                "{url} should be rejected"
            );
        }
        assert!(CrawlConfig::new("http://127.0.0.1/")
            .allow_private_hosts(true)
            .validate()
            .is_ok());
        assert!(CrawlConfig::new("http://8.8.8.8/").validate().is_ok());
    }

    #[test]
    fn test_rejects_limits() {
        assert!(matches!(
            CrawlConfig::new("https://docs.rs/").depth(11).validate(),
            Err(ConfigError::DepthTooHigh { depth: 11, max: 10 })
        ));
        assert!(CrawlConfig::new("https://docs.rs/").depth(10).validate().is_ok());
        assert!(matches!(
            CrawlConfig::new("https://docs.rs/").workers(21).validate(),
            Err(ConfigError::InvalidWorkers { workers: 21, .. })
        ));
        assert!(matches!(
            CrawlConfig::new("https://docs.rs/").workers(0).validate(),
            Err(ConfigError::InvalidWorkers { .. })
        ));
        assert!(matches!(
            CrawlConfig::new("https://docs.rs/").max_pages(0).validate(),
            Err(ConfigError::ZeroPageBudget)
        ));
    }

    #[test]
    fn test_prefix_scope_target() {
        let target = CrawlConfig::new("https://d.dev/docs/intro")
            .scope(ScopeMode::Prefix)
            .validate()
            .unwrap();
        assert_eq!(target.scope(), &ScopeRule::PathPrefix("/docs/".to_string()));
    }
}
