//! Crawl target, scope rules and URL normalization

use serde::{Deserialize, Serialize};
use url::Url;

/// File extensions that never point at an HTML page
const NON_HTML_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar", ".gz", ".tgz", ".bz2", ".xz", ".7z", ".exe", ".dmg", ".pkg",
    ".deb", ".rpm", ".msi", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".mp3",
    ".mp4", ".webm", ".woff", ".woff2", ".ttf", ".css", ".js", ".json", ".xml",
];

/// Policy deciding whether a discovered URL belongs to the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule {
    /// Same scheme, host and port as the root
    SameOrigin,
    /// Same origin and the path starts with the given prefix
    PathPrefix(String),
}

/// How the query string takes part in URL identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPolicy {
    /// `/a?x=1` and `/a?x=2` are the same page
    #[default]
    Drop,
    /// Query strings distinguish pages
    Keep,
}

/// Root URL plus scope rule, fixed for the duration of a run
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    root: Url,
    scope: ScopeRule,
    query: QueryPolicy,
}

impl CrawlTarget {
    /// Create a target; the root is normalized with the given query policy
    pub fn new(root: &Url, scope: ScopeRule, query: QueryPolicy) -> Self {
        Self {
            root: normalize_url(root, query),
            scope,
            query,
        }
    }

    /// Same-origin target with a path prefix derived from the root's directory
    pub fn with_path_prefix(root: &Url, query: QueryPolicy) -> Self {
        let prefix = directory_prefix(root.path());
        Self::new(root, ScopeRule::PathPrefix(prefix), query)
    }

    /// Normalized root URL
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Active scope rule
    pub fn scope(&self) -> &ScopeRule {
        &self.scope
    }

    /// Normalize a URL the way the frontier keys it
    pub fn normalize(&self, url: &Url) -> Url {
        normalize_url(url, self.query)
    }

    /// Returns true if the URL belongs to this crawl
    pub fn in_scope(&self, url: &Url) -> bool {
        if !same_origin(&self.root, url) {
            return false;
        }
        match &self.scope {
            ScopeRule::SameOrigin => true,
            ScopeRule::PathPrefix(prefix) => {
                let path = url.path();
                path.starts_with(prefix.as_str()) || format!("{path}/") == *prefix
            }
        }
    }

    /// Returns true if the URL is in scope and looks like an HTML page
    pub fn is_crawlable(&self, url: &Url) -> bool {
        self.in_scope(url) && !is_non_html_resource(url.path())
    }
}

/// Normalize a URL to its identity: scheme + host + port + path (+ query)
///
/// Fragments are always dropped. Scheme and host are lowercased by the URL
/// parser and default ports are elided.
pub fn normalize_url(url: &Url, query: QueryPolicy) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    match query {
        QueryPolicy::Drop => normalized.set_query(None),
        QueryPolicy::Keep => {
            if normalized.query() == Some("") {
                normalized.set_query(None);
            }
        }
    }
    if normalized.path().is_empty() {
        normalized.set_path("/");
    }
    normalized
}

/// Returns true if both URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Check if a path points at a known non-HTML resource
pub fn is_non_html_resource(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    NON_HTML_EXTENSIONS
        .iter()
        .any(|ext| path_lower.ends_with(ext))
}

/// Directory part of a URL path: `/docs/intro` → `/docs/`
fn directory_prefix(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_drops_fragment_and_query() {
        let n = normalize_url(&url("HTTPS://Example.com:443/a/b?x=1#top"), QueryPolicy::Drop);
        assert_eq!(n.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn test_normalize_keeps_query_when_asked() {
        let n = normalize_url(&url("https://example.com/a?x=1#top"), QueryPolicy::Keep);
        assert_eq!(n.as_str(), "https://example.com/a?x=1");
    }

    #[test]
    fn test_same_origin_scope() {
        let target = CrawlTarget::new(
            &url("https://docs.example.com/"),
            ScopeRule::SameOrigin,
            QueryPolicy::Drop,
        );
        assert!(target.in_scope(&url("https://docs.example.com/guide/intro")));
        assert!(!target.in_scope(&url("https://example.com/guide/intro")));
        assert!(!target.in_scope(&url("http://docs.example.com/guide/intro")));
        assert!(!target.in_scope(&url("https://docs.example.com:8443/")));
    }

    #[test]
    fn test_path_prefix_scope() {
        let target = CrawlTarget::with_path_prefix(
            &url("https://example.com/docs/intro"),
            QueryPolicy::Drop,
        );
        assert_eq!(target.scope(), &ScopeRule::PathPrefix("/docs/".to_string()));
        assert!(target.in_scope(&url("https://example.com/docs/api/x")));
        assert!(target.in_scope(&url("https://example.com/docs")));
        assert!(!target.in_scope(&url("https://example.com/blog/post")));
    }

    #[test]
    fn test_non_html_resources_not_crawlable() {
        let target = CrawlTarget::new(
            &url("https://example.com/"),
            ScopeRule::SameOrigin,
            QueryPolicy::Drop,
        );
        assert!(target.is_crawlable(&url("https://example.com/guide.html")));
        assert!(!target.is_crawlable(&url("https://example.com/manual.PDF")));
        assert!(!target.is_crawlable(&url("https://example.com/dist/app.tar.gz")));
    }
}
