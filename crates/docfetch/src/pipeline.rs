//! Per-page processing: extract, convert, package
//!
//! Runs synchronously inside a crawl worker once the fetch has completed.

use crate::classify::Category;
use crate::convert::convert_document;
use crate::extract::{extract, ExtractOptions};
use crate::fetchers::Page;
use crate::frontier::FrontierEntry;
use crate::layout::{OutputLayout, PageLinks};
use crate::scope::CrawlTarget;
use url::Url;

/// Note appended when the body read hit its deadline
const TIMEOUT_MESSAGE: &str = "\n\n[..more content timed out...]";

/// Body emitted for pages without extractable content
const LOW_VALUE_WARNING: &str =
    "> **Warning:** little or no extractable content was found on this page.";

/// Converted page, ready to be written and indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownArtifact {
    /// Normalized URL of the page (after redirects)
    pub url: Url,
    pub title: String,
    pub category: Category,
    pub description: String,
    /// Markdown body, always newline terminated
    pub markdown: String,
    /// Discovery sequence number of the frontier entry
    pub seq: u64,
    pub depth: u32,
    /// Excluded from the index
    pub low_value: bool,
    /// In-document anchors the markdown links to, with their page URLs;
    /// single-file layout only
    pub anchor_links: Vec<(String, Url)>,
}

/// Output of [`process_page`]
#[derive(Debug)]
pub struct ProcessedPage {
    pub artifact: MarkdownArtifact,
    /// Absolute links discovered anywhere on the page
    pub links: Vec<Url>,
}

/// Turn a fetched page into a markdown artifact plus its outgoing links
pub fn process_page(
    page: &Page,
    entry: &FrontierEntry,
    target: &CrawlTarget,
    layout: &OutputLayout,
    options: &ExtractOptions,
) -> ProcessedPage {
    let url = target.normalize(&page.final_url);
    let doc = extract(&page.body, &page.final_url, options);
    let rewriter = PageLinks::new(target, layout, &url);
    let mut markdown = convert_document(&doc, &rewriter);
    let anchor_links = rewriter.anchors(&doc.links);

    if doc.low_value {
        markdown = if markdown.trim().is_empty() {
            format!("{LOW_VALUE_WARNING}\n")
        } else {
            format!("{LOW_VALUE_WARNING}\n\n{markdown}")
        };
    }
    if page.truncated {
        markdown = format!("{}{TIMEOUT_MESSAGE}\n", markdown.trim_end());
    }

    ProcessedPage {
        artifact: MarkdownArtifact {
            url,
            title: doc.title,
            category: doc.category,
            description: doc.description,
            markdown,
            seq: entry.seq,
            depth: entry.depth,
            low_value: doc.low_value,
            anchor_links,
        },
        links: doc.links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{QueryPolicy, ScopeRule};
    use std::path::PathBuf;

    fn page(url: &str, body: &str) -> Page {
        let url = Url::parse(url).unwrap();
        Page {
            url: url.clone(),
            final_url: url,
            status: 200,
            content_type: Some("text/html".to_string()),
            body: body.to_string(),
            truncated: false,
        }
    }

    fn entry(url: &Url) -> FrontierEntry {
        FrontierEntry {
            url: url.clone(),
            depth: 1,
            referrer: None,
            seq: 7,
        }
    }

    fn target() -> CrawlTarget {
        let root = Url::parse("https://docs.example.com/").unwrap();
        CrawlTarget::new(&root, ScopeRule::SameOrigin, QueryPolicy::Drop)
    }

    #[test]
    fn test_process_page_builds_artifact() {
        let page = page(
            "https://docs.example.com/guide/install",
            r#"<html><head><title>Install | Docs</title></head><body>
               <nav><a href="/api/">API</a></nav>
               <main><h1>Install</h1><p>Run the installer. Then verify it works.</p>
               <p><a href="/guide/next">Next</a></p></main></body></html>"#,
        );
        let layout = OutputLayout::Directory(PathBuf::from("out"));
        let processed = process_page(
            &page,
            &entry(&page.url),
            &target(),
            &layout,
            &ExtractOptions::default(),
        );

        let artifact = &processed.artifact;
        assert_eq!(artifact.title, "Install");
        assert_eq!(artifact.category, Category::Guide);
        assert_eq!(artifact.seq, 7);
        assert!(!artifact.low_value);
        assert_eq!(
            artifact.markdown,
            "# Install\n\nRun the installer. Then verify it works.\n\n[Next](next.md)\n"
        );
        assert_eq!(processed.links.len(), 2);
        assert!(artifact.anchor_links.is_empty());
    }

    #[test]
    fn test_single_file_links_become_anchors() {
        let page = page(
            "https://docs.example.com/guide/install",
            r#"<html><body><main><h1>Install</h1>
               <p>Continue with <a href="/guide/next#top">the next step</a> or read
               <a href="https://elsewhere.example.org/">elsewhere</a>.</p></main></body></html>"#,
        );
        let layout = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        let processed = process_page(
            &page,
            &entry(&page.url),
            &target(),
            &layout,
            &ExtractOptions::default(),
        );

        let artifact = &processed.artifact;
        assert!(artifact
            .markdown
            .contains("[the next step](#page-guide-next)"));
        assert!(artifact
            .markdown
            .contains("[elsewhere](https://elsewhere.example.org/)"));
        assert_eq!(
            artifact.anchor_links,
            vec![(
                "page-guide-next".to_string(),
                Url::parse("https://docs.example.com/guide/next").unwrap()
            )]
        );
    }

    #[test]
    fn test_low_value_page_gets_warning() {
        let page = page("https://docs.example.com/empty", "<body><nav>menu</nav></body>");
        let layout = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        let processed = process_page(
            &page,
            &entry(&page.url),
            &target(),
            &layout,
            &ExtractOptions::default(),
        );
        assert!(processed.artifact.low_value);
        assert_eq!(processed.artifact.markdown, format!("{LOW_VALUE_WARNING}\n"));
    }

    #[test]
    fn test_truncated_page_is_marked() {
        let mut page = page(
            "https://docs.example.com/long",
            "<body><main><p>Partial content that was cut off by the deadline.</p></main></body>",
        );
        page.truncated = true;
        let layout = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        let processed = process_page(
            &page,
            &entry(&page.url),
            &target(),
            &layout,
            &ExtractOptions::default(),
        );
        assert!(processed
            .artifact
            .markdown
            .ends_with("[..more content timed out...]\n"));
    }
}
