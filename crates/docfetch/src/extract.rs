//! Main-content extraction
//!
//! Turns a raw HTML page into an [`ExtractedDocument`]: the arena tree with
//! page chrome removed, the node holding the main content, a cleaned title,
//! a short description and every link the page points at.
//!
//! Content root selection tries, in order:
//! 1. semantic containers (`main`, `article`, `[role=main]`)
//! 2. well-known content classes and ids with enough text
//! 3. the `div`/`section` carrying the most direct block text
//! 4. `<body>`

use crate::classify::{classify, clean_title, describe, Category};
use crate::dom::{collapse_whitespace, Document, NodeId};
use url::Url;

/// Minimum text length for class-based and density-based candidates
const MIN_CANDIDATE_CHARS: usize = 200;

/// Default near-empty threshold
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 20;

/// Tags that never carry documentation content
const NOISE_TAGS: &[&str] = &[
    "nav", "aside", "script", "style", "noscript", "template", "iframe", "form", "button",
    "svg", "canvas", "dialog", "link", "meta",
];

/// ARIA roles of page chrome
const NOISE_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "search", "complementary"];

/// Words in class/id names that mark page chrome, ads or trackers
const NOISE_WORDS: &[&str] = &[
    "nav", "navbar", "navigation", "menu", "sidebar", "toc", "breadcrumb", "breadcrumbs",
    "footer", "ad", "ads", "advert", "advertisement", "banner", "cookie", "cookies", "promo",
    "sponsor", "sponsored", "tracking", "share", "social", "skip", "pagination", "edit",
];

/// Tags protected from class/id heuristics
const PROTECTED_TAGS: &[&str] = &[
    "pre", "code", "table", "h1", "h2", "h3", "h4", "h5", "h6", "main", "article", "body",
];

/// Well-known content containers, tried after semantic ones
const CONTENT_CLASSES: &[&str] = &[
    "content",
    "docs-content",
    "doc-content",
    "main-content",
    "documentation",
    "markdown-body",
    "markdown",
    "post-content",
    "page-content",
    "article-content",
    "entry-content",
    "content-wrapper",
    "document",
    "theme-doc-markdown",
];

/// Block-level tags counted when scoring text density
const BLOCK_TAGS: &[&str] = &[
    "p", "pre", "ul", "ol", "table", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "dl",
];

/// Options for [`extract`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Content shorter than this (in characters) is low-value
    pub min_content_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
        }
    }
}

/// A page reduced to its main content
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Arena holding the cleaned tree
    pub dom: Document,
    /// Root of the main content subtree
    pub content: NodeId,
    /// Cleaned title
    pub title: String,
    /// One-line description
    pub description: String,
    /// Detected page kind
    pub category: Category,
    /// True if the content is empty or near-empty
    pub low_value: bool,
    /// Absolute links found anywhere on the page, in document order
    pub links: Vec<Url>,
    /// Base URL for resolving relative references
    pub base: Url,
}

/// Extract the main content of an HTML page
pub fn extract(html: &str, page_url: &Url, options: &ExtractOptions) -> ExtractedDocument {
    let mut dom = Document::parse(html);
    let base = base_url(&dom, page_url);

    // Links and metadata come from the untouched page: navigation is where
    // most of a documentation site's links live.
    let links = collect_links(&dom, &base);
    let raw_title = dom
        .find_tag(dom.root(), "title")
        .map(|t| dom.normalized_text(t))
        .unwrap_or_default();
    let meta_description = meta_description(&dom);

    remove_noise(&mut dom);
    let content = select_content(&dom);

    let mut title = clean_title(&raw_title);
    if title.is_empty() {
        title = dom
            .find_tag(content, "h1")
            .or_else(|| dom.find_tag(dom.root(), "h1"))
            .map(|h| dom.normalized_text(h))
            .unwrap_or_default();
    }
    if title.is_empty() {
        title = page_url.to_string();
    }

    let text = dom.normalized_text(content);
    let low_value = text.chars().count() < options.min_content_chars;

    let description = match meta_description {
        Some(desc) => describe(&desc),
        None => describe(&first_paragraph(&dom, content).unwrap_or(text)),
    };

    let category = classify(page_url, &title);

    ExtractedDocument {
        dom,
        content,
        title,
        description,
        category,
        low_value,
        links,
        base,
    }
}

/// `<base href>` resolved against the page URL, or the page URL itself
fn base_url(dom: &Document, page_url: &Url) -> Url {
    dom.find_tag(dom.root(), "base")
        .and_then(|b| dom.attr(b, "href"))
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Absolute http(s) link targets in document order
fn collect_links(dom: &Document, base: &Url) -> Vec<Url> {
    dom.descendants(dom.root())
        .filter(|&n| dom.is_tag(n, "a"))
        .filter_map(|n| dom.attr(n, "href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter_map(|href| base.join(href).ok())
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
        .collect()
}

fn meta_description(dom: &Document) -> Option<String> {
    dom.descendants(dom.root())
        .filter(|&n| dom.is_tag(n, "meta"))
        .find(|&n| {
            let name = dom
                .attr(n, "name")
                .or_else(|| dom.attr(n, "property"))
                .unwrap_or("")
                .to_ascii_lowercase();
            name == "description" || name == "og:description"
        })
        .and_then(|n| dom.attr(n, "content"))
        .map(collapse_whitespace)
        .filter(|d| !d.is_empty())
}

fn first_paragraph(dom: &Document, content: NodeId) -> Option<String> {
    dom.descendants(content)
        .filter(|&n| dom.is_tag(n, "p"))
        .map(|n| dom.normalized_text(n))
        .find(|t| !t.is_empty())
}

/// Unlink navigation, chrome, scripts, hidden and ad/tracking nodes
fn remove_noise(dom: &mut Document) {
    let doomed: Vec<NodeId> = dom
        .descendants(dom.root())
        .filter(|&n| is_noise(dom, n))
        .collect();
    for id in doomed {
        dom.detach(id);
    }
}

fn is_noise(dom: &Document, id: NodeId) -> bool {
    let Some(tag) = dom.tag(id) else {
        return false;
    };

    if NOISE_TAGS.contains(&tag) {
        return true;
    }
    if (tag == "header" || tag == "footer")
        && !dom
            .ancestors(id)
            .any(|a| dom.is_tag(a, "article") || dom.is_tag(a, "main"))
    {
        return true;
    }
    if dom.attr(id, "hidden").is_some() || dom.attr(id, "aria-hidden") == Some("true") {
        return true;
    }
    if let Some(role) = dom.attr(id, "role") {
        if NOISE_ROLES.contains(&role.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    if PROTECTED_TAGS.contains(&tag) {
        return false;
    }

    let id_attr = dom.attr(id, "id").unwrap_or("");
    dom.classes(id)
        .chain(std::iter::once(id_attr))
        .any(has_noise_word)
}

/// True if a class/id name contains a chrome word, split on `-` and `_`
fn has_noise_word(name: &str) -> bool {
    name.to_ascii_lowercase()
        .split(['-', '_'])
        .any(|word| NOISE_WORDS.contains(&word))
}

fn select_content(dom: &Document) -> NodeId {
    let root = dom.root();

    // 1. Semantic containers
    for tag in ["main", "article"] {
        if let Some(id) = dom.find_tag(root, tag) {
            if !dom.normalized_text(id).is_empty() {
                return id;
            }
        }
    }
    if let Some(id) = dom
        .descendants(root)
        .find(|&n| dom.attr(n, "role").is_some_and(|r| r.eq_ignore_ascii_case("main")))
    {
        if !dom.normalized_text(id).is_empty() {
            return id;
        }
    }

    // 2. Known content classes and ids
    for name in CONTENT_CLASSES {
        let candidate = dom.descendants(root).find(|&n| {
            dom.tag(n).is_some()
                && (dom.classes(n).any(|c| c == *name) || dom.attr(n, "id") == Some(*name))
        });
        if let Some(id) = candidate {
            if dom.normalized_text(id).chars().count() >= MIN_CANDIDATE_CHARS {
                return id;
            }
        }
    }

    // 3. Densest block container
    let densest = dom
        .descendants(root)
        .filter(|&n| dom.is_tag(n, "div") || dom.is_tag(n, "section"))
        .map(|n| (n, direct_block_text(dom, n)))
        .filter(|&(_, score)| score >= MIN_CANDIDATE_CHARS)
        .fold(None, |best: Option<(NodeId, usize)>, (n, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((n, score)),
        });
    if let Some((id, _)) = densest {
        return id;
    }

    // 4. Body, or the whole document for fragments
    dom.find_tag(root, "body").unwrap_or(root)
}

/// Characters of text held by a node's direct block children and text nodes
fn direct_block_text(dom: &Document, id: NodeId) -> usize {
    dom.children(id)
        .iter()
        .map(|&c| {
            if let Some(text) = dom.text(c) {
                text.trim().chars().count()
            } else if dom.tag(c).is_some_and(|t| BLOCK_TAGS.contains(&t)) {
                dom.normalized_text(c).chars().count()
            } else {
                0
            }
        })
        .sum()
}
