//! Output layout and URL to file path mapping

use crate::convert::LinkRewriter;
use crate::scope::CrawlTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use url::Url;

/// File extensions dropped before `.md` is appended
const PAGE_EXTENSIONS: &[&str] = &[".html", ".htm", ".xhtml", ".php", ".asp", ".aspx"];

/// Index file name inside a directory layout
pub const DIRECTORY_INDEX_NAME: &str = "llm.txt";

/// Requested layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Directory if the output path is an existing directory or ends with a
    /// separator, single file otherwise
    #[default]
    Auto,
    /// One concatenated markdown file
    File,
    /// One markdown file per page under a directory tree
    Dir,
}

/// Resolved output layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// All pages in one file
    SingleFile(PathBuf),
    /// Pages mirrored under a root directory
    Directory(PathBuf),
}

impl OutputLayout {
    /// Resolve the layout for an output path
    pub fn resolve(output: &Path, mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::File => OutputLayout::SingleFile(output.to_path_buf()),
            LayoutMode::Dir => OutputLayout::Directory(output.to_path_buf()),
            LayoutMode::Auto => {
                let raw = output.as_os_str().to_string_lossy();
                if output.is_dir() || raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR) {
                    OutputLayout::Directory(output.to_path_buf())
                } else {
                    OutputLayout::SingleFile(output.to_path_buf())
                }
            }
        }
    }

    /// True for the directory layout
    pub fn is_directory(&self) -> bool {
        matches!(self, OutputLayout::Directory(_))
    }

    /// Output file or directory as configured
    pub fn path(&self) -> &Path {
        match self {
            OutputLayout::SingleFile(path) | OutputLayout::Directory(path) => path,
        }
    }

    /// Where the llm.txt index goes
    pub fn index_path(&self) -> PathBuf {
        match self {
            OutputLayout::SingleFile(path) => llm_txt_path(path),
            OutputLayout::Directory(root) => root.join(DIRECTORY_INDEX_NAME),
        }
    }

    /// Destination of one page in the directory layout
    pub fn page_path(&self, url: &Url) -> Option<PathBuf> {
        match self {
            OutputLayout::SingleFile(_) => None,
            OutputLayout::Directory(root) => Some(root.join(url_to_relative_path(url))),
        }
    }
}

/// Derive the index path for a single-file output
///
/// `docs.md` becomes `docs.llm.txt`; any other name gets `.llm.txt` appended.
pub fn llm_txt_path(output: &Path) -> PathBuf {
    let raw = output.as_os_str().to_string_lossy();
    match raw.strip_suffix(".md") {
        Some(stem) => PathBuf::from(format!("{stem}.llm.txt")),
        None => PathBuf::from(format!("{raw}.llm.txt")),
    }
}

/// Map a page URL to a relative markdown path
///
/// `/` maps to `index.md`, `/a/b.html` to `a/b.md` and `/a/b/` to
/// `a/b/index.md`. A query string, when present, is folded into the file name.
pub fn url_to_relative_path(url: &Url) -> PathBuf {
    let segments: Vec<String> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect();

    let (dirs, file_stem) = match segments.split_last() {
        Some((last, dirs)) if !url.path().ends_with('/') => {
            (dirs, strip_page_extension(last).to_string())
        }
        _ => (segments.as_slice(), "index".to_string()),
    };

    let file_stem = match url.query().filter(|q| !q.is_empty()) {
        Some(query) => format!("{file_stem}_{}", sanitize_segment(query)),
        None => file_stem,
    };

    let mut path: PathBuf = dirs.iter().collect();
    path.push(format!("{file_stem}.md"));
    path
}

/// Anchor id of a page inside the single-file layout
///
/// Derived from the page's relative path: `/` becomes `page-index` and
/// `/guide/intro.html` becomes `page-guide-intro`.
pub fn page_anchor(url: &Url) -> String {
    let path = url_to_relative_path(url);
    let path = path.to_string_lossy();
    let stem = path.strip_suffix(".md").unwrap_or(&path);
    let slug: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("page-{slug}")
}

/// Relative link from one output file to another, with `/` separators
pub fn relative_link(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<Component> = from_file
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to: Vec<Component> = to_file.components().collect();

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from_dir.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

fn strip_page_extension(segment: &str) -> &str {
    let lower = segment.to_ascii_lowercase();
    PAGE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext) && lower.len() > ext.len())
        .map(|ext| &segment[..segment.len() - ext.len()])
        .unwrap_or(segment)
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Rewrites links found on one page according to the output layout
pub struct PageLinks<'a> {
    target: &'a CrawlTarget,
    layout: &'a OutputLayout,
    page: &'a Url,
}

impl<'a> PageLinks<'a> {
    pub fn new(target: &'a CrawlTarget, layout: &'a OutputLayout, page: &'a Url) -> Self {
        Self {
            target,
            layout,
            page,
        }
    }

    /// In-document anchors that `links` rewrite to, each with its page URL
    ///
    /// Empty in the directory layout. The single-file writer uses the URLs
    /// to restore links whose page never made it into the document.
    pub fn anchors(&self, links: &[Url]) -> Vec<(String, Url)> {
        if self.layout.is_directory() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        links
            .iter()
            .filter(|url| self.target.is_crawlable(url))
            .map(|url| {
                let normalized = self.target.normalize(url);
                (page_anchor(&normalized), normalized)
            })
            .filter(|(anchor, _)| seen.insert(anchor.clone()))
            .collect()
    }
}

impl LinkRewriter for PageLinks<'_> {
    fn rewrite(&self, url: &Url) -> Option<String> {
        if !self.target.is_crawlable(url) {
            return None;
        }
        let normalized = self.target.normalize(url);

        match self.layout {
            OutputLayout::Directory(_) => {
                let fragment = url
                    .fragment()
                    .filter(|f| !f.is_empty())
                    .map(|f| format!("#{f}"))
                    .unwrap_or_default();
                let from = url_to_relative_path(&self.target.normalize(self.page));
                let to = url_to_relative_path(&normalized);
                Some(format!("{}{fragment}", relative_link(&from, &to)))
            }
            // Pages share one document; a fragment inside the target page
            // has no anchor of its own there.
            OutputLayout::SingleFile(_) => Some(format!("#{}", page_anchor(&normalized))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{QueryPolicy, ScopeRule};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_url_to_relative_path() {
        assert_eq!(url_to_relative_path(&url("https://d.dev/")), PathBuf::from("index.md"));
        assert_eq!(
            url_to_relative_path(&url("https://d.dev/a/b.html")),
            PathBuf::from("a/b.md")
        );
        assert_eq!(
            url_to_relative_path(&url("https://d.dev/a/b/")),
            PathBuf::from("a/b/index.md")
        );
        assert_eq!(
            url_to_relative_path(&url("https://d.dev/guide/install")),
            PathBuf::from("guide/install.md")
        );
        assert_eq!(
            url_to_relative_path(&url("https://d.dev/v1.2")),
            PathBuf::from("v1.2.md")
        );
        assert_eq!(
            url_to_relative_path(&url("https://d.dev/search?q=a b")),
            PathBuf::from("search_q_a%20b.md")
        );
    }

    #[test]
    fn test_llm_txt_path() {
        assert_eq!(llm_txt_path(Path::new("docs.md")), PathBuf::from("docs.llm.txt"));
        assert_eq!(
            llm_txt_path(Path::new("out/report.md")),
            PathBuf::from("out/report.llm.txt")
        );
        assert_eq!(llm_txt_path(Path::new("notes")), PathBuf::from("notes.llm.txt"));
    }

    #[test]
    fn test_resolve_layout() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OutputLayout::resolve(dir.path(), LayoutMode::Auto).is_directory());
        assert!(OutputLayout::resolve(Path::new("site/"), LayoutMode::Auto).is_directory());
        assert!(!OutputLayout::resolve(Path::new("docs.md"), LayoutMode::Auto).is_directory());
        assert!(OutputLayout::resolve(Path::new("docs.md"), LayoutMode::Dir).is_directory());
        assert!(!OutputLayout::resolve(dir.path(), LayoutMode::File).is_directory());
    }

    #[test]
    fn test_index_path() {
        let file = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        assert_eq!(file.index_path(), PathBuf::from("docs.llm.txt"));
        let dir = OutputLayout::Directory(PathBuf::from("site"));
        assert_eq!(dir.index_path(), PathBuf::from("site/llm.txt"));
        assert_eq!(
            dir.page_path(&url("https://d.dev/a/")),
            Some(PathBuf::from("site/a/index.md"))
        );
        assert_eq!(file.page_path(&url("https://d.dev/a/")), None);
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(
            relative_link(Path::new("index.md"), Path::new("guide/a.md")),
            "guide/a.md"
        );
        assert_eq!(
            relative_link(Path::new("guide/a.md"), Path::new("guide/b.md")),
            "b.md"
        );
        assert_eq!(
            relative_link(Path::new("guide/a.md"), Path::new("api/x/index.md")),
            "../api/x/index.md"
        );
    }

    #[test]
    fn test_page_links_directory_layout() {
        let target = CrawlTarget::new(&url("https://d.dev/"), ScopeRule::SameOrigin, QueryPolicy::Drop);
        let layout = OutputLayout::Directory(PathBuf::from("out"));
        let page = url("https://d.dev/guide/start");
        let links = PageLinks::new(&target, &layout, &page);

        assert_eq!(
            links.rewrite(&url("https://d.dev/api/client#new")).as_deref(),
            Some("../api/client.md#new")
        );
        assert_eq!(links.rewrite(&url("https://other.dev/x")), None);
        assert_eq!(links.rewrite(&url("https://d.dev/file.pdf")), None);
    }

    #[test]
    fn test_page_links_single_file_layout() {
        let target = CrawlTarget::new(&url("https://d.dev/"), ScopeRule::SameOrigin, QueryPolicy::Drop);
        let layout = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        let page = url("https://d.dev/guide/start");
        let links = PageLinks::new(&target, &layout, &page);

        assert_eq!(
            links.rewrite(&url("https://d.dev/api/client?x=1")).as_deref(),
            Some("#page-api-client")
        );
        assert_eq!(
            links.rewrite(&url("https://d.dev/guide/start#setup")).as_deref(),
            Some("#page-guide-start")
        );
        assert_eq!(links.rewrite(&url("https://d.dev/")).as_deref(), Some("#page-index"));
        assert_eq!(links.rewrite(&url("https://other.dev/x")), None);
    }

    #[test]
    fn test_page_anchor() {
        assert_eq!(page_anchor(&url("https://d.dev/")), "page-index");
        assert_eq!(page_anchor(&url("https://d.dev/guide/Intro.html")), "page-guide-intro");
        assert_eq!(page_anchor(&url("https://d.dev/a/b/")), "page-a-b-index");
        assert_eq!(page_anchor(&url("https://d.dev/v1.2/x%20y")), "page-v1-2-x-20y");
    }

    #[test]
    fn test_page_links_anchors() {
        let target = CrawlTarget::new(&url("https://d.dev/"), ScopeRule::SameOrigin, QueryPolicy::Drop);
        let page = url("https://d.dev/guide/start");
        let found = [
            url("https://d.dev/api/client#new"),
            url("https://d.dev/api/client"),
            url("https://other.dev/x"),
            url("https://d.dev/logo.png"),
        ];

        let file = OutputLayout::SingleFile(PathBuf::from("docs.md"));
        assert_eq!(
            PageLinks::new(&target, &file, &page).anchors(&found),
            vec![("page-api-client".to_string(), url("https://d.dev/api/client"))]
        );

        let dir = OutputLayout::Directory(PathBuf::from("out"));
        assert!(PageLinks::new(&target, &dir, &page).anchors(&found).is_empty());
    }
}
