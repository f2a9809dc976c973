//! HTML to Markdown conversion
//!
//! Walks the arena tree produced by the extractor and emits CommonMark with
//! GitHub-style tables and fenced code. Output is a pure function of the
//! tree, so converting the same input twice gives byte-identical text.

use crate::dom::{Document, NodeId};
use crate::extract::ExtractedDocument;
use url::Url;

/// Elements rendered inline; everything else is a block container
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i",
    "img", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike",
    "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

/// Elements that produce no output at all
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "meta", "link", "base",
];

/// Class prefixes that carry a code block's language
const LANGUAGE_PREFIXES: &[&str] = &["language-", "lang-", "highlight-source-", "highlight-"];

/// Ordered list numbers stay below ten digits; CommonMark rejects longer ones.
const MAX_LIST_NUMBER: u32 = 999_999_999;

/// Decides how links to crawlable pages are written
pub trait LinkRewriter {
    /// Replacement for an absolute http(s) URL, or `None` to keep it absolute
    fn rewrite(&self, url: &Url) -> Option<String>;
}

/// Keeps every link absolute
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAbsolute;

impl LinkRewriter for KeepAbsolute {
    fn rewrite(&self, _url: &Url) -> Option<String> {
        None
    }
}

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: &Option<String>, body: &str) -> bool {
    // Check Content-Type
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
        if !ct_lower.starts_with("text/plain") && !ct_lower.is_empty() {
            return false;
        }
    }

    // Check body start
    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(15).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Convert an HTML fragment to markdown, leaving links untouched
pub fn html_to_markdown(html: &str) -> String {
    let dom = Document::parse_fragment(html);
    Converter::new(&dom, None, &KeepAbsolute).convert(dom.root())
}

/// Convert the main content of an extracted page
pub fn convert_document(doc: &ExtractedDocument, links: &dyn LinkRewriter) -> String {
    Converter::new(&doc.dom, Some(&doc.base), links).convert(doc.content)
}

/// One rendered block plus whether it is a list
struct Block {
    text: String,
    is_list: bool,
}

impl Block {
    fn plain(text: String) -> Self {
        Self {
            text,
            is_list: false,
        }
    }
}

/// Arena to markdown renderer
pub struct Converter<'a> {
    dom: &'a Document,
    base: Option<&'a Url>,
    links: &'a dyn LinkRewriter,
}

impl<'a> Converter<'a> {
    /// Create a converter; without a base URL hrefs are emitted verbatim
    pub fn new(dom: &'a Document, base: Option<&'a Url>, links: &'a dyn LinkRewriter) -> Self {
        Self { dom, base, links }
    }

    /// Render the subtree rooted at `id`
    pub fn convert(&self, id: NodeId) -> String {
        let blocks = if self.is_block(id) {
            self.block(id)
        } else {
            self.container(id)
        };
        let text = join_blocks(&blocks, false);
        if text.is_empty() {
            text
        } else {
            format!("{text}\n")
        }
    }

    fn is_block(&self, id: NodeId) -> bool {
        match self.dom.tag(id) {
            Some("span") => self.has_block_descendant(id),
            Some(tag) => !INLINE_TAGS.contains(&tag),
            None => self.dom.parent(id).is_none() && id == self.dom.root(),
        }
    }

    fn has_block_descendant(&self, id: NodeId) -> bool {
        self.dom
            .descendants(id)
            .skip(1)
            .any(|n| self.dom.tag(n).is_some_and(|t| !INLINE_TAGS.contains(&t)))
    }

    /// Render children of a container, grouping inline runs into paragraphs
    fn container(&self, id: NodeId) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut inline = String::new();

        for &child in self.dom.children(id) {
            if self.dom.tag(child).is_some() && self.is_block(child) {
                flush_paragraph(&mut inline, &mut blocks);
                blocks.extend(self.block(child));
            } else {
                self.inline(child, &mut inline);
            }
        }
        flush_paragraph(&mut inline, &mut blocks);
        blocks
    }

    fn block(&self, id: NodeId) -> Vec<Block> {
        let Some(tag) = self.dom.tag(id) else {
            return self.container(id);
        };

        match tag {
            t if SKIP_TAGS.contains(&t) => Vec::new(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                let text = single_line(&self.inline_text(id));
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Block::plain(format!("{} {}", "#".repeat(level), text))]
                }
            }
            "pre" => vec![Block::plain(self.code_block(id))],
            "ul" => self.list(id, false),
            "ol" => self.list(id, true),
            "blockquote" => {
                let inner = join_blocks(&self.container(id), false);
                if inner.is_empty() {
                    Vec::new()
                } else {
                    vec![Block::plain(prefix_lines(&inner, "> ", ">"))]
                }
            }
            "table" => self.table(id).map(Block::plain).into_iter().collect(),
            "hr" => vec![Block::plain("---".to_string())],
            "dt" => {
                let text = single_line(&self.inline_text(id));
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Block::plain(format!("**{text}**"))]
                }
            }
            _ => self.container(id),
        }
    }

    /// Inline content of a node's children as one string
    fn inline_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.dom.children(id) {
            self.inline(child, &mut out);
        }
        out
    }

    fn inline(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.dom.text(id) {
            push_collapsed(out, text);
            return;
        }
        let Some(tag) = self.dom.tag(id) else {
            return;
        };

        match tag {
            t if SKIP_TAGS.contains(&t) => {}
            "br" => out.push('\n'),
            "strong" | "b" => self.wrap(id, "**", out),
            "em" | "i" => self.wrap(id, "*", out),
            "del" | "s" | "strike" => self.wrap(id, "~~", out),
            "code" | "kbd" | "samp" | "tt" => {
                let code = single_line(&self.code_text(id));
                if !code.is_empty() {
                    out.push_str(&code_span(&code));
                }
            }
            "a" => self.link(id, out),
            "img" => self.image(id, out),
            _ => {
                for &child in self.dom.children(id) {
                    self.inline(child, out);
                }
            }
        }
    }

    /// Emphasis-style wrapper; surrounding whitespace moves outside the markers
    fn wrap(&self, id: NodeId, marker: &str, out: &mut String) {
        let inner = self.inline_text(id);
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            push_collapsed(out, &inner);
            return;
        }
        if self
            .dom
            .text_content(id)
            .starts_with(char::is_whitespace)
        {
            push_collapsed(out, " ");
        }
        out.push_str(marker);
        out.push_str(trimmed);
        out.push_str(marker);
        if inner.ends_with(char::is_whitespace) {
            out.push(' ');
        }
    }

    fn link(&self, id: NodeId, out: &mut String) {
        let text = single_line(&self.inline_text(id));
        let href = self.dom.attr(id, "href").map(str::trim).unwrap_or("");

        if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
            push_collapsed(out, &text);
            return;
        }
        if text.is_empty() {
            return;
        }
        out.push('[');
        out.push_str(&text);
        out.push_str("](");
        out.push_str(&self.resolve_link(href));
        out.push(')');
    }

    fn image(&self, id: NodeId, out: &mut String) {
        let Some(src) = self
            .dom
            .attr(id, "src")
            .or_else(|| self.dom.attr(id, "data-src"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return;
        };
        let alt = single_line(self.dom.attr(id, "alt").unwrap_or(""));
        let src = match self.base {
            Some(base) => base
                .join(src)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| src.to_string()),
            None => src.to_string(),
        };
        out.push_str(&format!("![{alt}]({src})"));
    }

    fn resolve_link(&self, href: &str) -> String {
        if href.starts_with('#') {
            return href.to_string();
        }
        let Some(base) = self.base else {
            return href.to_string();
        };
        match base.join(href) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                self.links.rewrite(&url).unwrap_or_else(|| url.to_string())
            }
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        }
    }

    /// Verbatim text of a code element, `<br>` kept as a line break
    fn code_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.dom.descendants(id) {
            if let Some(text) = self.dom.text(n) {
                out.push_str(text);
            } else if self.dom.is_tag(n, "br") {
                out.push('\n');
            }
        }
        out
    }

    fn code_block(&self, id: NodeId) -> String {
        let code = self.code_text(id);
        let code = code.trim_end_matches(['\n', '\r']);
        let language = self.code_language(id).unwrap_or_default();
        let fence = "`".repeat((longest_run(code, '`') + 1).max(3));
        format!("{fence}{language}\n{code}\n{fence}")
    }

    fn code_language(&self, pre: NodeId) -> Option<String> {
        let code = self.dom.find_tag(pre, "code");
        [Some(pre), code]
            .into_iter()
            .flatten()
            .find_map(|n| {
                self.dom
                    .attr(n, "data-lang")
                    .or_else(|| self.dom.attr(n, "data-language"))
                    .map(str::to_string)
                    .or_else(|| {
                        self.dom.classes(n).find_map(|class| {
                            LANGUAGE_PREFIXES
                                .iter()
                                .find_map(|p| class.strip_prefix(p))
                                .filter(|lang| !lang.is_empty())
                                .map(str::to_string)
                        })
                    })
            })
            .map(|lang| lang.trim().to_lowercase())
            .filter(|lang| !lang.is_empty() && !lang.contains('`'))
    }

    fn list(&self, id: NodeId, ordered: bool) -> Vec<Block> {
        let mut number: u32 = if ordered {
            self.dom
                .attr(id, "start")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map_or(1, |n| n.min(u64::from(MAX_LIST_NUMBER)) as u32)
        } else {
            1
        };

        let mut items: Vec<String> = Vec::new();
        for &child in self.dom.children(id) {
            match self.dom.tag(child) {
                Some("li") => {
                    let marker = if ordered {
                        format!("{number}. ")
                    } else {
                        "- ".to_string()
                    };
                    number = number.saturating_add(1).min(MAX_LIST_NUMBER);
                    let body = join_blocks(&self.container(child), true);
                    items.push(indent_item(&marker, &body));
                }
                Some("ul") | Some("ol") => {
                    // Nested list placed directly inside a list: attach to the
                    // previous item.
                    let nested = join_blocks(&self.block(child), false);
                    if nested.is_empty() {
                        continue;
                    }
                    match items.last_mut() {
                        Some(last) => {
                            last.push('\n');
                            last.push_str(&prefix_lines(&nested, "  ", ""));
                        }
                        None => items.push(nested),
                    }
                }
                _ => {}
            }
        }

        if items.is_empty() {
            Vec::new()
        } else {
            vec![Block {
                text: items.join("\n"),
                is_list: true,
            }]
        }
    }

    fn table(&self, table: NodeId) -> Option<String> {
        let rows: Vec<Vec<String>> = self
            .dom
            .descendants(table)
            .filter(|&n| self.dom.is_tag(n, "tr"))
            .filter(|&tr| {
                self.dom
                    .ancestors(tr)
                    .find(|&a| self.dom.is_tag(a, "table"))
                    == Some(table)
            })
            .map(|tr| {
                self.dom
                    .children(tr)
                    .iter()
                    .filter(|&&c| self.dom.is_tag(c, "th") || self.dom.is_tag(c, "td"))
                    .map(|&cell| table_cell(&self.cell_text(cell)))
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        let columns = rows.iter().map(Vec::len).max()?;
        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(columns, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(columns)));
            }
        }
        Some(lines.join("\n"))
    }

    /// Cell content on one line; nested blocks are flattened
    fn cell_text(&self, cell: NodeId) -> String {
        if self.has_block_descendant(cell) {
            self.container(cell)
                .iter()
                .map(|b| single_line(&b.text))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            single_line(&self.inline_text(cell))
        }
    }
}

/// Join blocks with blank lines; inside list items, nested lists hug the text
fn join_blocks(blocks: &[Block], in_item: bool) -> String {
    let mut out = String::new();
    for block in blocks.iter().filter(|b| !b.text.is_empty()) {
        if !out.is_empty() {
            out.push_str(if in_item && block.is_list { "\n" } else { "\n\n" });
        }
        out.push_str(&block.text);
    }
    out
}

/// Turn the pending inline buffer into a paragraph block
fn flush_paragraph(inline: &mut String, blocks: &mut Vec<Block>) {
    let paragraph = inline
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !paragraph.is_empty() {
        blocks.push(Block::plain(paragraph));
    }
    inline.clear();
}

/// Append text, collapsing whitespace runs (including across the boundary)
fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

/// Whitespace-collapsed single line
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prefix the first line with the marker and indent the rest under it
fn indent_item(marker: &str, body: &str) -> String {
    if body.is_empty() {
        return marker.trim_end().to_string();
    }
    let indent = " ".repeat(marker.len());
    let mut out = String::new();
    for (i, line) in body.lines().enumerate() {
        if i == 0 {
            out.push_str(marker);
            out.push_str(line);
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
        }
    }
    out
}

/// Prefix every line; empty lines get `empty_prefix`
fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inline code span with a delimiter longer than any backtick run inside
fn code_span(code: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`') + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
