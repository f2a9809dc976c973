//! Semantic index (llm.txt)
//!
//! Entries arrive in worker completion order; the builder restores category
//! priority and discovery order when the index is rendered.

use crate::classify::Category;
use crate::pipeline::MarkdownArtifact;
use serde::Serialize;
use std::collections::HashSet;

/// Header written at the top of every llm.txt
pub const LLM_TXT_HEADER: &str = "# llm.txt - AI-friendly documentation index\n\
# This file helps LLMs quickly find relevant documentation sections\n\n";

/// One page in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub url: String,
    pub title: String,
    pub category: Category,
    pub description: String,
    /// Discovery sequence number
    #[serde(skip)]
    pub seq: u64,
}

impl IndexEntry {
    /// Index entry for an artifact, `None` for low-value pages
    pub fn from_artifact(artifact: &MarkdownArtifact) -> Option<Self> {
        if artifact.low_value {
            return None;
        }
        Some(Self {
            url: artifact.url.to_string(),
            title: artifact.title.clone(),
            category: artifact.category,
            description: artifact.description.clone(),
            seq: artifact.seq,
        })
    }
}

/// Accumulates index entries during a run
#[derive(Debug, Default)]
pub struct IndexBuilder {
    entries: Vec<IndexEntry>,
    urls: HashSet<String>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a second entry for the same URL is ignored
    pub fn add(&mut self, entry: IndexEntry) -> bool {
        if !self.urls.insert(entry.url.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Add the entry for an artifact, skipping low-value pages
    pub fn add_artifact(&mut self, artifact: &MarkdownArtifact) -> bool {
        IndexEntry::from_artifact(artifact).is_some_and(|entry| self.add(entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by category priority, then discovery order
    pub fn sorted_entries(&self) -> Vec<&IndexEntry> {
        let mut sorted: Vec<&IndexEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| (e.category, e.seq));
        sorted
    }

    /// Render the llm.txt document
    pub fn render(&self) -> String {
        let mut out = String::from(LLM_TXT_HEADER);
        let sorted = self.sorted_entries();

        for category in Category::ALL {
            let mut group = sorted.iter().filter(|e| e.category == category).peekable();
            if group.peek().is_none() {
                continue;
            }
            out.push_str(&format!("## {category}\n\n"));
            for entry in group {
                out.push_str(&format!(
                    "[{}] {}\n{}\n{}\n\n",
                    entry.category, entry.title, entry.url, entry.description
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn artifact(path: &str, category: Category, seq: u64, low_value: bool) -> MarkdownArtifact {
        MarkdownArtifact {
            url: Url::parse(&format!("https://d.dev{path}")).unwrap(),
            title: format!("Page {seq}"),
            category,
            description: "Does things.".to_string(),
            markdown: String::new(),
            seq,
            depth: 1,
            low_value,
            anchor_links: Vec::new(),
        }
    }

    #[test]
    fn test_orders_by_category_then_sequence() {
        let mut index = IndexBuilder::new();
        // Completion order differs from discovery order.
        index.add_artifact(&artifact("/other", Category::Other, 1, false));
        index.add_artifact(&artifact("/api/b", Category::Api, 5, false));
        index.add_artifact(&artifact("/guide/b", Category::Guide, 4, false));
        index.add_artifact(&artifact("/api/a", Category::Api, 2, false));
        index.add_artifact(&artifact("/guide/a", Category::Guide, 3, false));

        let order: Vec<u64> = index.sorted_entries().iter().map(|e| e.seq).collect();
        assert_eq!(order, vec![3, 4, 2, 5, 1]);
    }

    #[test]
    fn test_low_value_and_duplicates_excluded() {
        let mut index = IndexBuilder::new();
        assert!(index.add_artifact(&artifact("/a", Category::Guide, 0, false)));
        assert!(!index.add_artifact(&artifact("/a", Category::Guide, 3, false)));
        assert!(!index.add_artifact(&artifact("/b", Category::Guide, 1, true)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_many_entries_deduplicated_by_url() {
        let mut index = IndexBuilder::new();
        for seq in 0..20_000u64 {
            let path = format!("/page/{}", seq % 10_000);
            index.add_artifact(&artifact(&path, Category::Other, seq, false));
        }
        assert_eq!(index.len(), 10_000);
        // The first sighting of a URL wins.
        assert!(index.sorted_entries().iter().all(|e| e.seq < 10_000));
    }

    #[test]
    fn test_render_format() {
        let mut index = IndexBuilder::new();
        index.add_artifact(&artifact("/api/x", Category::Api, 1, false));
        index.add_artifact(&artifact("/guide/y", Category::Guide, 2, false));

        let expected = format!(
            "{LLM_TXT_HEADER}## GUIDE\n\n[GUIDE] Page 2\nhttps://d.dev/guide/y\nDoes things.\n\n\
             ## API\n\n[API] Page 1\nhttps://d.dev/api/x\nDoes things.\n\n"
        );
        assert_eq!(index.render(), expected);
    }

    #[test]
    fn test_render_empty_index_is_header_only() {
        assert_eq!(IndexBuilder::new().render(), LLM_TXT_HEADER);
    }

    #[test]
    fn test_entry_serializes_category_tag() {
        let entry = IndexEntry::from_artifact(&artifact("/t", Category::Tutorial, 0, false)).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["category"], "TUTORIAL");
        assert!(json.get("seq").is_none());
    }
}
