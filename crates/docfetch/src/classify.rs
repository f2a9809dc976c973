//! Page classification, title cleanup and short descriptions

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Maximum description length in characters
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Description used when a page has no usable text
pub const FALLBACK_DESCRIPTION: &str = "Documentation page content.";

/// Site-name suffixes stripped from page titles
const TITLE_SUFFIXES: &[&str] = &[
    " - Documentation",
    " | Documentation",
    " — Documentation",
    " - Docs",
    " | Docs",
    " Documentation",
    " Docs",
    " API Reference",
];

/// Kind of documentation page, in llm.txt priority order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Guide,
    Api,
    Tutorial,
    Other,
}

impl Category {
    /// All categories in index order
    pub const ALL: [Category; 4] = [
        Category::Guide,
        Category::Api,
        Category::Tutorial,
        Category::Other,
    ];

    /// Tag as written in llm.txt
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Guide => "GUIDE",
            Category::Api => "API",
            Category::Tutorial => "TUTORIAL",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a page from its URL path and title
///
/// API wins over TUTORIAL, which wins over GUIDE; anything unmatched is OTHER.
pub fn classify(url: &Url, title: &str) -> Category {
    let path = url.path().to_lowercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let title_lower = title.to_lowercase();
    let words: Vec<&str> = title_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let has_segment = |names: &[&str]| segments.iter().any(|s| names.contains(s));
    let has_word = |names: &[&str]| words.iter().any(|w| names.contains(w));

    if has_segment(&["api", "apis", "pkg", "reference", "ref", "spec"])
        || has_word(&["api", "apis", "reference", "package", "specification"])
    {
        return Category::Api;
    }

    if has_segment(&["tutorial", "tutorials", "learn", "example", "examples", "quickstart"])
        || has_word(&["tutorial", "tutorials", "example", "examples", "walkthrough"])
    {
        return Category::Tutorial;
    }

    if has_segment(&["guide", "guides", "getting-started", "howto", "how-to"])
        || path.contains("/docs/guides/")
        || has_word(&["guide", "guides", "introduction", "overview"])
        || title_lower.contains("getting started")
    {
        return Category::Guide;
    }

    Category::Other
}

/// Remove common documentation-site suffixes from a page title
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.trim().to_string();
    for suffix in TITLE_SUFFIXES {
        cleaned = cleaned.replace(suffix, "");
    }
    cleaned.trim().to_string()
}

/// Build a one-line description from page text
///
/// Takes the first two sentences when they fit in 200 characters, else the
/// first sentence, truncating with an ellipsis if even that is too long.
pub fn describe(text: &str) -> String {
    let content = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if content.is_empty() {
        return FALLBACK_DESCRIPTION.to_string();
    }

    let sentences: Vec<&str> = content
        .split(". ")
        .map(|s| s.trim_end_matches('.'))
        .filter(|s| !s.is_empty())
        .collect();

    let desc = match sentences.as_slice() {
        [] => return FALLBACK_DESCRIPTION.to_string(),
        [only] => format!("{only}."),
        [first, second, ..] => {
            let two = format!("{first}. {second}.");
            if two.chars().count() > MAX_DESCRIPTION_CHARS {
                format!("{first}.")
            } else {
                two
            }
        }
    };

    if desc.chars().count() > MAX_DESCRIPTION_CHARS {
        let truncated: String = desc.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
        format!("{}...", truncated.trim_end())
    } else {
        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_by_path() {
        assert_eq!(classify(&url("https://x.dev/api/client"), "Client"), Category::Api);
        assert_eq!(classify(&url("https://x.dev/pkg/net/http"), "http"), Category::Api);
        assert_eq!(
            classify(&url("https://x.dev/tutorial/first-app"), "First app"),
            Category::Tutorial
        );
        assert_eq!(
            classify(&url("https://x.dev/guide/install"), "Install"),
            Category::Guide
        );
        assert_eq!(classify(&url("https://x.dev/blog/2024"), "News"), Category::Other);
    }

    #[test]
    fn test_classify_by_title() {
        assert_eq!(classify(&url("https://x.dev/"), "Getting Started"), Category::Guide);
        assert_eq!(classify(&url("https://x.dev/x"), "REST API"), Category::Api);
        assert_eq!(classify(&url("https://x.dev/x"), "Examples"), Category::Tutorial);
        // "rapid" must not count as "api"
        assert_eq!(classify(&url("https://x.dev/x"), "Rapid builds"), Category::Other);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify(&url("https://x.dev/API/Thing"), ""), Category::Api);
    }

    #[test]
    fn test_category_order_and_tags() {
        let mut cats = vec![Category::Other, Category::Tutorial, Category::Guide, Category::Api];
        cats.sort();
        assert_eq!(cats, Category::ALL.to_vec());
        assert_eq!(Category::Tutorial.to_string(), "TUTORIAL");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  Routing - Documentation "), "Routing");
        assert_eq!(clean_title("Hooks | Docs"), "Hooks");
        assert_eq!(clean_title("Plain"), "Plain");
    }

    #[test]
    fn test_describe_takes_two_sentences() {
        assert_eq!(
            describe("First sentence. Second one. Third."),
            "First sentence. Second one."
        );
    }

    #[test]
    fn test_describe_single_sentence() {
        assert_eq!(describe("Just one\n  line"), "Just one line.");
    }

    #[test]
    fn test_describe_truncates_long_text() {
        let long = "word ".repeat(100);
        let desc = describe(&long);
        assert!(desc.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn test_describe_empty() {
        assert_eq!(describe("   "), FALLBACK_DESCRIPTION);
    }
}
