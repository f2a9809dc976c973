//! Arena-backed HTML tree
//!
//! Nodes live in a single vector and refer to each other by index. Removing
//! a subtree only unlinks it from its parent, so ids stay valid and there are
//! no reference cycles to manage.

use scraper::{Html, Node as HtmlNode};

/// Index of a node inside a [`Document`]
pub type NodeId = usize;

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Tree root
    Root,
    /// Element with lowercase tag name and attributes in source order
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// Text, entities already decoded
    Text(String),
}

/// One node of the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

/// Parsed HTML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a full HTML document
    pub fn parse(html: &str) -> Self {
        Self::from_html(&Html::parse_document(html))
    }

    /// Parse an HTML fragment
    pub fn parse_fragment(html: &str) -> Self {
        Self::from_html(&Html::parse_fragment(html))
    }

    fn from_html(html: &Html) -> Self {
        let mut doc = Document {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Root,
            }],
        };

        // (source node, arena parent); children pushed in reverse so the
        // stack pops them in document order.
        let mut stack = Vec::new();
        for child in html.tree.root().children().rev() {
            stack.push((child, 0));
        }

        while let Some((source, parent)) = stack.pop() {
            let kind = match source.value() {
                HtmlNode::Element(element) => NodeKind::Element {
                    name: element.name().to_ascii_lowercase(),
                    attrs: element
                        .attrs()
                        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                        .collect(),
                },
                HtmlNode::Text(text) => {
                    let text: &str = &text.text;
                    NodeKind::Text(text.to_string())
                }
                HtmlNode::Fragment | HtmlNode::Document => {
                    // Transparent containers: hoist their children.
                    for child in source.children().rev() {
                        stack.push((child, parent));
                    }
                    continue;
                }
                _ => continue,
            };

            let id = doc.push(parent, kind);
            for child in source.children().rev() {
                stack.push((child, id));
            }
        }

        doc
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Id of the root node
    pub fn root(&self) -> NodeId {
        0
    }

    /// Total nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the document has no nodes besides the root
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Access a node
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Children of a node in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Parent of a node, `None` for the root or a detached node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Tag name if the node is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Text if the node is a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// True if the node is an element with the given tag name
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Attribute value of an element
    pub fn attr(&self, id: NodeId, attr: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == attr)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Whitespace-separated class names of an element
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_whitespace()
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.nodes[id].parent,
        }
    }

    /// Pre-order traversal of a subtree, the node itself first
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// First element in the subtree (pre-order) with the given tag
    pub fn find_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id).find(|&n| self.is_tag(n, tag))
    }

    /// All text in a subtree, concatenated as-is
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(text) = self.text(n) {
                out.push_str(text);
            }
        }
        out
    }

    /// Text of a subtree with whitespace runs collapsed and trimmed
    pub fn normalized_text(&self, id: NodeId) -> String {
        collapse_whitespace(&self.text_content(id))
    }

    /// Unlink a node from its parent; the subtree becomes unreachable
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.nodes[current].parent;
        Some(current)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.nodes[current].children.iter().rev().copied());
        Some(current)
    }
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
