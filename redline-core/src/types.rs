//! Data models for compound documents.
//!
//! A single polymorphic tree represents word-processing documents,
//! spreadsheets and presentations. Containers give structure (sections,
//! tables, rows, sheets, slides) and leaves carry the content payload plus a
//! formatting attribute set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Formatting attributes of a leaf. Ordered so hashing is deterministic.
pub type Formatting = BTreeMap<String, String>;

/// Index chain from the document root to a node.
pub type NodePath = Vec<usize>;

/// Kind of compound document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Wordprocessing,
    Spreadsheet,
    Presentation,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Wordprocessing => "wordprocessing",
            DocumentKind::Spreadsheet => "spreadsheet",
            DocumentKind::Presentation => "presentation",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a container node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRole {
    Document,
    Section,
    Paragraph,
    Table,
    Row,
    Cell,
    Sheet,
    Slide,
    Group,
    /// Revision summary synthesized by the reconstructor.
    Summary,
}

impl ContainerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRole::Document => "document",
            ContainerRole::Section => "section",
            ContainerRole::Paragraph => "paragraph",
            ContainerRole::Table => "table",
            ContainerRole::Row => "row",
            ContainerRole::Cell => "cell",
            ContainerRole::Sheet => "sheet",
            ContainerRole::Slide => "slide",
            ContainerRole::Group => "group",
            ContainerRole::Summary => "summary",
        }
    }
}

/// Content payload of a leaf node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeafContent {
    /// A run of text inside a paragraph.
    Run { text: String },
    /// A spreadsheet cell. `reference` is the A1-style address.
    Cell {
        reference: String,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formula: Option<String>,
    },
    /// A presentation shape with its text body.
    Shape {
        name: String,
        shape_type: String,
        #[serde(default)]
        text: String,
    },
    /// An image reference, compared by name and content digest.
    Image { name: String, digest: String },
    /// Speaker notes or a comment body.
    Note { text: String },
    /// A construct the engine does not decompose.
    Opaque {
        tag: String,
        #[serde(default)]
        data: String,
    },
    /// Reviewer annotation added by the reconstructor. Never compared.
    Annotation { text: String },
}

impl LeafContent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LeafContent::Run { .. } => "run",
            LeafContent::Cell { .. } => "cell",
            LeafContent::Shape { .. } => "shape",
            LeafContent::Image { .. } => "image",
            LeafContent::Note { .. } => "note",
            LeafContent::Opaque { .. } => "opaque",
            LeafContent::Annotation { .. } => "annotation",
        }
    }

    /// Append the content a reader would see to `out`.
    pub fn write_visible(&self, out: &mut String) {
        match self {
            LeafContent::Run { text } | LeafContent::Note { text } => out.push_str(text),
            LeafContent::Cell {
                reference,
                value,
                formula,
            } => {
                out.push_str(reference);
                out.push('=');
                out.push_str(value);
                if let Some(formula) = formula {
                    out.push('|');
                    out.push_str(formula);
                }
                out.push('\u{1f}');
            }
            LeafContent::Shape {
                name,
                shape_type,
                text,
            } => {
                out.push_str(name);
                out.push(':');
                out.push_str(shape_type);
                out.push(':');
                out.push_str(text);
                out.push('\u{1f}');
            }
            LeafContent::Image { name, digest } => {
                out.push_str(name);
                out.push('@');
                out.push_str(digest);
                out.push('\u{1f}');
            }
            LeafContent::Opaque { tag, data } => {
                out.push('<');
                out.push_str(tag);
                out.push('>');
                out.push_str(data);
                out.push('\u{1f}');
            }
            LeafContent::Annotation { .. } => {}
        }
    }
}

/// What a revision mark says about the marked subtree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkKind {
    Inserted,
    /// Deleted but kept visible (struck through).
    Deleted,
    /// Content moved here from `from` in the original document.
    Moved { from: NodePath },
    FormatChanged { previous: Formatting },
}

/// Revision marker attached to a node of the merged tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMark {
    /// Id of the revision in the revision list.
    pub revision: u32,
    pub kind: MarkKind,
}

impl RevisionMark {
    pub fn new(revision: u32, kind: MarkKind) -> Self {
        Self { revision, kind }
    }
}

/// A structural node with ordered children and no direct content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub role: ContainerRole,
    /// Identity of named containers (sheet names, named slides).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<RevisionMark>,
}

/// A content-bearing node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    pub content: LeafContent,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub formatting: Formatting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<RevisionMark>,
}

/// A node of the document tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Container(Container),
    Leaf(Leaf),
}

impl Node {
    /// Create an unnamed container.
    pub fn container(role: ContainerRole, children: Vec<Node>) -> Self {
        Node::Container(Container {
            role,
            name: None,
            children,
            mark: None,
        })
    }

    /// Create a named container (sheets, named slides).
    pub fn named(role: ContainerRole, name: &str, children: Vec<Node>) -> Self {
        Node::Container(Container {
            role,
            name: Some(name.to_string()),
            children,
            mark: None,
        })
    }

    /// Create an unformatted leaf.
    pub fn leaf(content: LeafContent) -> Self {
        Node::Leaf(Leaf {
            content,
            formatting: Formatting::new(),
            mark: None,
        })
    }

    pub fn run(text: &str) -> Self {
        Node::leaf(LeafContent::Run {
            text: text.to_string(),
        })
    }

    /// A paragraph holding a single unformatted run.
    pub fn paragraph(text: &str) -> Self {
        Node::container(ContainerRole::Paragraph, vec![Node::run(text)])
    }

    pub fn cell(reference: &str, value: &str, formula: Option<&str>) -> Self {
        Node::leaf(LeafContent::Cell {
            reference: reference.to_string(),
            value: value.to_string(),
            formula: formula.map(|f| f.to_string()),
        })
    }

    pub fn shape(name: &str, shape_type: &str, text: &str) -> Self {
        Node::leaf(LeafContent::Shape {
            name: name.to_string(),
            shape_type: shape_type.to_string(),
            text: text.to_string(),
        })
    }

    /// Builder: set a formatting attribute on a leaf. Containers are returned unchanged.
    pub fn with_format(mut self, key: &str, value: &str) -> Self {
        if let Node::Leaf(leaf) = &mut self {
            leaf.formatting.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Container(_))
    }

    pub fn role(&self) -> Option<ContainerRole> {
        match self {
            Node::Container(c) => Some(c.role),
            Node::Leaf(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Container(c) => &c.children,
            Node::Leaf(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    /// Follow `path` from this node.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let mut current = self;
        for &index in path {
            current = current.child(index)?;
        }
        Some(current)
    }

    pub fn mark(&self) -> Option<&RevisionMark> {
        match self {
            Node::Container(c) => c.mark.as_ref(),
            Node::Leaf(l) => l.mark.as_ref(),
        }
    }

    pub fn set_mark(&mut self, mark: Option<RevisionMark>) {
        match self {
            Node::Container(c) => c.mark = mark,
            Node::Leaf(l) => l.mark = mark,
        }
    }

    /// Clone of this node carrying `mark`.
    pub fn marked(&self, mark: RevisionMark) -> Node {
        let mut node = self.clone();
        node.set_mark(Some(mark));
        node
    }

    /// True when this node or any descendant carries a revision mark.
    pub fn has_marks(&self) -> bool {
        self.mark().is_some() || self.children().iter().any(Node::has_marks)
    }

    /// Concatenated run text of the subtree, for display.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Container(c) => {
                for child in &c.children {
                    child.collect_text(out);
                }
            }
            Node::Leaf(l) => match &l.content {
                LeafContent::Run { text }
                | LeafContent::Note { text }
                | LeafContent::Shape { text, .. } => out.push_str(text),
                LeafContent::Cell { value, .. } => out.push_str(value),
                _ => {}
            },
        }
    }
}

/// A parsed compound document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub root: Node,
    /// Non-content package parts (styles catalog, metadata), carried verbatim.
    #[serde(default)]
    pub parts: BTreeMap<String, String>,
}

impl Document {
    pub fn new(kind: DocumentKind, root: Node) -> Self {
        Self {
            kind,
            root,
            parts: BTreeMap::new(),
        }
    }

    /// Builder: attach a package part.
    pub fn with_part(mut self, name: &str, content: &str) -> Self {
        self.parts.insert(name.to_string(), content.to_string());
        self
    }

    /// Convenience constructor: a word-processing document with one section.
    pub fn from_paragraphs(paragraphs: &[&str]) -> Self {
        let section = Node::container(
            ContainerRole::Section,
            paragraphs.iter().map(|p| Node::paragraph(p)).collect(),
        );
        Document::new(
            DocumentKind::Wordprocessing,
            Node::container(ContainerRole::Document, vec![section]),
        )
    }
}
