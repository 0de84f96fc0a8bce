//! Flattening of document trees into comparable content atoms.
//!
//! Text runs are split into word tokens, cells, shapes, images, notes and
//! opaque leaves become one atom each, and containers become one atom whose
//! hashes summarize their subtree. Hashes are xxh3 over a length-prefixed
//! byte encoding, so identical trees under identical settings always produce
//! identical atoms.

use once_cell::sync::Lazy;
use regex::Regex;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{RedlineError, Result};
use crate::settings::ComparisonSettings;
use crate::types::{Container, Document, Formatting, Leaf, LeafContent, Node, NodePath};

/// Word tokens keep their trailing whitespace; leading whitespace is a token of its own.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+\s*|\s+").unwrap());

/// Shape types the atomizer understands. Anything else degrades to an opaque atom.
const KNOWN_SHAPE_TYPES: &[&str] = &[
    "body",
    "chart",
    "connector",
    "ellipse",
    "group",
    "line",
    "picture",
    "placeholder",
    "rect",
    "subtitle",
    "table",
    "text_box",
    "title",
];

/// How finely an atom was cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// A whole child container; its hashes cover the subtree.
    Container,
    /// A whole leaf (cell, shape, image, note, opaque).
    Leaf,
    /// A word inside a text run.
    Token,
}

/// Smallest unit the aligner compares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    /// Path of the originating node. For tokens, the path of the run.
    pub path: NodePath,
    /// Token index inside the run.
    pub token: Option<usize>,
    pub granularity: Granularity,
    /// Container role or leaf kind, used to decide which atoms may pair.
    pub label: &'static str,
    /// Identity for keyed atoms (cell column, shape name, container name).
    pub key: Option<String>,
    /// Human-readable content.
    pub payload: String,
    pub formatting: Formatting,
    /// Hash of comparable content only.
    pub content_hash: u64,
    /// Hash of content plus formatting.
    pub full_hash: u64,
    /// Sorted content hashes of the atomic units inside this atom.
    pub shingles: Vec<u64>,
}

impl Atom {
    /// Index of the originating node within its parent.
    pub fn child_index(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    pub fn is_token(&self) -> bool {
        self.granularity == Granularity::Token
    }
}

/// Length-prefixed byte encoding fed to xxh3.
struct HashInput(Vec<u8>);

impl HashInput {
    fn new(tag: &str) -> Self {
        let mut input = HashInput(Vec::with_capacity(64));
        input.push_str(tag);
        input
    }

    fn push_str(&mut self, s: &str) -> &mut Self {
        self.0.extend_from_slice(&(s.len() as u64).to_le_bytes());
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    fn push_opt(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => {
                self.0.push(1);
                self.push_str(s)
            }
            None => {
                self.0.push(0);
                self
            }
        }
    }

    fn push_u64(&mut self, value: u64) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn push_formatting(&mut self, formatting: &Formatting) -> &mut Self {
        self.push_u64(formatting.len() as u64);
        for (key, value) in formatting {
            self.push_str(key);
            self.push_str(value);
        }
        self
    }

    fn finish(&self) -> u64 {
        xxh3_64(&self.0)
    }
}

/// Split run text into word tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Column letters of an A1-style reference ("BC12" -> "BC").
pub fn column_of(reference: &str) -> String {
    reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Atoms of one container level: one atom per child container, tokens for
/// text runs and one atom per other leaf. Children excluded by the scope
/// flags produce no atoms.
pub fn atomize_children(node: &Node, path: &[usize], settings: &ComparisonSettings) -> Vec<Atom> {
    atomize_nodes(node.children(), path, settings)
}

fn atomize_nodes(children: &[Node], path: &[usize], settings: &ComparisonSettings) -> Vec<Atom> {
    let mut atoms = Vec::new();
    for (index, child) in children.iter().enumerate() {
        let mut child_path = path.to_vec();
        child_path.push(index);
        match child {
            Node::Container(container) => {
                atoms.push(container_atom(container, child_path, settings));
            }
            Node::Leaf(leaf) => leaf_atoms(leaf, child_path, settings, &mut atoms),
        }
    }
    atoms
}

/// Fully flatten a document to atomic granularity in document order.
///
/// Container boundaries are implicit in the atom paths: two atoms belong to
/// the same container exactly when their paths share that container's prefix.
pub fn atomize(document: &Document, settings: &ComparisonSettings) -> Vec<Atom> {
    let mut atoms = Vec::new();
    let mut stack: Vec<(&Node, NodePath)> = vec![(&document.root, Vec::new())];
    while let Some((node, path)) = stack.pop() {
        match node {
            Node::Container(container) => {
                // Reverse so children pop in order.
                for (index, child) in container.children.iter().enumerate().rev() {
                    let mut child_path = path.clone();
                    child_path.push(index);
                    stack.push((child, child_path));
                }
            }
            Node::Leaf(leaf) => leaf_atoms(leaf, path, settings, &mut atoms),
        }
    }
    atoms
}

fn container_atom(container: &Container, path: NodePath, settings: &ComparisonSettings) -> Atom {
    let inner = atomize_nodes(&container.children, &path, settings);

    let mut content = HashInput::new(container.role.as_str());
    content.push_opt(container.name.as_deref());
    let mut full = HashInput::new(container.role.as_str());
    full.push_opt(container.name.as_deref());

    let mut shingles = Vec::new();
    for atom in &inner {
        content.push_u64(atom.content_hash);
        full.push_u64(atom.full_hash);
        match atom.granularity {
            Granularity::Container => shingles.extend_from_slice(&atom.shingles),
            _ => shingles.push(atom.content_hash),
        }
    }
    shingles.sort_unstable();

    Atom {
        path,
        token: None,
        granularity: Granularity::Container,
        label: container.role.as_str(),
        key: container.name.clone(),
        payload: join_payloads(&inner),
        formatting: Formatting::new(),
        content_hash: content.finish(),
        full_hash: full.finish(),
        shingles,
    }
}

fn leaf_atoms(leaf: &Leaf, path: NodePath, settings: &ComparisonSettings, out: &mut Vec<Atom>) {
    let scope = settings.scope();
    match &leaf.content {
        LeafContent::Annotation { .. } => {}
        LeafContent::Note { .. } if !scope.notes => {}
        LeafContent::Run { text } => {
            for (index, token) in tokenize(text).into_iter().enumerate() {
                let content_hash = HashInput::new("token").push_str(token).finish();
                let full_hash = HashInput::new("token")
                    .push_str(token)
                    .push_formatting(&leaf.formatting)
                    .finish();
                out.push(Atom {
                    path: path.clone(),
                    token: Some(index),
                    granularity: Granularity::Token,
                    label: "token",
                    key: None,
                    payload: token.to_string(),
                    formatting: leaf.formatting.clone(),
                    content_hash,
                    full_hash,
                    shingles: Vec::new(),
                });
            }
        }
        _ => {
            let atom = match whole_leaf_atom(leaf, path.clone(), settings) {
                Ok(atom) => atom,
                Err(err) => {
                    tracing::debug!("Treating leaf at {:?} as opaque: {}", path, err);
                    opaque_atom(leaf, path)
                }
            };
            out.push(atom);
        }
    }
}

fn whole_leaf_atom(leaf: &Leaf, path: NodePath, settings: &ComparisonSettings) -> Result<Atom> {
    let scope = settings.scope();
    let label = leaf.content.kind_name();
    let mut content = HashInput::new(label);
    let (key, payload, words) = match &leaf.content {
        LeafContent::Cell {
            reference,
            value,
            formula,
        } => {
            let column = column_of(reference);
            content.push_str(&column);
            if scope.values {
                content.push_str(value);
            }
            if scope.formulas {
                content.push_opt(formula.as_deref());
            }
            let payload = match formula {
                Some(formula) => format!("{}: {} ({})", reference, value, formula),
                None => format!("{}: {}", reference, value),
            };
            (Some(column), payload, value.as_str())
        }
        LeafContent::Shape {
            name,
            shape_type,
            text,
        } => {
            if !KNOWN_SHAPE_TYPES.contains(&shape_type.as_str()) {
                return Err(RedlineError::UnsupportedFeature {
                    feature: format!("shape type '{}'", shape_type),
                });
            }
            content.push_str(name).push_str(shape_type).push_str(text);
            (Some(name.clone()), format!("{}: {}", name, text), text.as_str())
        }
        LeafContent::Image { name, digest } => {
            content.push_str(name);
            if scope.images {
                content.push_str(digest);
            }
            (Some(name.clone()), name.clone(), "")
        }
        LeafContent::Note { text } => {
            content.push_str(text);
            (None, text.clone(), text.as_str())
        }
        LeafContent::Opaque { tag, data } => {
            content.push_str(tag).push_str(data);
            (None, format!("<{}>", tag), "")
        }
        LeafContent::Run { .. } | LeafContent::Annotation { .. } => {
            return Err(RedlineError::UnsupportedFeature {
                feature: format!("{} as whole leaf", label),
            });
        }
    };
    let content_hash = content.finish();
    let full_hash = HashInput::new(label)
        .push_u64(content_hash)
        .push_formatting(&leaf.formatting)
        .finish();

    let mut shingles: Vec<u64> = tokenize(words)
        .into_iter()
        .map(|word| HashInput::new("token").push_str(word).finish())
        .collect();
    if shingles.is_empty() {
        shingles.push(content_hash);
    }
    shingles.sort_unstable();

    Ok(Atom {
        path,
        token: None,
        granularity: Granularity::Leaf,
        label,
        key,
        payload,
        formatting: leaf.formatting.clone(),
        content_hash,
        full_hash,
        shingles,
    })
}

/// Unkeyed atom hashing the whole serialized leaf.
fn opaque_atom(leaf: &Leaf, path: NodePath) -> Atom {
    let encoded = serde_json::to_string(&leaf.content).unwrap_or_default();
    let content_hash = HashInput::new("opaque").push_str(&encoded).finish();
    let full_hash = HashInput::new("opaque")
        .push_u64(content_hash)
        .push_formatting(&leaf.formatting)
        .finish();
    Atom {
        path,
        token: None,
        granularity: Granularity::Leaf,
        label: "opaque",
        key: None,
        payload: format!("<{}>", leaf.content.kind_name()),
        formatting: leaf.formatting.clone(),
        content_hash,
        full_hash,
        shingles: vec![content_hash],
    }
}

/// Readable text of a run of atoms. Tokens concatenate, everything else goes on its own line.
pub fn join_payloads(atoms: &[Atom]) -> String {
    let mut out = String::new();
    let mut previous_token = false;
    for atom in atoms {
        if !out.is_empty() && !(atom.is_token() && previous_token) {
            out.push('\n');
        }
        out.push_str(&atom.payload);
        previous_token = atom.is_token();
    }
    out
}
