//! Document codecs and the progress hook.
//!
//! Package formats plug in through [`DocumentParser`] and
//! [`DocumentSerializer`]. [`JsonCodec`] reads and writes the engine's own
//! tree as JSON: `{ kind, root, parts, revisions }`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::differ::changes::Revision;
use crate::error::{RedlineError, Result};
use crate::types::{Document, DocumentKind, Node};

/// Turns package bytes into a document tree.
pub trait DocumentParser {
    /// Parse `bytes` as a document of `kind`.
    fn parse_document(&self, bytes: &[u8], kind: DocumentKind) -> Result<Document>;
}

/// Turns a merged tree and its revisions back into package bytes.
pub trait DocumentSerializer {
    fn serialize_document(
        &self,
        document: &Document,
        revisions: &[Revision],
        kind: DocumentKind,
    ) -> Result<Vec<u8>>;
}

/// Receives stage messages during a comparison.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, message: &str);
}

impl<F> ProgressListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_progress(&self, message: &str) {
        self(message)
    }
}

/// On-disk JSON layout.
#[derive(Serialize)]
struct JsonDocumentRef<'a> {
    kind: DocumentKind,
    root: &'a Node,
    parts: &'a BTreeMap<String, String>,
    revisions: &'a [Revision],
}

#[derive(Deserialize)]
struct JsonDocument {
    kind: DocumentKind,
    root: Node,
    #[serde(default)]
    parts: BTreeMap<String, String>,
}

/// JSON document codec.
#[derive(Clone, Debug)]
pub struct JsonCodec {
    pub pretty_print: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a document file.
    pub fn read_file(&self, path: &Path, kind: DocumentKind) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        self.parse_document(&bytes, kind)
    }
}

impl DocumentParser for JsonCodec {
    fn parse_document(&self, bytes: &[u8], kind: DocumentKind) -> Result<Document> {
        let parsed: JsonDocument = serde_json::from_slice(bytes)
            .map_err(|e| RedlineError::parse(format!("invalid document JSON: {}", e)))?;
        if parsed.kind != kind {
            return Err(RedlineError::KindMismatch {
                expected: kind.to_string(),
                found: parsed.kind.to_string(),
            });
        }
        if !parsed.root.is_container() {
            return Err(RedlineError::parse("document root must be a container"));
        }
        if parsed.root.has_marks() {
            return Err(RedlineError::parse("document already contains revision marks"));
        }
        Ok(Document {
            kind: parsed.kind,
            root: parsed.root,
            parts: parsed.parts,
        })
    }
}

impl DocumentSerializer for JsonCodec {
    fn serialize_document(
        &self,
        document: &Document,
        revisions: &[Revision],
        kind: DocumentKind,
    ) -> Result<Vec<u8>> {
        if document.kind != kind {
            return Err(RedlineError::KindMismatch {
                expected: kind.to_string(),
                found: document.kind.to_string(),
            });
        }
        let layout = JsonDocumentRef {
            kind,
            root: &document.root,
            parts: &document.parts,
            revisions,
        };
        let bytes = if self.pretty_print {
            serde_json::to_vec_pretty(&layout)?
        } else {
            serde_json::to_vec(&layout)?
        };
        Ok(bytes)
    }
}
