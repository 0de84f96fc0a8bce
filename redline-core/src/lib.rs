//! Redline Core - Structural comparison engine for compound documents.
//!
//! This crate compares two versions of a word-processing document,
//! spreadsheet or presentation and produces a merged document in which
//! every difference is a tracked revision attributed to an author.
//!
//! # Features
//!
//! - **Structural alignment**: Paragraphs, rows, cells, slides and shapes are compared level by level
//! - **Adaptive detail**: Similar blocks are refined down to words, dissimilar ones replaced whole
//! - **Move detection**: Relocated blocks become a single move instead of a delete and an insert
//! - **Formatting changes**: Reported separately from content changes
//! - **Parallel units**: Sections, sheets and slides are planned concurrently using Rayon
//!
//! # Usage
//!
//! ```rust
//! use redline_core::{compare, ComparisonSettings, Document, RevisionKind};
//!
//! let original = Document::from_paragraphs(&["The cat sat.", "The dog ran."]);
//! let modified = Document::from_paragraphs(&["The cat sat.", "The dog sprinted fast."]);
//!
//! let settings = ComparisonSettings::builder("alice")
//!     .with_detail_threshold(0.0)
//!     .build()?;
//! let result = compare(&original, &modified, &settings)?;
//!
//! assert_eq!(result.revisions[0].kind, RevisionKind::Delete);
//! assert_eq!(result.revisions[1].kind, RevisionKind::Insert);
//! # Ok::<(), redline_core::RedlineError>(())
//! ```

pub mod atomizer;
pub mod codec;
pub mod differ;
pub mod error;
pub mod reconstruct;
pub mod settings;
pub mod types;

pub use codec::{DocumentParser, DocumentSerializer, JsonCodec, ProgressListener};
pub use differ::{compare, compare_with_progress, Comparison, Revision, RevisionKind, RevisionSummary};
pub use error::{RedlineError, Result};
pub use settings::{ComparisonSettings, ComparisonSettingsBuilder, ScopeFlags};
pub use types::{
    Container, ContainerRole, Document, DocumentKind, Formatting, Leaf, LeafContent, MarkKind,
    Node, NodePath, RevisionMark,
};

/// Get the version of the redline-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
