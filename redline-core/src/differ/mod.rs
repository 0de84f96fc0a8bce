//! Structural diff engine for compound documents.
//!
//! Compares two document trees one container level at a time and produces
//! the plans, changes and moves the reconstructor turns into a merged
//! document with revision marks.
//!
//! # Pipeline
//!
//! - **Aligner**: maximum-length common subsequence of atom hashes
//! - **Correlate**: formatting-only spans, gap pairing, cross-unit moves
//! - **Refine**: level-by-level planning with a per-unit worklist
//! - **Comparator**: root pairing, parallel units via Rayon, move barrier
//!
//! # Example
//!
//! ```rust
//! use redline_core::{compare, ComparisonSettings, Document};
//!
//! let original = Document::from_paragraphs(&["The dog ran."]);
//! let modified = Document::from_paragraphs(&["The dog sprinted fast."]);
//! let settings = ComparisonSettings::builder("alice")
//!     .with_detail_threshold(0.0)
//!     .build()
//!     .unwrap();
//!
//! let result = compare(&original, &modified, &settings).unwrap();
//! assert_eq!(result.revisions.len(), 2);
//! ```

pub mod aligner;
pub mod changes;
pub mod comparator;
pub mod correlate;
pub mod refine;

// Re-export types for lib.rs
pub use changes::{Revision, RevisionKind, RevisionSummary};
pub use comparator::{compare, compare_with_progress, Comparison};
