//! Change and revision types produced by a comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::NodePath;

/// Kind of a revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Insert,
    Delete,
    /// Paired content replaced in place: a whole-block replace, or a keyed
    /// cell or shape whose content changed.
    ContentChange,
    FormatChange,
    Move,
}

impl RevisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionKind::Insert => "insert",
            RevisionKind::Delete => "delete",
            RevisionKind::ContentChange => "content_change",
            RevisionKind::FormatChange => "format_change",
            RevisionKind::Move => "move",
        }
    }

    /// Label used in summaries and annotations.
    pub fn label(&self) -> &'static str {
        match self {
            RevisionKind::Insert => "Inserted",
            RevisionKind::Delete => "Deleted",
            RevisionKind::ContentChange => "Changed",
            RevisionKind::FormatChange => "Formatting changed",
            RevisionKind::Move => "Moved",
        }
    }
}

/// Content fingerprint of a deleted or inserted block, used for move detection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    /// Hash over the full hashes of the block's atoms, in order.
    pub digest: u64,
    /// Sorted content hashes of the atomic units inside the block.
    pub shingles: Vec<u64>,
}

/// A classified change inside one comparison unit, before revision ids are assigned.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub kind: RevisionKind,
    pub original_paths: Vec<NodePath>,
    pub modified_paths: Vec<NodePath>,
    pub before: Option<String>,
    pub after: Option<String>,
    /// Present on blocks that may take part in cross-unit move detection.
    pub fingerprint: Option<Fingerprint>,
}

impl Change {
    pub fn new(kind: RevisionKind) -> Self {
        Self {
            kind,
            original_paths: Vec::new(),
            modified_paths: Vec::new(),
            before: None,
            after: None,
            fingerprint: None,
        }
    }

    /// Set the original side.
    pub fn with_original(mut self, paths: Vec<NodePath>, before: String) -> Self {
        self.original_paths = paths;
        self.before = Some(before);
        self
    }

    /// Set the modified side.
    pub fn with_modified(mut self, paths: Vec<NodePath>, after: String) -> Self {
        self.modified_paths = paths;
        self.after = Some(after);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Address of a change: comparison unit plus index in that unit's change list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeRef {
    pub unit: usize,
    pub change: usize,
}

impl ChangeRef {
    pub fn new(unit: usize, change: usize) -> Self {
        Self { unit, change }
    }
}

/// A single attributed change in the merged document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// 1-based id, in merged document order.
    pub id: u32,
    pub kind: RevisionKind,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    /// Locations in the original document.
    #[serde(default)]
    pub original_paths: Vec<NodePath>,
    /// Locations in the modified document.
    #[serde(default)]
    pub modified_paths: Vec<NodePath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl Revision {
    /// One-line description, e.g. `Inserted "sprinted fast."`.
    pub fn describe(&self) -> String {
        let excerpt = |s: &str| {
            let flat = s.replace('\n', " / ");
            if flat.chars().count() > 60 {
                let cut: String = flat.chars().take(57).collect();
                format!("{}...", cut)
            } else {
                flat
            }
        };
        match (self.kind, &self.before, &self.after) {
            (RevisionKind::Delete, Some(before), _) => {
                format!("{} \"{}\"", self.kind.label(), excerpt(before))
            }
            (RevisionKind::Move, Some(before), Some(after)) if before != after => format!(
                "{} \"{}\" -> \"{}\"",
                self.kind.label(),
                excerpt(before),
                excerpt(after)
            ),
            (RevisionKind::Insert | RevisionKind::Move, _, Some(after)) => {
                format!("{} \"{}\"", self.kind.label(), excerpt(after))
            }
            (_, Some(before), Some(after)) => format!(
                "{} \"{}\" -> \"{}\"",
                self.kind.label(),
                excerpt(before),
                excerpt(after)
            ),
            _ => self.kind.label().to_string(),
        }
    }
}

/// Revision counts per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSummary {
    pub inserts: u32,
    pub deletes: u32,
    pub content_changes: u32,
    pub format_changes: u32,
    pub moves: u32,
}

impl RevisionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_revisions(revisions: &[Revision]) -> Self {
        let mut summary = Self::new();
        for revision in revisions {
            summary.record(revision.kind);
        }
        summary
    }

    /// Increment the counter for `kind`.
    pub fn record(&mut self, kind: RevisionKind) {
        match kind {
            RevisionKind::Insert => self.inserts += 1,
            RevisionKind::Delete => self.deletes += 1,
            RevisionKind::ContentChange => self.content_changes += 1,
            RevisionKind::FormatChange => self.format_changes += 1,
            RevisionKind::Move => self.moves += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.inserts + self.deletes + self.content_changes + self.format_changes + self.moves
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let counts = [
            (self.inserts, "inserted"),
            (self.deletes, "deleted"),
            (self.content_changes, "changed"),
            (self.format_changes, "reformatted"),
            (self.moves, "moved"),
        ];
        let parts: Vec<String> = counts
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!("{} {}", count, label))
            .collect();

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}
