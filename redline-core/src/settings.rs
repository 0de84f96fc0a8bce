//! Comparison settings.
//!
//! Settings are built once through [`ComparisonSettingsBuilder`], which
//! validates every value, and are read-only for the whole comparison.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{RedlineError, Result};

/// Default detail threshold. Pairs whose children match less than this
/// fraction are replaced as a whole block instead of being refined.
pub const DEFAULT_DETAIL_THRESHOLD: f64 = 0.15;

/// Author used when none is given.
pub const DEFAULT_AUTHOR: &str = "redline";

/// Which parts of the content take part in the comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScopeFlags {
    /// Compare displayed cell values.
    pub values: bool,
    /// Compare cell formulas.
    pub formulas: bool,
    /// Compare image content digests (names are always compared).
    pub images: bool,
    /// Compare notes and comments. When off they pass through untouched.
    pub notes: bool,
}

impl Default for ScopeFlags {
    fn default() -> Self {
        Self {
            values: true,
            formulas: true,
            images: true,
            notes: true,
        }
    }
}

/// Validated, immutable settings for one comparison.
#[derive(Clone, Debug, Serialize)]
pub struct ComparisonSettings {
    author: String,
    detail_threshold: f64,
    compare_formatting: bool,
    compare_structure: bool,
    scope: ScopeFlags,
    move_similarity: Option<f64>,
    add_summary_slide: bool,
    annotate_notes: bool,
    timestamp: Option<DateTime<Utc>>,
}

impl ComparisonSettings {
    /// Start building settings for `author`.
    pub fn builder(author: &str) -> ComparisonSettingsBuilder {
        ComparisonSettingsBuilder::new(author)
    }

    /// Author stamped on every revision.
    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn detail_threshold(&self) -> f64 {
        self.detail_threshold
    }

    /// Whether formatting-only differences produce revisions.
    pub fn compare_formatting(&self) -> bool {
        self.compare_formatting
    }

    /// Whether added and removed top-level units (sections, sheets, slides)
    /// produce revisions. When off they are taken from the modified document
    /// silently.
    pub fn compare_structure(&self) -> bool {
        self.compare_structure
    }

    pub fn scope(&self) -> &ScopeFlags {
        &self.scope
    }

    /// Similarity floor for fuzzy move detection. `None` means exact
    /// fingerprint matches only.
    pub fn move_similarity(&self) -> Option<f64> {
        self.move_similarity
    }

    pub fn add_summary_slide(&self) -> bool {
        self.add_summary_slide
    }

    pub fn annotate_notes(&self) -> bool {
        self.annotate_notes
    }

    /// Fixed revision timestamp, if pinned.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            detail_threshold: DEFAULT_DETAIL_THRESHOLD,
            compare_formatting: true,
            compare_structure: true,
            scope: ScopeFlags::default(),
            move_similarity: None,
            add_summary_slide: false,
            annotate_notes: false,
            timestamp: None,
        }
    }
}

/// Builder for [`ComparisonSettings`]. Validation happens in [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct ComparisonSettingsBuilder {
    settings: ComparisonSettings,
}

impl ComparisonSettingsBuilder {
    pub fn new(author: &str) -> Self {
        Self {
            settings: ComparisonSettings {
                author: author.to_string(),
                ..ComparisonSettings::default()
            },
        }
    }

    pub fn with_detail_threshold(mut self, threshold: f64) -> Self {
        self.settings.detail_threshold = threshold;
        self
    }

    pub fn with_formatting(mut self, enabled: bool) -> Self {
        self.settings.compare_formatting = enabled;
        self
    }

    pub fn with_structure(mut self, enabled: bool) -> Self {
        self.settings.compare_structure = enabled;
        self
    }

    pub fn with_values(mut self, enabled: bool) -> Self {
        self.settings.scope.values = enabled;
        self
    }

    pub fn with_formulas(mut self, enabled: bool) -> Self {
        self.settings.scope.formulas = enabled;
        self
    }

    pub fn with_images(mut self, enabled: bool) -> Self {
        self.settings.scope.images = enabled;
        self
    }

    pub fn with_notes(mut self, enabled: bool) -> Self {
        self.settings.scope.notes = enabled;
        self
    }

    /// Opt into fuzzy move detection with the given similarity floor.
    pub fn with_move_similarity(mut self, floor: Option<f64>) -> Self {
        self.settings.move_similarity = floor;
        self
    }

    pub fn with_summary_slide(mut self, enabled: bool) -> Self {
        self.settings.add_summary_slide = enabled;
        self
    }

    pub fn with_notes_annotations(mut self, enabled: bool) -> Self {
        self.settings.annotate_notes = enabled;
        self
    }

    /// Pin the revision timestamp instead of using the comparison start time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.settings.timestamp = Some(timestamp);
        self
    }

    /// Validate and freeze the settings.
    pub fn build(self) -> Result<ComparisonSettings> {
        let threshold = self.settings.detail_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RedlineError::ThresholdConfig { value: threshold });
        }
        if let Some(floor) = self.settings.move_similarity {
            if !(floor > 0.0 && floor <= 1.0) {
                return Err(RedlineError::InvalidSetting {
                    name: "move_similarity".to_string(),
                    message: format!("must be within (0, 1], got {}", floor),
                });
            }
        }
        if self.settings.author.trim().is_empty() {
            return Err(RedlineError::InvalidSetting {
                name: "author".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(self.settings)
    }
}
