//! Redline configuration loading from `.redlinerc.toml`.
//!
//! Configuration is optional. Every value has a default, and command-line
//! flags always win over the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [compare]
//! threshold = 0.15
//! formatting = true
//! structure = true
//! move_similarity = 0.6
//!
//! [sheets]
//! values = true
//! formulas = false
//!
//! [slides]
//! images = true
//! notes = true
//! summary = true
//! annotations = false
//!
//! [output]
//! format = "table"
//! color = true
//! compact = false
//! timeout_secs = 120
//! ```

use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".redlinerc.toml";

/// Root configuration structure loaded from `.redlinerc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct RedlineConfig {
    /// Settings shared by every document kind.
    #[serde(default)]
    pub compare: CompareSection,

    /// Spreadsheet scope.
    #[serde(default)]
    pub sheets: SheetsSection,

    /// Presentation scope and annotations.
    #[serde(default)]
    pub slides: SlidesSection,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// `[compare]` section.
#[derive(Debug, Deserialize, Default)]
pub struct CompareSection {
    /// Detail threshold in `[0, 1]`.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Report formatting-only changes.
    #[serde(default)]
    pub formatting: Option<bool>,

    /// Report inserted and deleted sections, sheets and slides.
    #[serde(default)]
    pub structure: Option<bool>,

    /// Similarity floor for fuzzy move detection. Unset means exact moves only.
    #[serde(default)]
    pub move_similarity: Option<f64>,
}

/// `[sheets]` section.
#[derive(Debug, Deserialize, Default)]
pub struct SheetsSection {
    #[serde(default)]
    pub values: Option<bool>,

    #[serde(default)]
    pub formulas: Option<bool>,
}

/// `[slides]` section.
#[derive(Debug, Deserialize, Default)]
pub struct SlidesSection {
    #[serde(default)]
    pub images: Option<bool>,

    #[serde(default)]
    pub notes: Option<bool>,

    /// Append a summary slide listing every revision.
    #[serde(default)]
    pub summary: Option<bool>,

    /// Write revision descriptions into each changed slide's notes.
    #[serde(default)]
    pub annotations: Option<bool>,
}

/// Output formatting preferences.
///
/// Distinct from the runtime `OutputConfig` in the output module, which
/// handles actual rendering.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Defaults to TTY detection.
    #[serde(default)]
    pub color: Option<bool>,

    /// Minified JSON and borderless tables.
    #[serde(default)]
    pub compact: Option<bool>,

    /// Give up on a comparison after this many seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RedlineConfig {
    /// Load configuration from `.redlinerc.toml` in the given directory.
    ///
    /// A missing file yields defaults. Read and parse errors are logged as
    /// warnings and also yield defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured color preference, or `None` for auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn compact(&self) -> bool {
        self.output.compact.unwrap_or(false)
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.output.timeout_secs
    }
}
