//! Compare commands - `redline docs`, `redline sheets` and `redline slides`
//!
//! Each command reads two JSON documents of its kind, compares them on a
//! blocking worker with an optional timeout, writes the merged document and
//! prints the revisions that were found. The output file is only written
//! once the whole comparison has succeeded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;

use redline_core::settings::DEFAULT_DETAIL_THRESHOLD;
use redline_core::{
    compare_with_progress, Comparison, ComparisonSettings, Document, DocumentKind,
    DocumentSerializer, JsonCodec, NodePath, Revision, RevisionKind, RevisionSummary,
};

use crate::config::RedlineConfig;
use crate::output::{Output, OutputConfig, OutputFormat, Outputter, TableOutput};

/// Word-processing comparisons refine every paired block down to words.
pub const DOCS_DETAIL_THRESHOLD: f64 = 0.0;

/// Exit status when a comparison runs past `--timeout`.
const EXIT_TIMEOUT: i32 = 124;

/// Spinner frame interval.
const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Arguments shared by every compare command.
#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Author recorded on every revision
    pub author: String,

    /// Original document (JSON)
    pub original: PathBuf,

    /// Modified document (JSON)
    pub modified: PathBuf,

    /// Where to write the merged document
    pub output: PathBuf,

    /// Detail threshold (0.0-1.0): pairs matching less than this are replaced whole
    #[arg(short, long, value_parser = crate::parse_threshold)]
    pub threshold: Option<f64>,

    /// Do not report formatting-only changes
    #[arg(long)]
    pub no_formatting: bool,

    /// Do not report inserted or deleted sections, sheets and slides
    #[arg(long)]
    pub no_structure: bool,

    /// Detect moved blocks that were also edited, above this similarity (0.0-1.0)
    #[arg(long, value_parser = crate::parse_threshold)]
    pub move_similarity: Option<f64>,
}

/// Per-kind scope switches. Flags that do not apply to a kind stay off.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeSwitches {
    pub no_values: bool,
    pub no_formulas: bool,
    pub no_images: bool,
    pub no_notes: bool,
    pub no_summary: bool,
    pub no_annotations: bool,
}

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Comparison timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Comparison worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result of a compare command.
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub kind: DocumentKind,
    pub author: String,
    pub original: String,
    pub modified: String,
    pub output: String,
    pub revision_count: usize,
    pub summary: RevisionSummary,
    pub revisions: Vec<Revision>,
    pub duration_ms: f64,
}

impl CompareReport {
    fn new(kind: DocumentKind, args: &CompareArgs, comparison: Comparison) -> Self {
        Self {
            kind,
            author: args.author.clone(),
            original: args.original.display().to_string(),
            modified: args.modified.display().to_string(),
            output: args.output.display().to_string(),
            revision_count: comparison.revisions.len(),
            summary: comparison.summary,
            revisions: comparison.revisions,
            duration_ms: comparison.duration_ms,
        }
    }
}

impl Outputter for CompareReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {}\n",
            "✓".green(),
            completion_message(self.kind).bold()
        ));
        output.push_str(&format!(
            "{} {}\n\n",
            "Revisions found:".cyan().bold(),
            self.revision_count
        ));

        if !self.revisions.is_empty() {
            let rows: Vec<Vec<String>> = self
                .revisions
                .iter()
                .map(|revision| {
                    vec![
                        revision.id.to_string(),
                        colored_kind(revision.kind),
                        location(revision),
                        revision.describe(),
                    ]
                })
                .collect();
            output.push_str(&TableOutput::from_rows(
                &["#", "Kind", "Location", "Change"],
                &rows,
                config,
            ));
            output.push_str("\n\n");
        }

        let stamped = self
            .revisions
            .first()
            .map(|r| r.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string());
        let pairs = vec![
            ("Summary", self.summary.text()),
            ("Author", self.author.clone()),
            ("Timestamp", stamped),
            ("Output", self.output.clone()),
            ("Time", format!("{:.1}ms", self.duration_ms)),
        ];
        output.push_str(&TableOutput::format_key_value(&pairs, config));
        output
    }
}

fn completion_message(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Wordprocessing => "Document comparison complete",
        DocumentKind::Spreadsheet => "Spreadsheet comparison complete",
        DocumentKind::Presentation => "Presentation comparison complete",
    }
}

fn colored_kind(kind: RevisionKind) -> String {
    let name = kind.as_str();
    match kind {
        RevisionKind::Insert => name.green().to_string(),
        RevisionKind::Delete => name.red().to_string(),
        RevisionKind::ContentChange => name.yellow().to_string(),
        RevisionKind::FormatChange => name.magenta().to_string(),
        RevisionKind::Move => name.blue().to_string(),
    }
}

fn format_path(path: &NodePath) -> String {
    path.iter()
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `original -> modified` for moves, otherwise whichever side exists.
fn location(revision: &Revision) -> String {
    match (
        revision.original_paths.first().map(format_path),
        revision.modified_paths.first().map(format_path),
    ) {
        (Some(from), Some(to)) if revision.kind == RevisionKind::Move => {
            format!("{} -> {}", from, to)
        }
        (_, Some(to)) => to,
        (Some(from), None) => from,
        (None, None) => "-".to_string(),
    }
}

/// Resolve settings: command-line flag, then `.redlinerc.toml`, then the
/// kind's default.
pub fn build_settings(
    kind: DocumentKind,
    args: &CompareArgs,
    switches: ScopeSwitches,
    config: &RedlineConfig,
) -> anyhow::Result<ComparisonSettings> {
    let enabled = |off: bool, configured: Option<bool>| !off && configured.unwrap_or(true);

    let default_threshold = match kind {
        DocumentKind::Wordprocessing => DOCS_DETAIL_THRESHOLD,
        DocumentKind::Spreadsheet | DocumentKind::Presentation => DEFAULT_DETAIL_THRESHOLD,
    };
    let threshold = args
        .threshold
        .or(config.compare.threshold)
        .unwrap_or(default_threshold);

    let mut builder = ComparisonSettings::builder(&args.author)
        .with_detail_threshold(threshold)
        .with_formatting(enabled(args.no_formatting, config.compare.formatting))
        .with_structure(enabled(args.no_structure, config.compare.structure))
        .with_move_similarity(args.move_similarity.or(config.compare.move_similarity));

    match kind {
        DocumentKind::Wordprocessing => {}
        DocumentKind::Spreadsheet => {
            builder = builder
                .with_values(enabled(switches.no_values, config.sheets.values))
                .with_formulas(enabled(switches.no_formulas, config.sheets.formulas));
        }
        DocumentKind::Presentation => {
            builder = builder
                .with_images(enabled(switches.no_images, config.slides.images))
                .with_notes(enabled(switches.no_notes, config.slides.notes))
                .with_summary_slide(enabled(switches.no_summary, config.slides.summary))
                .with_notes_annotations(enabled(
                    switches.no_annotations,
                    config.slides.annotations,
                ));
        }
    }

    builder.build().context("Invalid comparison settings")
}

fn read_document(
    codec: &JsonCodec,
    path: &Path,
    kind: DocumentKind,
    role: &str,
) -> anyhow::Result<Document> {
    codec
        .read_file(path, kind)
        .with_context(|| format!("Failed to read {} document {}", role, path.display()))
}

fn make_spinner(format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(SPINNER_TICK);
    spinner
}

/// Run a compare command for `kind`.
pub async fn run(
    kind: DocumentKind,
    args: CompareArgs,
    switches: ScopeSwitches,
    config: &RedlineConfig,
    timeout_secs: Option<u64>,
    output: OutputConfig,
) -> anyhow::Result<()> {
    let settings = build_settings(kind, &args, switches, config)?;
    let codec = JsonCodec::new();

    let original = read_document(&codec, &args.original, kind, "original")?;
    let modified = read_document(&codec, &args.modified, kind, "modified")?;
    tracing::debug!(
        "Comparing {} against {} as {}",
        args.original.display(),
        args.modified.display(),
        kind
    );

    let spinner = make_spinner(output.format);
    spinner.set_message("Starting comparison...");

    let listener_spinner = spinner.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let listener = move |message: &str| listener_spinner.set_message(message.to_string());
        compare_with_progress(&original, &modified, &settings, Some(&listener))
    });

    let joined = match timeout_secs {
        Some(seconds) => match tokio::time::timeout(Duration::from_secs(seconds), worker).await {
            Ok(joined) => joined,
            Err(_) => {
                spinner.finish_and_clear();
                // The blocking worker cannot be cancelled and the runtime would
                // wait for it on shutdown, so exit here.
                eprintln!("Error: {}", CompareError::Timeout { seconds });
                std::process::exit(EXIT_TIMEOUT);
            }
        },
        None => worker.await,
    };
    spinner.finish_and_clear();

    let comparison = joined
        .map_err(CompareError::from)?
        .with_context(|| format!("Failed to compare {} documents", kind))?;

    let bytes = codec
        .serialize_document(&comparison.merged, &comparison.revisions, kind)
        .context("Failed to serialize merged document")?;
    std::fs::write(&args.output, bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    Output::new(CompareReport::new(kind, &args, comparison), output).render()
}
