//! Redline CLI - Command-line interface for structural document comparison
//!
//! Compares two versions of a document, spreadsheet or presentation and
//! writes a merged copy in which every difference is a tracked revision.

use clap::{CommandFactory, Parser, Subcommand};
use redline_core::DocumentKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parse and validate a fraction (must be between 0.0 and 1.0)
fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "threshold must be between 0.0 and 1.0, got {}",
            value
        ));
    }
    Ok(value)
}

mod commands;
mod config;
mod output;

use commands::compare::{CompareArgs, ScopeSwitches};
use commands::*;
use config::RedlineConfig;
use output::{OutputConfig, OutputFormat};

/// Tracked-changes comparison for documents, spreadsheets and presentations.
#[derive(Parser)]
#[command(name = "redline")]
#[command(author, version)]
#[command(about = "Tracked-changes comparison for documents, spreadsheets and presentations")]
#[command(
    long_about = "Redline aligns two versions of a compound document level by level and\nwrites the modified version with every difference marked as a revision."
)]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  redline docs alice old.json new.json merged.json
  redline sheets bob q1.json q2.json merged.json --no-formulas
  redline slides carol v1.json v2.json merged.json --no-summary
  redline docs alice a.json b.json out.json --format json")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Abort a comparison after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Minified JSON and borderless tables
    #[arg(long, global = true)]
    compact: bool,

    /// Fit tables to this many columns, also when piped
    #[arg(long, global = true)]
    width: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two word-processing documents
    #[command(visible_alias = "documents")]
    Docs {
        #[command(flatten)]
        args: CompareArgs,
    },

    /// Compare two spreadsheets
    #[command(visible_alias = "spreadsheets")]
    Sheets {
        #[command(flatten)]
        args: CompareArgs,

        /// Ignore displayed cell values
        #[arg(long)]
        no_values: bool,

        /// Ignore cell formulas
        #[arg(long)]
        no_formulas: bool,
    },

    /// Compare two presentations
    #[command(visible_alias = "presentations")]
    Slides {
        #[command(flatten)]
        args: CompareArgs,

        /// Compare image names only, not their content
        #[arg(long)]
        no_images: bool,

        /// Leave speaker notes and comments out of the comparison
        #[arg(long)]
        no_notes: bool,

        /// Do not append a summary slide
        #[arg(long)]
        no_summary: bool,

        /// Do not write revision descriptions into slide notes
        #[arg(long)]
        no_annotations: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,

        /// Show installation instructions instead of generating completions
        #[arg(long)]
        instructions: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .redlinerc.toml
    let config = RedlineConfig::load(std::path::Path::new("."));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let timeout = cli.timeout.or(config.timeout_secs());

    let mut output = OutputConfig::auto_detect(format);
    if let Some(width) = cli.width {
        output = output.with_width(width);
    }
    if cli.compact || config.compact() {
        output = output.compact();
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Docs { args } => {
            compare::run(
                DocumentKind::Wordprocessing,
                args,
                ScopeSwitches::default(),
                &config,
                timeout,
                output,
            )
            .await
        }
        Commands::Sheets {
            args,
            no_values,
            no_formulas,
        } => {
            let switches = ScopeSwitches {
                no_values,
                no_formulas,
                ..ScopeSwitches::default()
            };
            compare::run(DocumentKind::Spreadsheet, args, switches, &config, timeout, output).await
        }
        Commands::Slides {
            args,
            no_images,
            no_notes,
            no_summary,
            no_annotations,
        } => {
            let switches = ScopeSwitches {
                no_images,
                no_notes,
                no_summary,
                no_annotations,
                ..ScopeSwitches::default()
            };
            compare::run(DocumentKind::Presentation, args, switches, &config, timeout, output).await
        }
        Commands::Completions {
            shell,
            instructions,
        } => {
            let mut cmd = Cli::command();
            completions::run(shell, &mut cmd, instructions, output)
        }
    }
}
