//! Integration tests for the Redline CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated test directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use redline_core::{ContainerRole, Document, DocumentKind, DocumentSerializer, JsonCodec, Node};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the redline binary (built by cargo)
fn redline_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_redline"))
}

/// Run redline with the given args in the specified directory
fn run_redline(dir: &Path, args: &[&str]) -> Output {
    redline_binary()
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute redline command")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Write `doc` as JSON into `dir/name`
fn write_document(dir: &Path, name: &str, doc: &Document) -> PathBuf {
    let path = dir.join(name);
    let bytes = JsonCodec::new()
        .serialize_document(doc, &[], doc.kind)
        .expect("Failed to serialize document");
    fs::write(&path, bytes).expect("Failed to write document");
    path
}

/// Read a merged output file as raw JSON
fn read_output(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path).expect("Failed to read output file");
    serde_json::from_str(&content).expect("Output file should be valid JSON")
}

fn make_story(last: &str) -> Document {
    Document::from_paragraphs(&["The cat sat.", last])
}

fn make_sheet(formula: &str) -> Document {
    Document::new(
        DocumentKind::Spreadsheet,
        Node::container(
            ContainerRole::Document,
            vec![Node::named(
                ContainerRole::Sheet,
                "Data",
                vec![Node::container(
                    ContainerRole::Row,
                    vec![
                        Node::cell("A1", "1", None),
                        Node::cell("B1", "2", None),
                        Node::cell("C1", "3", Some(formula)),
                    ],
                )],
            )],
        ),
    )
}

fn make_deck(extra_body: bool) -> Document {
    let mut second = vec![Node::shape("Title 1", "title", "Results")];
    if extra_body {
        second.push(Node::shape("Body 2", "body", "Revenue grew"));
    }
    Document::new(
        DocumentKind::Presentation,
        Node::container(
            ContainerRole::Document,
            vec![
                Node::container(
                    ContainerRole::Slide,
                    vec![Node::shape("Title 1", "title", "Agenda")],
                ),
                Node::container(ContainerRole::Slide, second),
            ],
        ),
    )
}

/// Write an original/modified pair and return the temp dir holding them
fn setup_pair(original: &Document, modified: &Document) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_document(temp_dir.path(), "original.json", original);
    write_document(temp_dir.path(), "modified.json", modified);
    temp_dir
}

// ============================================================================
// Docs Command Tests
// ============================================================================

#[test]
fn test_docs_self_comparison_finds_nothing() {
    let doc = make_story("The dog ran.");
    let temp_dir = setup_pair(&doc, &doc);
    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Revisions found: 0"));

    let merged = read_output(&temp_dir.path().join("merged.json"));
    assert_eq!(merged["revisions"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_docs_word_edit_reports_two_revisions() {
    let temp_dir = setup_pair(&make_story("The dog ran."), &make_story("The dog sprinted fast."));
    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("Revisions found: 2"), "got: {}", stdout_str);

    let merged = read_output(&temp_dir.path().join("merged.json"));
    let revisions = merged["revisions"].as_array().expect("revisions array");
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0]["kind"], "delete");
    assert_eq!(revisions[0]["before"], "ran.");
    assert_eq!(revisions[1]["kind"], "insert");
    assert_eq!(revisions[1]["author"], "alice");
}

#[test]
fn test_docs_high_threshold_replaces_block() {
    let temp_dir = setup_pair(&make_story("The dog ran."), &make_story("The dog sprinted fast."));
    let output = run_redline(
        temp_dir.path(),
        &[
            "docs",
            "alice",
            "original.json",
            "modified.json",
            "merged.json",
            "--threshold",
            "0.9",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(report["revision_count"], 1);
    assert_eq!(report["revisions"][0]["kind"], "content_change");
}

#[test]
fn test_documents_alias() {
    let doc = make_story("The dog ran.");
    let temp_dir = setup_pair(&doc, &doc);
    let output = run_redline(
        temp_dir.path(),
        &["documents", "alice", "original.json", "modified.json", "merged.json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

// ============================================================================
// Output Format Tests
// ============================================================================

#[test]
fn test_json_format_is_pure_json() {
    let temp_dir = setup_pair(&make_story("The dog ran."), &make_story("The dog sprinted fast."));
    let output = run_redline(
        temp_dir.path(),
        &[
            "docs",
            "alice",
            "original.json",
            "modified.json",
            "merged.json",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout_str = stdout(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout_str)
        .unwrap_or_else(|e| panic!("Output should be valid JSON ({}): {}", e, stdout_str));

    assert_eq!(report["kind"], "wordprocessing");
    assert_eq!(report["author"], "alice");
    assert_eq!(report["revision_count"], 2);
    assert_eq!(report["summary"]["inserts"], 1);
    assert_eq!(report["summary"]["deletes"], 1);
    assert!(!stdout_str.contains("Revisions found"));
}

#[test]
fn test_compact_json_is_one_line() {
    let temp_dir = setup_pair(&make_story("The dog ran."), &make_story("The dog sprinted fast."));
    let output = run_redline(
        temp_dir.path(),
        &[
            "docs",
            "alice",
            "original.json",
            "modified.json",
            "merged.json",
            "--format",
            "json",
            "--compact",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout_str = stdout(&output);
    assert_eq!(stdout_str.trim_end().lines().count(), 1);
    let report: serde_json::Value = serde_json::from_str(&stdout_str).expect("stdout should be JSON");
    assert_eq!(report["revision_count"], 2);
}

#[test]
fn test_width_truncates_piped_table() {
    let long = "The dog sprinted across the whole meadow today.";
    let temp_dir = setup_pair(&make_story("The dog ran."), &make_story(long));
    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json", "--width", "60"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("Revisions found: 2"));
    assert!(stdout_str.contains("..."));
    assert!(!stdout_str.contains("meadow today"));

    let unbounded = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );
    assert!(stdout(&unbounded).contains("meadow today"));
}

#[test]
fn test_config_sets_default_format() {
    let doc = make_story("The dog ran.");
    let temp_dir = setup_pair(&doc, &doc);
    fs::write(
        temp_dir.path().join(".redlinerc.toml"),
        "[output]\nformat = \"json\"\n",
    )
    .unwrap();

    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("config should switch output to JSON");
    assert_eq!(report["revision_count"], 0);
}

#[test]
fn test_broken_config_warns_and_uses_defaults() {
    let doc = make_story("The dog ran.");
    let temp_dir = setup_pair(&doc, &doc);
    fs::write(temp_dir.path().join(".redlinerc.toml"), "[output\nformat = ").unwrap();

    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Failed to parse .redlinerc.toml"));
    assert!(stdout(&output).contains("Revisions found: 0"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_invalid_threshold_rejected() {
    let doc = make_story("The dog ran.");
    let temp_dir = setup_pair(&doc, &doc);
    let output = run_redline(
        temp_dir.path(),
        &[
            "docs",
            "alice",
            "original.json",
            "modified.json",
            "merged.json",
            "--threshold",
            "1.5",
        ],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("threshold must be between 0.0 and 1.0"));
    assert!(!temp_dir.path().join("merged.json").exists());
}

#[test]
fn test_kind_mismatch_writes_no_output() {
    let temp_dir = setup_pair(&make_sheet("=A1+B1"), &make_sheet("=A1+B2"));
    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(!output.status.success());
    let stderr_str = stderr(&output);
    assert!(
        stderr_str.contains("kind mismatch"),
        "Should explain the mismatch, got: {}",
        stderr_str
    );
    assert!(!temp_dir.path().join("merged.json").exists());
}

#[test]
fn test_missing_input_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "nope.json", "also-nope.json", "merged.json"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read original document"));
    assert!(!temp_dir.path().join("merged.json").exists());
}

#[test]
fn test_malformed_input_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("original.json"), "{ not json").unwrap();
    write_document(temp_dir.path(), "modified.json", &make_story("x"));

    let output = run_redline(
        temp_dir.path(),
        &["docs", "alice", "original.json", "modified.json", "merged.json"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Parse error"));
}

// ============================================================================
// Sheets Command Tests
// ============================================================================

#[test]
fn test_sheets_formula_change() {
    let temp_dir = setup_pair(&make_sheet("=A1+B1"), &make_sheet("=A1+B2"));
    let output = run_redline(
        temp_dir.path(),
        &["sheets", "bob", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("Spreadsheet comparison complete"));
    assert!(stdout_str.contains("Revisions found: 1"));

    let merged = read_output(&temp_dir.path().join("merged.json"));
    assert_eq!(merged["revisions"][0]["kind"], "content_change");
}

#[test]
fn test_sheets_no_formulas_ignores_formula_change() {
    let temp_dir = setup_pair(&make_sheet("=A1+B1"), &make_sheet("=A1+B2"));
    let output = run_redline(
        temp_dir.path(),
        &[
            "sheets",
            "bob",
            "original.json",
            "modified.json",
            "merged.json",
            "--no-formulas",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Revisions found: 0"));
}

// ============================================================================
// Slides Command Tests
// ============================================================================

#[test]
fn test_slides_appends_summary_slide() {
    let temp_dir = setup_pair(&make_deck(false), &make_deck(true));
    let output = run_redline(
        temp_dir.path(),
        &["slides", "carol", "original.json", "modified.json", "merged.json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Presentation comparison complete"));

    let merged = read_output(&temp_dir.path().join("merged.json"));
    let slides = merged["root"]["children"].as_array().expect("root children");
    assert_eq!(slides.len(), 3);
    assert_eq!(slides[2]["role"], "summary");
}

#[test]
fn test_slides_no_summary() {
    let temp_dir = setup_pair(&make_deck(false), &make_deck(true));
    let output = run_redline(
        temp_dir.path(),
        &[
            "slides",
            "carol",
            "original.json",
            "modified.json",
            "merged.json",
            "--no-summary",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let merged = read_output(&temp_dir.path().join("merged.json"));
    assert_eq!(merged["root"]["children"].as_array().map(Vec::len), Some(2));
}

// ============================================================================
// Completions Command Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_redline(temp_dir.path(), &["completions", "bash"]);

    assert!(output.status.success(), "completions bash should succeed");
    let stdout_str = stdout(&output);
    assert!(stdout_str.contains("redline"), "Should contain command name");
    assert!(stdout_str.contains("sheets"), "Should list subcommands");
}

#[test]
fn test_completions_instructions() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_redline(temp_dir.path(), &["completions", "zsh", "--instructions"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("~/.zfunc/_redline"));
}

// ============================================================================
// Help Tests
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_redline(temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout_str = stdout(&output);
    for command in ["docs", "sheets", "slides", "completions"] {
        assert!(stdout_str.contains(command), "help should list {}", command);
    }
}
