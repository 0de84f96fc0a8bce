//! End-to-end comparison tests.
//!
//! Covers the properties every comparison must hold (self-comparison,
//! conservation, determinism, monotonic refinement) and the behavior for
//! each document kind: word edits, moves, formatting, formulas, scope
//! flags and presentation extras.

use chrono::{TimeZone, Utc};
use redline_core::reconstruct::visible_text;
use redline_core::{
    compare, ComparisonSettings, ContainerRole, Document, DocumentKind, DocumentParser,
    DocumentSerializer, JsonCodec, LeafContent, MarkKind, Node, RedlineError, RevisionKind,
};

// ============================================================================
// Helpers
// ============================================================================

fn make_settings(threshold: f64) -> ComparisonSettings {
    ComparisonSettings::builder("reviewer")
        .with_detail_threshold(threshold)
        .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .build()
        .unwrap()
}

fn make_doc(sections: Vec<Vec<String>>) -> Document {
    let root = Node::container(
        ContainerRole::Document,
        sections
            .into_iter()
            .map(|paragraphs| {
                Node::container(
                    ContainerRole::Section,
                    paragraphs.iter().map(|p| Node::paragraph(p)).collect(),
                )
            })
            .collect(),
    );
    Document::new(DocumentKind::Wordprocessing, root)
}

fn make_row(number: usize, values: &[&str]) -> Node {
    let columns = ["A", "B", "C", "D"];
    Node::container(
        ContainerRole::Row,
        values
            .iter()
            .zip(columns)
            .map(|(value, column)| Node::cell(&format!("{}{}", column, number), value, None))
            .collect(),
    )
}

fn make_sheet(rows: Vec<Node>) -> Document {
    Document::new(
        DocumentKind::Spreadsheet,
        Node::container(
            ContainerRole::Document,
            vec![Node::named(ContainerRole::Sheet, "Data", rows)],
        ),
    )
}

fn make_slides(slides: Vec<Vec<Node>>) -> Document {
    Document::new(
        DocumentKind::Presentation,
        Node::container(
            ContainerRole::Document,
            slides
                .into_iter()
                .map(|shapes| Node::container(ContainerRole::Slide, shapes))
                .collect(),
        ),
    )
}

fn kinds(doc_a: &Document, doc_b: &Document, settings: &ComparisonSettings) -> Vec<RevisionKind> {
    compare(doc_a, doc_b, settings)
        .unwrap()
        .revisions
        .iter()
        .map(|r| r.kind)
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Five disjoint words per paragraph so sections pair on their own content.
fn fillers(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "{p}a{i} {p}b{i} {p}c{i} {p}d{i} {p}e{i}",
                p = prefix,
                i = i
            )
        })
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_self_comparison_has_no_revisions() {
    let settings = make_settings(0.15);
    let doc = Document::from_paragraphs(&["The cat sat.", "The dog ran."]);
    let sheet = make_sheet(vec![make_row(1, &["1", "2"]), make_row(2, &["3", "4"])]);
    let slides = make_slides(vec![
        vec![Node::shape("Title 1", "title", "Quarterly results")],
        vec![Node::shape("Body 2", "body", "Revenue grew")],
    ]);

    for doc in [doc, sheet, slides] {
        let result = compare(&doc, &doc, &settings).unwrap();
        assert!(result.revisions.is_empty());
        assert_eq!(result.merged.root, doc.root);
    }
}

#[test]
fn test_conservation_across_settings() {
    let original = make_doc(vec![
        strings(&["alpha beta gamma", "one two three four", "kept paragraph"]),
        strings(&["second section text"]),
    ]);
    let modified = make_doc(vec![
        strings(&["alpha beta delta", "kept paragraph", "one two five six"]),
        strings(&["second section text", "appended"]),
        strings(&["brand new section"]),
    ]);

    for threshold in [0.0, 0.15, 0.5, 1.0] {
        for formatting in [true, false] {
            for structure in [true, false] {
                let settings = ComparisonSettings::builder("reviewer")
                    .with_detail_threshold(threshold)
                    .with_formatting(formatting)
                    .with_structure(structure)
                    .build()
                    .unwrap();
                let result = compare(&original, &modified, &settings).unwrap();
                assert_eq!(visible_text(&result.merged.root), visible_text(&modified.root));
            }
        }
    }
}

#[test]
fn test_json_codec_is_idempotent() {
    let codec = JsonCodec::new();
    let sheet = make_sheet(vec![make_row(1, &["north", "10"]), make_row(2, &["south", "20"])])
        .with_part("styles", "<styleSheet/>");

    let bytes = codec
        .serialize_document(&sheet, &[], DocumentKind::Spreadsheet)
        .unwrap();
    let first = codec.parse_document(&bytes, DocumentKind::Spreadsheet).unwrap();
    let again = codec
        .serialize_document(&first, &[], DocumentKind::Spreadsheet)
        .unwrap();
    let second = codec.parse_document(&again, DocumentKind::Spreadsheet).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, sheet);
    assert_eq!(bytes, again);
}

#[test]
fn test_comparison_is_deterministic() {
    let original = make_doc(vec![strings(&["The cat sat.", "The dog ran."])]);
    let modified = make_doc(vec![strings(&["The dog sprinted fast.", "The cat sat."])]);
    let settings = make_settings(0.0);

    let first = compare(&original, &modified, &settings).unwrap();
    let second = compare(&original, &modified, &settings).unwrap();
    assert_eq!(first.merged, second.merged);
    assert_eq!(first.revisions, second.revisions);
}

#[test]
fn test_refinement_is_monotonic_in_threshold() {
    let original = make_doc(vec![strings(&[
        "alpha beta gamma",
        "one two three four",
        "kept paragraph",
    ])]);
    let modified = make_doc(vec![strings(&[
        "alpha beta delta",
        "one two five six",
        "kept paragraph",
        "new one",
    ])]);

    let mut previous = usize::MAX;
    for step in 0..=10 {
        let count = compare(&original, &modified, &make_settings(step as f64 / 10.0))
            .unwrap()
            .revisions
            .len();
        assert!(count >= 1);
        assert!(count <= previous, "threshold {}: {} > {}", step, count, previous);
        previous = count;
    }
}

#[test]
fn test_cross_unit_move_survives_high_threshold() {
    let original = make_doc(vec![
        strings(&["north alpha one", "north beta two", "moving paragraph text here"]),
        strings(&["south gamma three"]),
    ]);
    let modified = make_doc(vec![
        strings(&["north alpha one", "north beta two"]),
        strings(&["south gamma three", "moving paragraph text here"]),
    ]);

    let mut previous = usize::MAX;
    for step in 0..=10 {
        let threshold = step as f64 / 10.0;
        let kinds = kinds(&original, &modified, &make_settings(threshold));
        assert_eq!(kinds, vec![RevisionKind::Move], "threshold {}", threshold);
        assert!(kinds.len() <= previous);
        previous = kinds.len();
    }
}

#[test]
fn test_high_threshold_replaces_pairs_without_moves() {
    let original = make_doc(vec![
        strings(&["north alpha one", "north beta two"]),
        strings(&["south gamma three", "south delta four"]),
    ]);
    let modified = make_doc(vec![
        strings(&["north alpha one", "north beta changed"]),
        strings(&["south gamma three", "south delta four"]),
    ]);

    let result = compare(&original, &modified, &make_settings(1.0)).unwrap();
    assert_eq!(result.revisions.len(), 1);
    assert_eq!(result.revisions[0].kind, RevisionKind::ContentChange);
    assert_eq!(result.revisions[0].modified_paths, vec![vec![0]]);
    assert_eq!(visible_text(&result.merged.root), visible_text(&modified.root));
}

#[test]
fn test_revision_ids_match_marks() {
    let original = Document::from_paragraphs(&["The cat sat.", "The dog ran."]);
    let modified = Document::from_paragraphs(&["The cat sat.", "The dog sprinted fast."]);
    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();

    let mut ids = Vec::new();
    let mut stack = vec![&result.merged.root];
    while let Some(node) = stack.pop() {
        if let Some(mark) = node.mark() {
            ids.push(mark.revision);
        }
        stack.extend(node.children());
    }
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

// ============================================================================
// Word-processing documents
// ============================================================================

#[test]
fn test_word_edit_at_zero_threshold() {
    let original = Document::from_paragraphs(&["The cat sat.", "The dog ran."]);
    let modified = Document::from_paragraphs(&["The cat sat.", "The dog sprinted fast."]);
    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();

    assert_eq!(result.revisions.len(), 2);
    assert_eq!(result.revisions[0].kind, RevisionKind::Delete);
    assert_eq!(result.revisions[0].before.as_deref(), Some("ran."));
    assert_eq!(result.revisions[1].kind, RevisionKind::Insert);
    assert_eq!(result.revisions[1].after.as_deref(), Some("sprinted fast."));
    assert_eq!(result.summary.text(), "1 inserted, 1 deleted");

    let paragraph = result.merged.root.node_at(&[0, 1]).unwrap();
    let runs: Vec<(String, Option<MarkKind>)> = paragraph
        .children()
        .iter()
        .map(|run| (run.text(), run.mark().map(|m| m.kind.clone())))
        .collect();
    assert_eq!(
        runs,
        vec![
            ("The dog ".to_string(), None),
            ("ran.".to_string(), Some(MarkKind::Deleted)),
            ("sprinted fast.".to_string(), Some(MarkKind::Inserted)),
        ]
    );
}

#[test]
fn test_word_edit_above_ratio_is_one_replace() {
    let original = Document::from_paragraphs(&["The cat sat.", "The dog ran."]);
    let modified = Document::from_paragraphs(&["The cat sat.", "The dog sprinted fast."]);
    let kinds = kinds(&original, &modified, &make_settings(0.6));
    assert_eq!(kinds, vec![RevisionKind::ContentChange]);
}

#[test]
fn test_paragraph_move_is_one_move() {
    let original = make_doc(vec![strings(&["A a a", "B b b", "C c c", "D d d"])]);
    let modified = make_doc(vec![strings(&["B b b", "C c c", "D d d", "A a a"])]);
    let result = compare(&original, &modified, &make_settings(0.15)).unwrap();

    assert_eq!(result.revisions.len(), 1);
    let revision = &result.revisions[0];
    assert_eq!(revision.kind, RevisionKind::Move);
    assert_eq!(revision.original_paths, vec![vec![0, 0]]);
    assert_eq!(revision.modified_paths, vec![vec![0, 3]]);

    let moved = result.merged.root.node_at(&[0, 3]).unwrap();
    assert_eq!(
        moved.mark().map(|m| &m.kind),
        Some(&MarkKind::Moved { from: vec![0, 0] })
    );
    assert_eq!(result.merged.root.node_at(&[0]).unwrap().children().len(), 4);
}

#[test]
fn test_formatting_only_change() {
    let original = Document::from_paragraphs(&["one two three"]);
    let modified = Document::new(
        DocumentKind::Wordprocessing,
        Node::container(
            ContainerRole::Document,
            vec![Node::container(
                ContainerRole::Section,
                vec![Node::container(
                    ContainerRole::Paragraph,
                    vec![
                        Node::run("one "),
                        Node::run("two ").with_format("bold", "true"),
                        Node::run("three"),
                    ],
                )],
            )],
        ),
    );

    let kinds = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(kinds, vec![RevisionKind::FormatChange]);

    let ignoring = ComparisonSettings::builder("reviewer")
        .with_formatting(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &ignoring).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);
}

#[test]
fn test_cross_unit_move_exact_and_fuzzy() {
    let moving = "the quick brown fox jumps over the lazy dog";
    let edited = "the quick brown fox jumps over the lazy cat";

    let mut first = fillers("n", 4);
    first.insert(0, moving.to_string());
    let original = make_doc(vec![first, fillers("s", 4)]);

    let mut second = fillers("s", 4);
    second.push(edited.to_string());
    let modified = make_doc(vec![fillers("n", 4), second]);

    let exact = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(exact, vec![RevisionKind::Delete, RevisionKind::Insert]);

    let fuzzy = ComparisonSettings::builder("reviewer")
        .with_move_similarity(Some(0.5))
        .build()
        .unwrap();
    let result = compare(&original, &modified, &fuzzy).unwrap();
    assert_eq!(result.revisions.len(), 1);
    assert_eq!(result.revisions[0].kind, RevisionKind::Move);
    assert_eq!(result.revisions[0].before.as_deref(), Some(moving));
    assert_eq!(result.revisions[0].after.as_deref(), Some(edited));
}

#[test]
fn test_structure_off_passes_new_sections() {
    let original = make_doc(vec![strings(&["kept"])]);
    let modified = make_doc(vec![strings(&["kept"]), strings(&["added section"])]);
    let settings = ComparisonSettings::builder("reviewer")
        .with_structure(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &settings).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);

    let kinds = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(kinds, vec![RevisionKind::Insert]);
}

#[test]
fn test_threshold_out_of_range_is_config_error() {
    let err = ComparisonSettings::builder("reviewer")
        .with_detail_threshold(1.5)
        .build()
        .unwrap_err();
    assert!(matches!(err, RedlineError::ThresholdConfig { value } if value == 1.5));
}

// ============================================================================
// Spreadsheets
// ============================================================================

#[test]
fn test_formula_change_scoped_by_flag() {
    let sheet = |formula: &str| {
        make_sheet(vec![Node::container(
            ContainerRole::Row,
            vec![
                Node::cell("A1", "1", None),
                Node::cell("B1", "2", None),
                Node::cell("C1", "3", Some(formula)),
            ],
        )])
    };
    let original = sheet("=A1+B1");
    let modified = sheet("=A1+B2");

    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();
    assert_eq!(result.revisions.len(), 1);
    assert_eq!(result.revisions[0].kind, RevisionKind::ContentChange);
    assert_eq!(result.revisions[0].before.as_deref(), Some("C1: 3 (=A1+B1)"));
    assert_eq!(result.revisions[0].after.as_deref(), Some("C1: 3 (=A1+B2)"));

    let default_kinds = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(default_kinds, vec![RevisionKind::ContentChange]);

    let no_formulas = ComparisonSettings::builder("reviewer")
        .with_formulas(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &no_formulas).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);
}

#[test]
fn test_row_move_is_one_move() {
    let original = make_sheet(vec![
        make_row(1, &["north", "10"]),
        make_row(2, &["south", "20"]),
        make_row(3, &["east", "30"]),
    ]);
    let modified = make_sheet(vec![
        make_row(1, &["south", "20"]),
        make_row(2, &["east", "30"]),
        make_row(3, &["north", "10"]),
    ]);
    let kinds = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(kinds, vec![RevisionKind::Move]);
}

#[test]
fn test_value_edit_in_keyed_cell() {
    let original = make_sheet(vec![make_row(1, &["name", "10", "x"])]);
    let modified = make_sheet(vec![make_row(1, &["name", "11", "x"])]);
    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();
    assert_eq!(result.revisions.len(), 1);
    assert_eq!(result.revisions[0].kind, RevisionKind::ContentChange);
    assert_eq!(result.revisions[0].modified_paths, vec![vec![0, 0, 1]]);
}

#[test]
fn test_value_edit_ignored_when_values_off() {
    let sheet = |value: &str| {
        make_sheet(vec![Node::container(
            ContainerRole::Row,
            vec![
                Node::cell("A1", "total", None),
                Node::cell("B1", value, Some("=SUM(C1:C9)")),
            ],
        )])
    };
    let original = sheet("40");
    let modified = sheet("42");

    let no_values = ComparisonSettings::builder("reviewer")
        .with_values(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &no_values).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);

    let kinds = kinds(&original, &modified, &make_settings(0.0));
    assert_eq!(kinds, vec![RevisionKind::ContentChange]);
}

// ============================================================================
// Presentations
// ============================================================================

#[test]
fn test_image_content_scoped_by_flag() {
    let deck = |digest: &str| {
        make_slides(vec![vec![
            Node::shape("Title 1", "title", "Architecture"),
            Node::leaf(LeafContent::Image {
                name: "diagram.png".to_string(),
                digest: digest.to_string(),
            }),
        ]])
    };
    let original = deck("9f2c41");
    let modified = deck("07be13");

    let no_images = ComparisonSettings::builder("reviewer")
        .with_images(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &no_images).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);

    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();
    assert_eq!(result.revisions.len(), 1);
    assert_eq!(result.revisions[0].kind, RevisionKind::ContentChange);
    assert_eq!(result.revisions[0].modified_paths, vec![vec![0, 1]]);
}

#[test]
fn test_keyed_shape_moved_and_edited_is_one_move() {
    let original = make_slides(vec![vec![
        Node::shape("Title 1", "title", "Agenda"),
        Node::shape("Body 2", "body", "alpha text"),
        Node::shape("Body 3", "body", "beta text"),
    ]]);
    let modified = make_slides(vec![vec![
        Node::shape("Title 1", "title", "Agenda"),
        Node::shape("Body 3", "body", "beta text"),
        Node::shape("Body 2", "body", "alpha text edited"),
    ]]);
    let result = compare(&original, &modified, &make_settings(0.15)).unwrap();

    assert_eq!(result.revisions.len(), 1);
    let revision = &result.revisions[0];
    assert_eq!(revision.kind, RevisionKind::Move);
    assert_eq!(revision.original_paths, vec![vec![0, 1]]);
    assert_eq!(revision.modified_paths, vec![vec![0, 2]]);
    assert_eq!(
        revision.describe(),
        "Moved \"Body 2: alpha text\" -> \"Body 2: alpha text edited\""
    );

    let slide = result.merged.root.node_at(&[0]).unwrap();
    assert_eq!(slide.children().len(), 3);
    assert_eq!(
        slide.children()[2].mark().map(|m| &m.kind),
        Some(&MarkKind::Moved { from: vec![0, 1] })
    );
    assert_eq!(visible_text(&result.merged.root), visible_text(&modified.root));
}

#[test]
fn test_shape_move_across_slides_is_one_move() {
    let original = make_slides(vec![
        vec![
            Node::shape("Title 1", "title", "Agenda"),
            Node::shape("Body 2", "body", "moving text"),
        ],
        vec![Node::shape("Title 1", "title", "Results")],
    ]);
    let modified = make_slides(vec![
        vec![Node::shape("Title 1", "title", "Agenda")],
        vec![
            Node::shape("Title 1", "title", "Results"),
            Node::shape("Body 2", "body", "moving text"),
        ],
    ]);
    let kinds = kinds(&original, &modified, &make_settings(0.15));
    assert_eq!(kinds, vec![RevisionKind::Move]);
}

#[test]
fn test_summary_slide_and_notes_annotations() {
    let original = make_slides(vec![
        vec![Node::shape("Title 1", "title", "Agenda")],
        vec![Node::shape("Title 1", "title", "Results")],
    ]);
    let modified = make_slides(vec![
        vec![Node::shape("Title 1", "title", "Agenda")],
        vec![
            Node::shape("Title 1", "title", "Results"),
            Node::shape("Body 2", "body", "Revenue grew"),
        ],
    ]);
    let settings = ComparisonSettings::builder("reviewer")
        .with_summary_slide(true)
        .with_notes_annotations(true)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &settings).unwrap();
    assert_eq!(result.revisions.len(), 1);

    let root = &result.merged.root;
    assert_eq!(root.children().len(), 3);
    let summary = &root.children()[2];
    assert_eq!(summary.role(), Some(ContainerRole::Summary));
    assert_eq!(summary.children().len(), 1);
    assert!(summary.children()[0].text().is_empty());

    let annotated = &root.children()[1];
    let last = annotated.children().last().unwrap();
    assert!(matches!(
        last,
        Node::Leaf(leaf) if matches!(&leaf.content, LeafContent::Annotation { text } if text.starts_with("Revision 1: Inserted"))
    ));
    assert_eq!(root.children()[0].children().len(), 1);
}

#[test]
fn test_no_summary_without_revisions() {
    let slides = make_slides(vec![vec![Node::shape("Title 1", "title", "Agenda")]]);
    let settings = ComparisonSettings::builder("reviewer")
        .with_summary_slide(true)
        .build()
        .unwrap();
    let result = compare(&slides, &slides, &settings).unwrap();
    assert_eq!(result.merged.root.children().len(), 1);
}

#[test]
fn test_notes_out_of_scope_pass_through() {
    let original = make_slides(vec![vec![
        Node::shape("Title 1", "title", "Agenda"),
        Node::leaf(LeafContent::Note {
            text: "old speaker notes".to_string(),
        }),
    ]]);
    let modified = make_slides(vec![vec![
        Node::shape("Title 1", "title", "Agenda"),
        Node::leaf(LeafContent::Note {
            text: "new speaker notes".to_string(),
        }),
    ]]);
    let settings = ComparisonSettings::builder("reviewer")
        .with_notes(false)
        .build()
        .unwrap();
    let result = compare(&original, &modified, &settings).unwrap();
    assert!(result.revisions.is_empty());
    assert_eq!(result.merged.root, modified.root);

    assert!(!kinds(&original, &modified, &make_settings(0.0)).is_empty());
}

#[test]
fn test_unknown_shape_type_still_compared() {
    let original = make_slides(vec![vec![Node::shape("Blob", "hologram", "before")]]);
    let modified = make_slides(vec![vec![Node::shape("Blob", "hologram", "after")]]);
    let result = compare(&original, &modified, &make_settings(0.0)).unwrap();
    assert!(!result.revisions.is_empty());
    assert_eq!(visible_text(&result.merged.root), visible_text(&modified.root));
}
