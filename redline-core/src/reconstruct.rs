//! Merged tree reconstruction.
//!
//! Walks the level plans in merged order and rebuilds one tree holding both
//! sides of every change: kept content comes from the modified document,
//! removed content from the original marked `Deleted`, and every change
//! becomes a [`Revision`] whose id is its first appearance in the tree.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::atomizer::Atom;
use crate::differ::changes::{Change, ChangeRef, Revision, RevisionKind};
use crate::differ::correlate::MoveTable;
use crate::differ::refine::{PlanRef, Step, UnitOutcome};
use crate::error::{RedlineError, Result};
use crate::settings::ComparisonSettings;
use crate::types::{
    Container, ContainerRole, Document, DocumentKind, Formatting, Leaf, LeafContent, MarkKind,
    Node, NodePath, RevisionMark,
};

/// Name of the synthesized presentation summary container.
pub const SUMMARY_NAME: &str = "Summary of changes";

/// Rebuild the merged document and its revision list.
pub fn reconstruct(
    original: &Document,
    modified: &Document,
    units: &[UnitOutcome],
    moves: &MoveTable,
    settings: &ComparisonSettings,
    timestamp: DateTime<Utc>,
) -> Result<(Document, Vec<Revision>)> {
    let mut builder = TreeBuilder {
        original: &original.root,
        modified: &modified.root,
        units,
        moves,
        ids: HashMap::new(),
        order: Vec::new(),
    };
    let children = builder.level(PlanRef { unit: 0, plan: 0 })?;
    let mut root = container_like(&modified.root, children)?;

    let revisions = builder.revisions(settings.author(), timestamp)?;
    if modified.kind == DocumentKind::Presentation {
        if settings.annotate_notes() {
            annotate_slides(&mut root, &revisions);
        }
        if settings.add_summary_slide() && !revisions.is_empty() {
            append_summary(&mut root, &revisions);
        }
    }

    let merged = Document {
        kind: modified.kind,
        root,
        parts: modified.parts.clone(),
    };
    Ok((merged, revisions))
}

/// Container with the role and name of `template` and the given children.
fn container_like(template: &Node, children: Vec<Node>) -> Result<Node> {
    match template {
        Node::Container(container) => Ok(Node::Container(Container {
            role: container.role,
            name: container.name.clone(),
            children,
            mark: None,
        })),
        Node::Leaf(_) => Err(RedlineError::invariant("refined node is not a container")),
    }
}

struct TreeBuilder<'a> {
    original: &'a Node,
    modified: &'a Node,
    units: &'a [UnitOutcome],
    moves: &'a MoveTable,
    ids: HashMap<ChangeRef, u32>,
    order: Vec<ChangeRef>,
}

impl<'a> TreeBuilder<'a> {
    fn id_for(&mut self, change: ChangeRef) -> u32 {
        if let Some(&id) = self.ids.get(&change) {
            return id;
        }
        self.order.push(change);
        let id = self.order.len() as u32;
        self.ids.insert(change, id);
        id
    }

    fn level(&mut self, plan_ref: PlanRef) -> Result<Vec<Node>> {
        let units = self.units;
        let plan = units
            .get(plan_ref.unit)
            .and_then(|unit| unit.plans.get(plan_ref.plan))
            .ok_or_else(|| RedlineError::invariant(format!("missing plan {:?}", plan_ref)))?;
        let container = self.modified_at(&plan.b_path)?;
        let depth = plan.b_path.len();
        let referenced: HashSet<usize> = plan.atoms_b.iter().map(|atom| atom.path[depth]).collect();
        let mut out = Children {
            source: container.children(),
            referenced,
            next: 0,
            nodes: Vec::new(),
            pending: None,
        };

        for step in &plan.steps {
            match *step {
                Step::Match { a, b, format } => {
                    let y = &plan.atoms_b[b];
                    let mark = format.map(|change| {
                        let id = self.id_for(ChangeRef::new(plan_ref.unit, change));
                        RevisionMark::new(
                            id,
                            MarkKind::FormatChanged {
                                previous: plan.atoms_a[a].formatting.clone(),
                            },
                        )
                    });
                    self.emit_modified(&mut out, y, mark)?;
                }
                Step::Delete { a, change } => {
                    let Some(change) = change else { continue };
                    let change = ChangeRef::new(plan_ref.unit, change);
                    if self.moves.is_source(change) {
                        continue;
                    }
                    let id = self.id_for(change);
                    self.emit_original(&mut out, &plan.atoms_a[a], RevisionMark::new(id, MarkKind::Deleted))?;
                }
                Step::Insert { b, change } => {
                    let y = &plan.atoms_b[b];
                    let mark = match change {
                        None => None,
                        Some(change) => Some(self.insert_mark(ChangeRef::new(plan_ref.unit, change))?),
                    };
                    self.emit_modified(&mut out, y, mark)?;
                }
                Step::Replace { a, b, change } => {
                    let id = self.id_for(ChangeRef::new(plan_ref.unit, change));
                    self.emit_original(&mut out, &plan.atoms_a[a], RevisionMark::new(id, MarkKind::Deleted))?;
                    self.emit_modified(&mut out, &plan.atoms_b[b], Some(RevisionMark::new(id, MarkKind::Inserted)))?;
                }
                Step::Relocate { a, b, change } => {
                    let id = self.id_for(ChangeRef::new(plan_ref.unit, change));
                    let mark = RevisionMark::new(
                        id,
                        MarkKind::Moved {
                            from: plan.atoms_a[a].path.clone(),
                        },
                    );
                    self.emit_modified(&mut out, &plan.atoms_b[b], Some(mark))?;
                }
                Step::Refine {
                    a,
                    b,
                    target,
                    moved,
                    ..
                } => {
                    let y = &plan.atoms_b[b];
                    out.flush_passthrough(y.path[depth]);
                    let mark = moved.map(|change| {
                        let id = self.id_for(ChangeRef::new(plan_ref.unit, change));
                        RevisionMark::new(
                            id,
                            MarkKind::Moved {
                                from: plan.atoms_a[a].path.clone(),
                            },
                        )
                    });
                    let children = self.level(target)?;
                    let mut node = container_like(self.modified_at(&y.path)?, children)?;
                    node.set_mark(mark);
                    out.push(node);
                }
            }
        }
        Ok(out.finish())
    }

    fn insert_mark(&mut self, change: ChangeRef) -> Result<RevisionMark> {
        let id = self.id_for(change);
        let kind = match self.moves.source_of(change) {
            Some(source) => {
                let from = self
                    .change(source)?
                    .original_paths
                    .first()
                    .cloned()
                    .unwrap_or_default();
                MarkKind::Moved { from }
            }
            None => MarkKind::Inserted,
        };
        Ok(RevisionMark::new(id, kind))
    }

    fn emit_modified(&self, out: &mut Children<'a>, atom: &Atom, mark: Option<RevisionMark>) -> Result<()> {
        out.flush_passthrough(atom.path[atom.path.len() - 1]);
        if atom.is_token() {
            out.push_token(Source::Modified(&atom.path), &atom.payload, &atom.formatting, mark);
        } else {
            let mut node = self.modified_at(&atom.path)?.clone();
            node.set_mark(mark);
            out.push(node);
        }
        Ok(())
    }

    fn emit_original(&self, out: &mut Children<'a>, atom: &Atom, mark: RevisionMark) -> Result<()> {
        if atom.is_token() {
            out.push_token(Source::Original(&atom.path), &atom.payload, &atom.formatting, Some(mark));
        } else {
            out.push(self.original_at(&atom.path)?.marked(mark));
        }
        Ok(())
    }

    fn original_at(&self, path: &[usize]) -> Result<&'a Node> {
        self.original
            .node_at(path)
            .ok_or_else(|| RedlineError::invariant(format!("no original node at {:?}", path)))
    }

    fn modified_at(&self, path: &[usize]) -> Result<&'a Node> {
        self.modified
            .node_at(path)
            .ok_or_else(|| RedlineError::invariant(format!("no modified node at {:?}", path)))
    }

    fn change(&self, change: ChangeRef) -> Result<&'a Change> {
        self.units
            .get(change.unit)
            .and_then(|unit| unit.changes.get(change.change))
            .ok_or_else(|| RedlineError::invariant(format!("missing change {:?}", change)))
    }

    /// Revisions in id order.
    fn revisions(&self, author: &str, timestamp: DateTime<Utc>) -> Result<Vec<Revision>> {
        let mut revisions = Vec::with_capacity(self.order.len());
        for (index, &change_ref) in self.order.iter().enumerate() {
            let change = self.change(change_ref)?;
            let mut revision = Revision {
                id: index as u32 + 1,
                kind: change.kind,
                author: author.to_string(),
                timestamp,
                original_paths: change.original_paths.clone(),
                modified_paths: change.modified_paths.clone(),
                before: change.before.clone(),
                after: change.after.clone(),
            };
            if let Some(source) = self.moves.source_of(change_ref) {
                let source = self.change(source)?;
                revision.kind = RevisionKind::Move;
                revision.original_paths = source.original_paths.clone();
                revision.before = source.before.clone();
            }
            revisions.push(revision);
        }
        Ok(revisions)
    }
}

/// Which tree a token came from, and its run.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Source<'p> {
    Original(&'p [usize]),
    Modified(&'p [usize]),
}

struct PendingRun {
    source_is_modified: bool,
    path: NodePath,
    leaf: Leaf,
}

/// Children of one merged container under construction.
struct Children<'a> {
    /// Children of the modified container, for pass-through.
    source: &'a [Node],
    /// Modified child indices covered by atoms.
    referenced: HashSet<usize>,
    /// First modified child index not yet passed.
    next: usize,
    nodes: Vec<Node>,
    pending: Option<PendingRun>,
}

impl<'a> Children<'a> {
    /// Copy modified children that no atom covers, up to `index`.
    fn flush_passthrough(&mut self, index: usize) {
        while self.next < index.min(self.source.len()) {
            if !self.referenced.contains(&self.next) {
                self.flush_run();
                self.nodes.push(self.source[self.next].clone());
            }
            self.next += 1;
        }
    }

    /// Append a token, growing the current run when it comes from the same
    /// source run with the same formatting and mark.
    fn push_token(&mut self, source: Source<'_>, text: &str, formatting: &Formatting, mark: Option<RevisionMark>) {
        let (source_is_modified, path) = match source {
            Source::Original(path) => (false, path),
            Source::Modified(path) => (true, path),
        };
        if let Some(run) = &mut self.pending {
            if run.source_is_modified == source_is_modified
                && run.path == path
                && run.leaf.formatting == *formatting
                && run.leaf.mark == mark
            {
                if let LeafContent::Run { text: existing } = &mut run.leaf.content {
                    existing.push_str(text);
                    return;
                }
            }
        }
        self.flush_run();
        self.pending = Some(PendingRun {
            source_is_modified,
            path: path.to_vec(),
            leaf: Leaf {
                content: LeafContent::Run {
                    text: text.to_string(),
                },
                formatting: formatting.clone(),
                mark,
            },
        });
    }

    fn push(&mut self, node: Node) {
        self.flush_run();
        self.nodes.push(node);
    }

    fn flush_run(&mut self) {
        if let Some(run) = self.pending.take() {
            self.nodes.push(Node::Leaf(run.leaf));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_passthrough(self.source.len());
        self.flush_run();
        self.nodes
    }
}

fn annotation(text: String) -> Node {
    Node::leaf(LeafContent::Annotation { text })
}

/// Append to every changed, surviving slide an annotation listing its changes.
fn annotate_slides(root: &mut Node, revisions: &[Revision]) {
    let Node::Container(root) = root else { return };
    for slide in &mut root.children {
        if slide.role() != Some(ContainerRole::Slide) {
            continue;
        }
        if matches!(slide.mark(), Some(mark) if mark.kind == MarkKind::Deleted) {
            continue;
        }
        let mut ids = BTreeSet::new();
        collect_mark_ids(slide, &mut ids);
        if ids.is_empty() {
            continue;
        }
        let text = ids
            .iter()
            .filter_map(|&id| revisions.get(id as usize - 1))
            .map(|revision| format!("Revision {}: {}", revision.id, revision.describe()))
            .collect::<Vec<_>>()
            .join("; ");
        if let Node::Container(slide) = slide {
            slide.children.push(annotation(text));
        }
    }
}

fn append_summary(root: &mut Node, revisions: &[Revision]) {
    let Node::Container(root) = root else { return };
    let lines = revisions
        .iter()
        .map(|revision| {
            annotation(format!(
                "Revision {}: {} ({})",
                revision.id,
                revision.describe(),
                revision.author
            ))
        })
        .collect();
    root.children
        .push(Node::named(ContainerRole::Summary, SUMMARY_NAME, lines));
}

fn collect_mark_ids(node: &Node, ids: &mut BTreeSet<u32>) {
    if let Some(mark) = node.mark() {
        ids.insert(mark.revision);
    }
    for child in node.children() {
        collect_mark_ids(child, ids);
    }
}

/// Content a reader sees once every revision is accepted: deleted subtrees,
/// annotations and summary containers are skipped, container boundaries
/// are kept.
pub fn visible_text(node: &Node) -> String {
    let mut out = String::new();
    write_visible(node, &mut out);
    out
}

fn write_visible(node: &Node, out: &mut String) {
    if matches!(node.mark(), Some(mark) if mark.kind == MarkKind::Deleted) {
        return;
    }
    match node {
        Node::Container(container) => {
            if container.role == ContainerRole::Summary {
                return;
            }
            out.push('\u{2}');
            out.push_str(container.role.as_str());
            if let Some(name) = &container.name {
                out.push('=');
                out.push_str(name);
            }
            out.push('\u{1e}');
            for child in &container.children {
                write_visible(child, out);
            }
            out.push('\u{3}');
        }
        Node::Leaf(leaf) => leaf.content.write_visible(out),
    }
}

/// Check the merged document against the modified one and its revisions.
pub fn verify(merged: &Document, modified: &Document, revisions: &[Revision]) -> Result<()> {
    if !merged.root.is_container() {
        return Err(RedlineError::invariant("merged root is not a container"));
    }
    if visible_text(&merged.root) != visible_text(&modified.root) {
        return Err(RedlineError::invariant(
            "visible merged content differs from the modified document",
        ));
    }

    let mut seen = vec![false; revisions.len()];
    let mut stack: Vec<(&Node, bool)> = vec![(&merged.root, false)];
    while let Some((node, under_deleted)) = stack.pop() {
        let mut deleted = under_deleted;
        if let Some(mark) = node.mark() {
            let id = mark.revision as usize;
            if id == 0 || id > revisions.len() {
                return Err(RedlineError::invariant(format!(
                    "mark references unknown revision {}",
                    id
                )));
            }
            seen[id - 1] = true;
            match mark.kind {
                MarkKind::Deleted => deleted = true,
                MarkKind::Inserted | MarkKind::Moved { .. } if under_deleted => {
                    return Err(RedlineError::invariant(format!(
                        "revision {} is nested inside deleted content",
                        id
                    )));
                }
                _ => {}
            }
        }
        for child in node.children() {
            stack.push((child, deleted));
        }
    }

    if let Some(index) = seen.iter().position(|&found| !found) {
        return Err(RedlineError::invariant(format!(
            "revision {} has no mark in the merged document",
            index + 1
        )));
    }
    Ok(())
}
