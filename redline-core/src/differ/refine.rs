//! Level-by-level planning of the merged tree.
//!
//! Each container pair is planned one level at a time: its children are
//! atomized, aligned and classified, unmatched gaps are paired, and every
//! atom gets exactly one [`Step`]. Paired containers are refined one level
//! further down. Pairs below the detail threshold also carry a whole-pair
//! replacement, settled after move detection.
//!
//! The root level is planned on its own. Every top-level container pair it
//! refines becomes an independent comparison unit, planned with an explicit
//! worklist so deeply nested trees never recurse.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::atomizer::{atomize_children, join_payloads, Atom, Granularity};
use crate::differ::aligner::{align_atoms, matched_len, Span, SpanKind};
use crate::differ::changes::{Change, ChangeRef, RevisionKind};
use crate::differ::correlate::{classify, fingerprint, pair_score, MoveTable};
use crate::error::{RedlineError, Result};
use crate::settings::ComparisonSettings;
use crate::types::{Formatting, Node, NodePath};

/// Gaps with more candidate pairs than this are paired positionally.
pub const POSITIONAL_PAIRING_LIMIT: usize = 10_000;

const SCORE_EPSILON: f64 = 1e-9;

/// Address of a level plan: comparison unit plus index in its plan list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlanRef {
    pub unit: usize,
    pub plan: usize,
}

impl PlanRef {
    const PENDING: PlanRef = PlanRef {
        unit: usize::MAX,
        plan: usize::MAX,
    };
}

/// What happens to one atom (or one paired atom on each side).
///
/// `a` indexes the original atoms of the level, `b` the modified atoms, and
/// every `change` indexes the owning unit's change list.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Kept. `format` is set when only the formatting changed.
    Match {
        a: usize,
        b: usize,
        format: Option<usize>,
    },
    /// Removed. No change means the removal passes silently.
    Delete { a: usize, change: Option<usize> },
    /// Added. No change means the addition passes silently.
    Insert { b: usize, change: Option<usize> },
    /// Paired, but replaced as a whole.
    Replace { a: usize, b: usize, change: usize },
    /// Keyed leaf found in a different gap. Shown once, at its modified
    /// position, marked as moved from the original.
    Relocate { a: usize, b: usize, change: usize },
    /// Paired containers compared one level further down.
    Refine {
        a: usize,
        b: usize,
        target: PlanRef,
        /// Set when the pair sits in different gaps (a keyed container that moved).
        moved: Option<usize>,
        /// Whole-pair replacement for a pair below the detail threshold. Taken
        /// by [`settle_replacements`] unless the subtree holds a move.
        replace: Option<usize>,
    },
}

/// Plan of one container level.
#[derive(Clone, Debug, Default)]
pub struct LevelPlan {
    /// Path of the container in the original document.
    pub a_path: NodePath,
    /// Path of the container in the modified document.
    pub b_path: NodePath,
    pub atoms_a: Vec<Atom>,
    pub atoms_b: Vec<Atom>,
    /// Steps in merged order.
    pub steps: Vec<Step>,
}

impl LevelPlan {
    fn retarget(&mut self, step: usize, plan_ref: PlanRef) {
        if let Some(Step::Refine { target, .. }) = self.steps.get_mut(step) {
            *target = plan_ref;
        }
    }
}

/// Everything one comparison unit produced.
#[derive(Clone, Debug, Default)]
pub struct UnitOutcome {
    pub plans: Vec<LevelPlan>,
    pub changes: Vec<Change>,
}

/// Atoms and classified spans of a container pair's children.
#[derive(Clone, Debug)]
pub struct Prepared {
    atoms_a: Vec<Atom>,
    atoms_b: Vec<Atom>,
    spans: Vec<Span>,
}

impl Prepared {
    fn new(
        a: &Node,
        a_path: &[usize],
        b: &Node,
        b_path: &[usize],
        settings: &ComparisonSettings,
    ) -> Self {
        let atoms_a = atomize_children(a, a_path, settings);
        let atoms_b = atomize_children(b, b_path, settings);
        let spans = classify(&align_atoms(&atoms_a, &atoms_b), &atoms_a, &atoms_b, settings);
        Self {
            atoms_a,
            atoms_b,
            spans,
        }
    }

    /// Fraction of the children that matched. Two empty containers match fully.
    fn match_ratio(&self) -> f64 {
        let longest = self.atoms_a.len().max(self.atoms_b.len());
        if longest == 0 {
            return 1.0;
        }
        matched_len(&self.spans) as f64 / longest as f64
    }
}

/// A top-level container pair to be planned as its own unit.
#[derive(Clone, Debug)]
pub struct UnitJob {
    pub a_path: NodePath,
    pub b_path: NodePath,
    prepared: Option<Prepared>,
}

/// Container pair still to be planned, produced while planning its parent.
struct Subtask {
    /// Index of the parent's `Refine` step.
    step: usize,
    a_path: NodePath,
    b_path: NodePath,
    prepared: Option<Prepared>,
}

struct Task {
    plan: usize,
    a_path: NodePath,
    b_path: NodePath,
    prepared: Option<Prepared>,
}

/// Plan the root level. Returns unit 0 and the jobs for every refined
/// top-level pair; job `k` becomes unit `k + 1`.
pub fn plan_root(
    original: &Node,
    modified: &Node,
    settings: &ComparisonSettings,
) -> Result<(UnitOutcome, Vec<UnitJob>)> {
    let planner = Planner {
        original,
        modified,
        settings,
    };
    let mut changes = Vec::new();
    let (mut plan, subtasks) =
        planner.plan_level(Vec::new(), Vec::new(), None, true, &mut changes)?;

    let mut jobs = Vec::with_capacity(subtasks.len());
    for subtask in subtasks {
        plan.retarget(
            subtask.step,
            PlanRef {
                unit: jobs.len() + 1,
                plan: 0,
            },
        );
        jobs.push(UnitJob {
            a_path: subtask.a_path,
            b_path: subtask.b_path,
            prepared: subtask.prepared,
        });
    }

    tracing::debug!(
        "Root level: {} atoms original, {} modified, {} units",
        plan.atoms_a.len(),
        plan.atoms_b.len(),
        jobs.len()
    );
    Ok((
        UnitOutcome {
            plans: vec![plan],
            changes,
        },
        jobs,
    ))
}

/// Plan one comparison unit down to its leaves.
pub fn plan_unit(
    original: &Node,
    modified: &Node,
    unit: usize,
    job: UnitJob,
    settings: &ComparisonSettings,
) -> Result<UnitOutcome> {
    let planner = Planner {
        original,
        modified,
        settings,
    };
    let mut outcome = UnitOutcome {
        plans: vec![LevelPlan::default()],
        changes: Vec::new(),
    };
    let mut stack = vec![Task {
        plan: 0,
        a_path: job.a_path,
        b_path: job.b_path,
        prepared: job.prepared,
    }];

    while let Some(task) = stack.pop() {
        let (mut plan, subtasks) = planner.plan_level(
            task.a_path,
            task.b_path,
            task.prepared,
            false,
            &mut outcome.changes,
        )?;
        for subtask in subtasks {
            let index = outcome.plans.len();
            outcome.plans.push(LevelPlan::default());
            plan.retarget(subtask.step, PlanRef { unit, plan: index });
            stack.push(Task {
                plan: index,
                a_path: subtask.a_path,
                b_path: subtask.b_path,
                prepared: subtask.prepared,
            });
        }
        outcome.plans[task.plan] = plan;
    }

    Ok(outcome)
}

/// Replace every refined pair below the detail threshold whose subtree
/// holds no move endpoint. Returns how many pairs were replaced.
///
/// A child plan always comes after its parent: later in the same unit, or
/// in a later unit for the root plan.
pub fn settle_replacements(units: &mut [UnitOutcome], moves: &MoveTable) -> usize {
    let mut holds: Vec<Vec<bool>> = units.iter().map(|unit| vec![false; unit.plans.len()]).collect();
    for unit in (0..units.len()).rev() {
        for plan in (0..units[unit].plans.len()).rev() {
            let held = units[unit].plans[plan].steps.iter().any(|step| match *step {
                Step::Delete {
                    change: Some(change),
                    ..
                }
                | Step::Insert {
                    change: Some(change),
                    ..
                } => moves.is_endpoint(ChangeRef::new(unit, change)),
                Step::Refine {
                    moved: Some(_), ..
                }
                | Step::Relocate { .. } => true,
                Step::Refine { target, .. } => holds
                    .get(target.unit)
                    .and_then(|plans| plans.get(target.plan))
                    .copied()
                    .unwrap_or(false),
                _ => false,
            });
            holds[unit][plan] = held;
        }
    }

    let mut replaced = 0;
    for unit in units.iter_mut() {
        for plan in &mut unit.plans {
            for step in &mut plan.steps {
                if let Step::Refine {
                    a,
                    b,
                    target,
                    replace: Some(change),
                    ..
                } = *step
                {
                    let held = holds
                        .get(target.unit)
                        .and_then(|plans| plans.get(target.plan))
                        .copied()
                        .unwrap_or(false);
                    if !held {
                        *step = Step::Replace { a, b, change };
                        replaced += 1;
                    }
                }
            }
        }
    }
    tracing::debug!("Settled {} whole-pair replacements", replaced);
    replaced
}

struct Planner<'a> {
    original: &'a Node,
    modified: &'a Node,
    settings: &'a ComparisonSettings,
}

impl<'a> Planner<'a> {
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

    fn plan_level(
        &self,
        a_path: NodePath,
        b_path: NodePath,
        prepared: Option<Prepared>,
        at_root: bool,
        changes: &mut Vec<Change>,
    ) -> Result<(LevelPlan, Vec<Subtask>)> {
        let prepared = match prepared {
            Some(prepared) => prepared,
            None => Prepared::new(
                self.original_at(&a_path)?,
                &a_path,
                self.modified_at(&b_path)?,
                &b_path,
                self.settings,
            ),
        };
        let Prepared {
            atoms_a,
            atoms_b,
            spans,
        } = prepared;

        let mut level = LevelBuilder {
            planner: self,
            atoms_a: &atoms_a,
            atoms_b: &atoms_b,
            silent: at_root && !self.settings.compare_structure(),
            changes,
            steps: Vec::new(),
            subtasks: Vec::new(),
        };
        level.build(&spans)?;
        let LevelBuilder {
            steps, subtasks, ..
        } = level;

        Ok((
            LevelPlan {
                a_path,
                b_path,
                atoms_a,
                atoms_b,
                steps,
            },
            subtasks,
        ))
    }
}

/// Unmatched atoms between two paired spans.
#[derive(Debug, Default)]
struct Gap {
    deletes: Vec<usize>,
    inserts: Vec<usize>,
    pairs: Vec<(usize, usize)>,
}

enum Segment {
    Paired(Span),
    Gap(usize),
}

/// Gap entries in merged order.
#[derive(Clone, Copy)]
enum Item {
    Delete(usize),
    Insert(usize),
    Pair(usize, usize),
    /// Keyed pair whose halves sit in different gaps, emitted at the modified side.
    Cross(usize, usize),
    /// Original half of a cross pair. Emits nothing but ends runs.
    Hidden,
}

struct LevelBuilder<'a> {
    planner: &'a Planner<'a>,
    atoms_a: &'a [Atom],
    atoms_b: &'a [Atom],
    /// Additions and removals at this level produce no revisions.
    silent: bool,
    changes: &'a mut Vec<Change>,
    steps: Vec<Step>,
    subtasks: Vec<Subtask>,
}

impl<'a> LevelBuilder<'a> {
    fn build(&mut self, spans: &[Span]) -> Result<()> {
        let mut moved_a = vec![false; self.atoms_a.len()];
        let mut moved_b = vec![false; self.atoms_b.len()];
        let mut segments = Vec::new();
        let mut gaps: Vec<Gap> = Vec::new();
        let mut open_gap: Option<usize> = None;

        for span in spans {
            if span.is_paired() {
                segments.push(Segment::Paired(span.clone()));
                open_gap = None;
                continue;
            }
            let index = match open_gap {
                Some(index) => index,
                None => {
                    gaps.push(Gap::default());
                    segments.push(Segment::Gap(gaps.len() - 1));
                    gaps.len() - 1
                }
            };
            open_gap = Some(index);
            let gap = &mut gaps[index];
            gap.deletes.extend(span.original.clone());
            gap.inserts.extend(span.modified.clone());
            if span.kind == SpanKind::Moved {
                span.original.clone().for_each(|a| moved_a[a] = true);
                span.modified.clone().for_each(|b| moved_b[b] = true);
            }
        }

        for gap in &mut gaps {
            let deletes: Vec<usize> = gap.deletes.iter().copied().filter(|&a| !moved_a[a]).collect();
            let inserts: Vec<usize> = gap.inserts.iter().copied().filter(|&b| !moved_b[b]).collect();
            gap.pairs = pair_gap(&deletes, &inserts, self.atoms_a, self.atoms_b);
        }
        let (cross, hidden) = self.cross_pairs(&gaps, &moved_a, &moved_b);

        for segment in segments {
            match segment {
                Segment::Paired(span) => self.paired_span(&span)?,
                Segment::Gap(index) => {
                    let items = gap_items(&gaps[index], &cross, &hidden);
                    self.gap_steps(&items, &moved_a, &moved_b)?;
                }
            }
        }
        Ok(())
    }

    /// Pair leftover keyed atoms with equal keys across gaps, in modified order.
    fn cross_pairs(
        &self,
        gaps: &[Gap],
        moved_a: &[bool],
        moved_b: &[bool],
    ) -> (HashMap<usize, usize>, HashSet<usize>) {
        let paired_a: HashSet<usize> = gaps.iter().flat_map(|g| g.pairs.iter().map(|p| p.0)).collect();
        let paired_b: HashSet<usize> = gaps.iter().flat_map(|g| g.pairs.iter().map(|p| p.1)).collect();

        let mut leftover: HashMap<(Granularity, &str, &str), VecDeque<usize>> = HashMap::new();
        for &a in gaps.iter().flat_map(|g| &g.deletes) {
            let atom = &self.atoms_a[a];
            if let (false, false, Some(key)) = (moved_a[a], paired_a.contains(&a), &atom.key) {
                leftover
                    .entry((atom.granularity, atom.label, key.as_str()))
                    .or_default()
                    .push_back(a);
            }
        }

        let mut cross = HashMap::new();
        let mut hidden = HashSet::new();
        for &b in gaps.iter().flat_map(|g| &g.inserts) {
            let atom = &self.atoms_b[b];
            if moved_b[b] || paired_b.contains(&b) {
                continue;
            }
            let Some(key) = &atom.key else {
                continue;
            };
            if let Some(a) = leftover
                .get_mut(&(atom.granularity, atom.label, key.as_str()))
                .and_then(VecDeque::pop_front)
            {
                cross.insert(b, a);
                hidden.insert(a);
            }
        }
        (cross, hidden)
    }

    fn paired_span(&mut self, span: &Span) -> Result<()> {
        let atoms_a = self.atoms_a;
        let atoms_b = self.atoms_b;
        let mut k = 0;
        while k < span.original.len() {
            let (a, b) = (span.original.start + k, span.modified.start + k);
            let (x, y) = (&atoms_a[a], &atoms_b[b]);
            if span.kind == SpanKind::Matched {
                self.steps.push(Step::Match { a, b, format: None });
                k += 1;
                continue;
            }
            if x.granularity == Granularity::Container {
                self.refine(a, b, None, None, None);
                k += 1;
                continue;
            }

            // One change per run of leaves sharing the same formatting transition.
            let mut end = k + 1;
            while end < span.original.len() {
                let (nx, ny) = (&atoms_a[a + end - k], &atoms_b[b + end - k]);
                if nx.granularity == Granularity::Container
                    || nx.formatting != x.formatting
                    || ny.formatting != y.formatting
                {
                    break;
                }
                end += 1;
            }
            let run_a = &atoms_a[a..a + end - k];
            let run_b = &atoms_b[b..b + end - k];
            let text = join_payloads(run_b);
            let change = self.push(
                Change::new(RevisionKind::FormatChange)
                    .with_original(
                        paths_of(run_a),
                        format!("{} ({})", text.trim_end(), describe_formatting(&x.formatting)),
                    )
                    .with_modified(
                        paths_of(run_b),
                        format!("{} ({})", text.trim_end(), describe_formatting(&y.formatting)),
                    ),
            );
            for offset in 0..end - k {
                self.steps.push(Step::Match {
                    a: a + offset,
                    b: b + offset,
                    format: Some(change),
                });
            }
            k = end;
        }
        Ok(())
    }

    fn gap_steps(&mut self, items: &[Item], moved_a: &[bool], moved_b: &[bool]) -> Result<()> {
        let atoms_a = self.atoms_a;
        let atoms_b = self.atoms_b;
        let mut k = 0;
        while k < items.len() {
            match items[k] {
                Item::Delete(a) => {
                    let mut end = k + 1;
                    if !moved_a[a] {
                        while let Some(Item::Delete(next)) = items.get(end) {
                            if moved_a[*next] || *next != a + (end - k) {
                                break;
                            }
                            end += 1;
                        }
                    }
                    let last = a + (end - k) - 1;
                    let change = self.block_change(RevisionKind::Delete, &atoms_a[a..=last]);
                    for index in a..=last {
                        self.steps.push(Step::Delete { a: index, change });
                    }
                    k = end;
                }
                Item::Insert(b) => {
                    let mut end = k + 1;
                    if !moved_b[b] {
                        while let Some(Item::Insert(next)) = items.get(end) {
                            if moved_b[*next] || *next != b + (end - k) {
                                break;
                            }
                            end += 1;
                        }
                    }
                    let last = b + (end - k) - 1;
                    let change = self.block_change(RevisionKind::Insert, &atoms_b[b..=last]);
                    for index in b..=last {
                        self.steps.push(Step::Insert { b: index, change });
                    }
                    k = end;
                }
                Item::Pair(a, b) => {
                    self.pair_step(a, b, false)?;
                    k += 1;
                }
                Item::Cross(a, b) => {
                    self.pair_step(a, b, true)?;
                    k += 1;
                }
                Item::Hidden => k += 1,
            }
        }
        Ok(())
    }

    /// Change for a deleted or inserted block. Blocks without word tokens
    /// carry a fingerprint so they can pair into a move.
    fn block_change(&mut self, kind: RevisionKind, atoms: &[Atom]) -> Option<usize> {
        if self.silent {
            return None;
        }
        let text = join_payloads(atoms);
        let mut change = Change::new(kind);
        change = match kind {
            RevisionKind::Delete => change.with_original(paths_of(atoms), text),
            _ => change.with_modified(paths_of(atoms), text),
        };
        if !atoms.iter().any(Atom::is_token) {
            change = change.with_fingerprint(fingerprint(atoms));
        }
        Some(self.push(change))
    }

    fn pair_step(&mut self, a: usize, b: usize, cross: bool) -> Result<()> {
        let settings = self.planner.settings;
        let atoms_a = self.atoms_a;
        let atoms_b = self.atoms_b;
        let (x, y) = (&atoms_a[a], &atoms_b[b]);

        if x.granularity == Granularity::Container && y.granularity == Granularity::Container {
            let prepared = Prepared::new(
                self.planner.original_at(&x.path)?,
                &x.path,
                self.planner.modified_at(&y.path)?,
                &y.path,
                settings,
            );
            if cross {
                let moved = self.push(paired_change(RevisionKind::Move, x, y));
                self.refine(a, b, Some(prepared), Some(moved), None);
            } else {
                // Planned in full either way; moves decide once every unit is done.
                let replace = (prepared.match_ratio() < settings.detail_threshold())
                    .then(|| self.push(paired_change(RevisionKind::ContentChange, x, y)));
                self.refine(a, b, Some(prepared), None, replace);
            }
            return Ok(());
        }

        if cross {
            let change = self.push(paired_change(RevisionKind::Move, x, y));
            self.steps.push(Step::Relocate { a, b, change });
        } else if x.content_hash == y.content_hash {
            let format = if settings.compare_formatting() && x.full_hash != y.full_hash {
                Some(self.push(
                    Change::new(RevisionKind::FormatChange)
                        .with_original(vec![x.path.clone()], describe_formatting(&x.formatting))
                        .with_modified(vec![y.path.clone()], describe_formatting(&y.formatting)),
                ))
            } else {
                None
            };
            self.steps.push(Step::Match { a, b, format });
        } else {
            let change = self.push(paired_change(RevisionKind::ContentChange, x, y));
            self.steps.push(Step::Replace { a, b, change });
        }
        Ok(())
    }

    fn refine(
        &mut self,
        a: usize,
        b: usize,
        prepared: Option<Prepared>,
        moved: Option<usize>,
        replace: Option<usize>,
    ) {
        self.subtasks.push(Subtask {
            step: self.steps.len(),
            a_path: self.atoms_a[a].path.clone(),
            b_path: self.atoms_b[b].path.clone(),
            prepared,
        });
        self.steps.push(Step::Refine {
            a,
            b,
            target: PlanRef::PENDING,
            moved,
            replace,
        });
    }

    fn push(&mut self, change: Change) -> usize {
        self.changes.push(change);
        self.changes.len() - 1
    }
}

fn paired_change(kind: RevisionKind, x: &Atom, y: &Atom) -> Change {
    Change::new(kind)
        .with_original(vec![x.path.clone()], x.payload.clone())
        .with_modified(vec![y.path.clone()], y.payload.clone())
}

/// Merge a gap's deletes, inserts and pairs into emission order: before each
/// pair, the unpaired deletes then the unpaired inserts preceding it.
fn gap_items(gap: &Gap, cross: &HashMap<usize, usize>, hidden: &HashSet<usize>) -> Vec<Item> {
    let delete_item = |a: usize| {
        if hidden.contains(&a) {
            Item::Hidden
        } else {
            Item::Delete(a)
        }
    };
    let insert_item = |b: usize| match cross.get(&b) {
        Some(&a) => Item::Cross(a, b),
        None => Item::Insert(b),
    };

    let mut items = Vec::with_capacity(gap.deletes.len() + gap.inserts.len());
    let (mut di, mut ii) = (0, 0);
    for &(pa, pb) in &gap.pairs {
        while di < gap.deletes.len() && gap.deletes[di] != pa {
            items.push(delete_item(gap.deletes[di]));
            di += 1;
        }
        di += 1;
        while ii < gap.inserts.len() && gap.inserts[ii] != pb {
            items.push(insert_item(gap.inserts[ii]));
            ii += 1;
        }
        ii += 1;
        items.push(Item::Pair(pa, pb));
    }
    items.extend(gap.deletes.iter().skip(di).map(|&a| delete_item(a)));
    items.extend(gap.inserts.iter().skip(ii).map(|&b| insert_item(b)));
    items
}

/// Order-preserving pairing of a gap's deletes and inserts maximizing the
/// total pair score.
pub fn pair_gap(deletes: &[usize], inserts: &[usize], a: &[Atom], b: &[Atom]) -> Vec<(usize, usize)> {
    let (p, q) = (deletes.len(), inserts.len());
    if p == 0 || q == 0 {
        return Vec::new();
    }
    if p * q > POSITIONAL_PAIRING_LIMIT {
        return deletes
            .iter()
            .zip(inserts)
            .filter(|(&x, &y)| pair_score(&a[x], &b[y]) > 0.0)
            .map(|(&x, &y)| (x, y))
            .collect();
    }

    let mut scores = vec![0.0f64; p * q];
    for i in 0..p {
        for j in 0..q {
            scores[i * q + j] = pair_score(&a[deletes[i]], &b[inserts[j]]);
        }
    }
    let width = q + 1;
    let mut best = vec![0.0f64; (p + 1) * width];
    for i in (0..p).rev() {
        for j in (0..q).rev() {
            let mut value = best[(i + 1) * width + j].max(best[i * width + j + 1]);
            let score = scores[i * q + j];
            if score > 0.0 {
                value = value.max(score + best[(i + 1) * width + j + 1]);
            }
            best[i * width + j] = value;
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < p && j < q {
        let here = best[i * width + j];
        let score = scores[i * q + j];
        if score > 0.0 && here <= score + best[(i + 1) * width + j + 1] + SCORE_EPSILON {
            pairs.push((deletes[i], inserts[j]));
            i += 1;
            j += 1;
        } else if here <= best[(i + 1) * width + j] + SCORE_EPSILON {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Paths of a block, with consecutive duplicates (tokens of one run) collapsed.
fn paths_of(atoms: &[Atom]) -> Vec<NodePath> {
    let mut paths: Vec<NodePath> = Vec::new();
    for atom in atoms {
        if paths.last() != Some(&atom.path) {
            paths.push(atom.path.clone());
        }
    }
    paths
}

/// Readable formatting set, e.g. `bold=true, size=12`.
pub fn describe_formatting(formatting: &Formatting) -> String {
    if formatting.is_empty() {
        return "(none)".to_string();
    }
    formatting
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}
