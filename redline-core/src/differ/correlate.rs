//! Correlation of unmatched content.
//!
//! Splits aligner spans into formatting-only changes and move candidates,
//! scores how similar two atoms are for gap pairing, and after all units
//! are planned, pairs deleted and inserted blocks across units into moves.

use std::collections::{HashMap, HashSet};

use xxhash_rust::xxh3::xxh3_64;

use crate::atomizer::{Atom, Granularity};
use crate::differ::aligner::{Span, SpanKind};
use crate::differ::changes::{ChangeRef, Fingerprint, RevisionKind};
use crate::differ::refine::UnitOutcome;
use crate::settings::ComparisonSettings;

/// Minimum Dice similarity for two unkeyed atoms to be paired in a gap.
pub const PAIR_SIMILARITY_FLOOR: f64 = 0.25;

/// Score for two keyed atoms with equal keys. Above any similarity score.
const KEYED_PAIR_SCORE: f64 = 2.0;

/// Refine aligner spans: matched runs whose formatting differs become
/// `FormattingChanged` (only when formatting is compared), and unmatched
/// non-token atoms with an identical counterpart among the other side's
/// unmatched atoms become `Moved`.
pub fn classify(spans: &[Span], a: &[Atom], b: &[Atom], settings: &ComparisonSettings) -> Vec<Span> {
    let unmatched_full = |atoms: &[Atom], kind: SpanKind| -> HashSet<u64> {
        spans
            .iter()
            .filter(|span| span.kind == kind)
            .flat_map(|span| {
                let range = if kind == SpanKind::Deleted {
                    span.original.clone()
                } else {
                    span.modified.clone()
                };
                atoms[range].iter()
            })
            .filter(|atom| !atom.is_token())
            .map(|atom| atom.full_hash)
            .collect()
    };
    let deleted = unmatched_full(a, SpanKind::Deleted);
    let inserted = unmatched_full(b, SpanKind::Inserted);

    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span.kind {
            SpanKind::Matched => {
                let differs = |k: usize| {
                    settings.compare_formatting()
                        && a[span.original.start + k].full_hash != b[span.modified.start + k].full_hash
                };
                for (range, alt) in runs(span.original.len(), differs) {
                    let kind = if alt {
                        SpanKind::FormattingChanged
                    } else {
                        SpanKind::Matched
                    };
                    out.push(Span::new(
                        kind,
                        span.original.start + range.start..span.original.start + range.end,
                        span.modified.start + range.start..span.modified.start + range.end,
                    ));
                }
            }
            SpanKind::Deleted => {
                let moved = |k: usize| {
                    let atom = &a[span.original.start + k];
                    !atom.is_token() && inserted.contains(&atom.full_hash)
                };
                for (range, alt) in runs(span.original.len(), moved) {
                    let kind = if alt { SpanKind::Moved } else { SpanKind::Deleted };
                    out.push(Span::new(
                        kind,
                        span.original.start + range.start..span.original.start + range.end,
                        span.modified.clone(),
                    ));
                }
            }
            SpanKind::Inserted => {
                let moved = |k: usize| {
                    let atom = &b[span.modified.start + k];
                    !atom.is_token() && deleted.contains(&atom.full_hash)
                };
                for (range, alt) in runs(span.modified.len(), moved) {
                    let kind = if alt { SpanKind::Moved } else { SpanKind::Inserted };
                    out.push(Span::new(
                        kind,
                        span.original.clone(),
                        span.modified.start + range.start..span.modified.start + range.end,
                    ));
                }
            }
            SpanKind::Moved | SpanKind::FormattingChanged => out.push(span.clone()),
        }
    }
    out
}

/// Maximal runs of `0..len` with equal `predicate` value.
fn runs(len: usize, predicate: impl Fn(usize) -> bool) -> Vec<(std::ops::Range<usize>, bool)> {
    let mut out: Vec<(std::ops::Range<usize>, bool)> = Vec::new();
    for k in 0..len {
        let value = predicate(k);
        match out.last_mut() {
            Some((range, last)) if *last == value => range.end = k + 1,
            _ => out.push((k..k + 1, value)),
        }
    }
    out
}

/// Pairing score of a deleted and an inserted atom. Zero means they may not pair.
pub fn pair_score(a: &Atom, b: &Atom) -> f64 {
    if a.granularity == Granularity::Token || b.granularity == Granularity::Token {
        return 0.0;
    }
    if a.granularity != b.granularity || a.label != b.label {
        return 0.0;
    }
    match (&a.key, &b.key) {
        (Some(x), Some(y)) if x == y => KEYED_PAIR_SCORE,
        (None, None) => {
            let similarity = dice(&a.shingles, &b.shingles);
            if similarity >= PAIR_SIMILARITY_FLOOR {
                similarity
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Size of the multiset intersection of two sorted slices.
fn intersection_len(x: &[u64], y: &[u64]) -> usize {
    let (mut i, mut j, mut common) = (0, 0, 0);
    while i < x.len() && j < y.len() {
        match x[i].cmp(&y[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                common += 1;
                i += 1;
                j += 1;
            }
        }
    }
    common
}

/// Dice coefficient of two sorted multisets.
pub fn dice(x: &[u64], y: &[u64]) -> f64 {
    if x.is_empty() && y.is_empty() {
        return 0.0;
    }
    2.0 * intersection_len(x, y) as f64 / (x.len() + y.len()) as f64
}

/// Jaccard index of two sorted multisets.
pub fn jaccard(x: &[u64], y: &[u64]) -> f64 {
    let common = intersection_len(x, y);
    let union = x.len() + y.len() - common;
    if union == 0 {
        return 0.0;
    }
    common as f64 / union as f64
}

/// Fingerprint of a block of atoms.
pub fn fingerprint(atoms: &[Atom]) -> Fingerprint {
    let mut bytes = Vec::with_capacity(atoms.len() * 8);
    let mut shingles = Vec::new();
    for atom in atoms {
        bytes.extend_from_slice(&atom.full_hash.to_le_bytes());
        match atom.granularity {
            Granularity::Container => shingles.extend_from_slice(&atom.shingles),
            _ => shingles.push(atom.content_hash),
        }
    }
    shingles.sort_unstable();
    Fingerprint {
        digest: xxh3_64(&bytes),
        shingles,
    }
}

/// Deleted/inserted change pairs reclassified as moves.
#[derive(Debug, Default)]
pub struct MoveTable {
    /// Destination (insert) change for each source (delete) change.
    destinations: HashMap<ChangeRef, ChangeRef>,
    /// Source (delete) change for each destination (insert) change.
    sources: HashMap<ChangeRef, ChangeRef>,
}

impl MoveTable {
    fn record(&mut self, source: ChangeRef, destination: ChangeRef) {
        self.destinations.insert(source, destination);
        self.sources.insert(destination, source);
    }

    /// Source change of a move destination.
    pub fn source_of(&self, destination: ChangeRef) -> Option<ChangeRef> {
        self.sources.get(&destination).copied()
    }

    pub fn is_source(&self, change: ChangeRef) -> bool {
        self.destinations.contains_key(&change)
    }

    /// Whether the change is either end of a move.
    pub fn is_endpoint(&self, change: ChangeRef) -> bool {
        self.destinations.contains_key(&change) || self.sources.contains_key(&change)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Pair deleted and inserted blocks of all units into moves.
///
/// Runs once, after every unit has been planned. Exact fingerprint matches
/// at a different path always pair; with a move similarity floor set,
/// remaining blocks pair when their shingle Jaccard index reaches the floor.
/// Pairing is one-to-one and greedy in unit order.
pub fn detect_moves(units: &[UnitOutcome], settings: &ComparisonSettings) -> MoveTable {
    let mut sources = Vec::new();
    let mut destinations = Vec::new();
    for (unit_index, unit) in units.iter().enumerate() {
        for (change_index, change) in unit.changes.iter().enumerate() {
            let Some(fingerprint) = &change.fingerprint else {
                continue;
            };
            let entry = (ChangeRef::new(unit_index, change_index), change, fingerprint);
            match change.kind {
                RevisionKind::Delete => sources.push(entry),
                RevisionKind::Insert => destinations.push(entry),
                _ => {}
            }
        }
    }

    let mut table = MoveTable::default();
    let mut used = vec![false; destinations.len()];
    let mut by_digest: HashMap<u64, Vec<usize>> = HashMap::new();
    for (index, (_, _, fingerprint)) in destinations.iter().enumerate() {
        by_digest.entry(fingerprint.digest).or_default().push(index);
    }

    let mut unmatched = Vec::new();
    for (source_ref, source, fingerprint) in &sources {
        let found = by_digest.get(&fingerprint.digest).and_then(|candidates| {
            candidates.iter().copied().find(|&index| {
                !used[index] && destinations[index].1.modified_paths != source.original_paths
            })
        });
        match found {
            Some(index) => {
                used[index] = true;
                table.record(*source_ref, destinations[index].0);
            }
            None => unmatched.push((*source_ref, *fingerprint)),
        }
    }

    if let Some(floor) = settings.move_similarity() {
        for (source_ref, fingerprint) in unmatched {
            let mut best: Option<(usize, f64)> = None;
            for (index, (_, _, candidate)) in destinations.iter().enumerate() {
                if used[index] {
                    continue;
                }
                let similarity = jaccard(&fingerprint.shingles, &candidate.shingles);
                if similarity >= floor && best.map_or(true, |(_, s)| similarity > s) {
                    best = Some((index, similarity));
                }
            }
            if let Some((index, _)) = best {
                used[index] = true;
                table.record(source_ref, destinations[index].0);
            }
        }
    }

    tracing::debug!(
        "Move detection: {} candidates deleted, {} inserted, {} moves",
        sources.len(),
        destinations.len(),
        table.len()
    );
    table
}
