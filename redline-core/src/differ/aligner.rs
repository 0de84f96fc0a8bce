//! Sequence alignment of atom hashes.
//!
//! Computes a maximum-length common subsequence of two hash sequences and
//! turns it into spans that partition both sides. Identical heads and tails
//! are stripped first. The middle is solved with a suffix LCS table whose
//! traceback always takes the optimal match nearest to the previous one, so
//! hunks stay contiguous. Inputs too large for the table are split on
//! anchors that occur exactly once on each side.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use crate::atomizer::Atom;

/// Largest LCS table (in cells) built in one piece.
pub const MAX_TABLE_CELLS: usize = 4_000_000;

/// Classification of a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Matched,
    /// Present only in the modified sequence.
    Inserted,
    /// Present only in the original sequence.
    Deleted,
    /// Unmatched, but an identical atom sits elsewhere on the other side.
    Moved,
    /// Content matches, formatting differs.
    FormattingChanged,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Matched => "matched",
            SpanKind::Inserted => "inserted",
            SpanKind::Deleted => "deleted",
            SpanKind::Moved => "moved",
            SpanKind::FormattingChanged => "formatting_changed",
        }
    }
}

/// A maximal run of identically classified atoms.
///
/// Matched-like spans cover equal-length ranges on both sides; deleted
/// spans have an empty modified range and inserted spans an empty original
/// range, positioned where the gap sits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub original: Range<usize>,
    pub modified: Range<usize>,
}

impl Span {
    pub fn new(kind: SpanKind, original: Range<usize>, modified: Range<usize>) -> Self {
        Self {
            kind,
            original,
            modified,
        }
    }

    /// True for spans pairing atoms on both sides.
    pub fn is_paired(&self) -> bool {
        matches!(self.kind, SpanKind::Matched | SpanKind::FormattingChanged)
    }
}

/// Align two atom sequences on their content hashes.
pub fn align_atoms(a: &[Atom], b: &[Atom]) -> Vec<Span> {
    let a: Vec<u64> = a.iter().map(|atom| atom.content_hash).collect();
    let b: Vec<u64> = b.iter().map(|atom| atom.content_hash).collect();
    align(&a, &b)
}

/// Align two hash sequences. The result partitions both `a` and `b`.
pub fn align(a: &[u64], b: &[u64]) -> Vec<Span> {
    let pairs = common_subsequence(a, b);
    spans_from_pairs(a.len(), b.len(), &pairs)
}

/// Number of atoms matched by the alignment of `a` and `b`.
pub fn matched_len(spans: &[Span]) -> usize {
    spans
        .iter()
        .filter(|span| span.is_paired())
        .map(|span| span.original.len())
        .sum()
}

/// Index pairs of a maximum common subsequence, in increasing order.
fn common_subsequence(a: &[u64], b: &[u64]) -> Vec<(usize, usize)> {
    let head = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let a_rest = &a[head..];
    let b_rest = &b[head..];
    let tail = a_rest
        .iter()
        .rev()
        .zip(b_rest.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a_rest[..a_rest.len() - tail];
    let b_mid = &b_rest[..b_rest.len() - tail];

    let mut pairs: Vec<(usize, usize)> = (0..head).map(|i| (i, i)).collect();
    for (i, j) in middle_subsequence(a_mid, b_mid) {
        pairs.push((i + head, j + head));
    }
    let a_tail = head + a_mid.len();
    let b_tail = head + b_mid.len();
    pairs.extend((0..tail).map(|k| (a_tail + k, b_tail + k)));
    pairs
}

fn middle_subsequence(a: &[u64], b: &[u64]) -> Vec<(usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    if (a.len() + 1).saturating_mul(b.len() + 1) <= MAX_TABLE_CELLS {
        return table_subsequence(a, b);
    }

    let anchors = unique_anchors(a, b);
    if anchors.is_empty() {
        tracing::debug!(
            "No unique anchors for {}x{} alignment, treating as full replacement",
            a.len(),
            b.len()
        );
        return Vec::new();
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    for (ai, bj) in anchors {
        for (x, y) in common_subsequence(&a[i..ai], &b[j..bj]) {
            pairs.push((x + i, y + j));
        }
        pairs.push((ai, bj));
        i = ai + 1;
        j = bj + 1;
    }
    for (x, y) in common_subsequence(&a[i..], &b[j..]) {
        pairs.push((x + i, y + j));
    }
    pairs
}

/// LCS through a suffix table with nearest-anchor traceback.
fn table_subsequence(a: &[u64], b: &[u64]) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }
    let at = |i: usize, j: usize| table[i * width + j];

    let mut pairs = Vec::with_capacity(at(0, 0) as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        let remaining = at(i, j);
        if remaining == 0 {
            break;
        }
        // Every optimal next match (x, y) satisfies at(x, j) == remaining and
        // at(x, y) == remaining, which bounds both scans.
        let mut best: Option<(usize, usize)> = None;
        let mut best_cost = usize::MAX;
        let mut x = i;
        while x < n && at(x, j) == remaining && x - i < best_cost {
            let mut y = j;
            while y < m && at(x, y) == remaining {
                let cost = (x - i) + (y - j);
                if cost >= best_cost {
                    break;
                }
                if a[x] == b[y] && at(x + 1, y + 1) + 1 == remaining {
                    best = Some((x, y));
                    best_cost = cost;
                    break;
                }
                y += 1;
            }
            x += 1;
        }
        match best {
            Some((x, y)) => {
                pairs.push((x, y));
                i = x + 1;
                j = y + 1;
            }
            None => break,
        }
    }
    pairs
}

/// Hashes occurring exactly once on each side, reduced to the longest
/// increasing chain of positions.
fn unique_anchors(a: &[u64], b: &[u64]) -> Vec<(usize, usize)> {
    fn unique_positions(seq: &[u64]) -> HashMap<u64, usize> {
        let mut positions = HashMap::new();
        for (i, hash) in seq.iter().enumerate() {
            match positions.entry(*hash) {
                Entry::Occupied(entry) => *entry.into_mut() = usize::MAX,
                Entry::Vacant(entry) => {
                    entry.insert(i);
                }
            }
        }
        positions.retain(|_, pos| *pos != usize::MAX);
        positions
    }

    let in_a = unique_positions(a);
    let in_b = unique_positions(b);
    let candidates: Vec<(usize, usize)> = a
        .iter()
        .enumerate()
        .filter_map(|(i, hash)| match (in_a.get(hash), in_b.get(hash)) {
            (Some(&ai), Some(&bj)) if ai == i => Some((i, bj)),
            _ => None,
        })
        .collect();

    longest_increasing(&candidates)
}

/// Longest chain of `candidates` (sorted by first index) with increasing second index.
fn longest_increasing(candidates: &[(usize, usize)]) -> Vec<(usize, usize)> {
    // tails[k] = index into candidates of the smallest tail of a chain of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; candidates.len()];
    for (index, &(_, bj)) in candidates.iter().enumerate() {
        let slot = tails.partition_point(|&t| candidates[t].1 < bj);
        if slot > 0 {
            previous[index] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(index);
        } else {
            tails[slot] = index;
        }
    }

    let mut chain = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        chain.push(candidates[index]);
        cursor = previous[index];
    }
    chain.reverse();
    chain
}

/// Turn matched index pairs into coalesced spans covering both sequences.
fn spans_from_pairs(n: usize, m: usize, pairs: &[(usize, usize)]) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let (mut i, mut j) = (0, 0);
    for &(x, y) in pairs {
        push_gap(&mut spans, i..x, j..y);
        match spans.last_mut() {
            Some(last)
                if last.kind == SpanKind::Matched
                    && last.original.end == x
                    && last.modified.end == y =>
            {
                last.original.end += 1;
                last.modified.end += 1;
            }
            _ => spans.push(Span::new(SpanKind::Matched, x..x + 1, y..y + 1)),
        }
        i = x + 1;
        j = y + 1;
    }
    push_gap(&mut spans, i..n, j..m);
    spans
}

fn push_gap(spans: &mut Vec<Span>, deleted: Range<usize>, inserted: Range<usize>) {
    if !deleted.is_empty() {
        spans.push(Span::new(
            SpanKind::Deleted,
            deleted.clone(),
            inserted.start..inserted.start,
        ));
    }
    if !inserted.is_empty() {
        spans.push(Span::new(
            SpanKind::Inserted,
            deleted.end..deleted.end,
            inserted,
        ));
    }
}
