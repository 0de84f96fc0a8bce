//! Comparison entry points.

use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use crate::codec::ProgressListener;
use crate::differ::changes::{Revision, RevisionSummary};
use crate::differ::correlate::detect_moves;
use crate::differ::refine::{plan_root, plan_unit, settle_replacements, UnitOutcome};
use crate::error::{RedlineError, Result};
use crate::reconstruct::{reconstruct, verify};
use crate::settings::ComparisonSettings;
use crate::types::Document;

/// Result of comparing two documents.
#[derive(Clone, Debug, Serialize)]
pub struct Comparison {
    /// Modified document with both sides of every change marked.
    pub merged: Document,
    /// Revisions in merged document order, ids starting at 1.
    pub revisions: Vec<Revision>,
    pub summary: RevisionSummary,
    pub duration_ms: f64,
}

/// Compare `original` against `modified`.
pub fn compare(
    original: &Document,
    modified: &Document,
    settings: &ComparisonSettings,
) -> Result<Comparison> {
    compare_with_progress(original, modified, settings, None)
}

/// Compare `original` against `modified`, reporting each stage to `progress`.
///
/// The listener is only called from the calling thread, between stages.
pub fn compare_with_progress(
    original: &Document,
    modified: &Document,
    settings: &ComparisonSettings,
    progress: Option<&dyn ProgressListener>,
) -> Result<Comparison> {
    let start = Instant::now();
    let report = |message: &str| {
        tracing::debug!("{}", message);
        if let Some(listener) = progress {
            listener.on_progress(message);
        }
    };

    if original.kind != modified.kind {
        return Err(RedlineError::KindMismatch {
            expected: original.kind.to_string(),
            found: modified.kind.to_string(),
        });
    }
    if !original.root.is_container() || !modified.root.is_container() {
        return Err(RedlineError::parse("document root must be a container"));
    }
    let timestamp = settings.timestamp().unwrap_or_else(chrono::Utc::now);

    report("Pairing top-level units");
    let (root, jobs) = plan_root(&original.root, &modified.root, settings)?;

    report(&format!("Comparing {} units", jobs.len()));
    let planned: Vec<UnitOutcome> = jobs
        .into_par_iter()
        .enumerate()
        .map(|(index, job)| plan_unit(&original.root, &modified.root, index + 1, job, settings))
        .collect::<Result<Vec<_>>>()?;

    let mut units = Vec::with_capacity(planned.len() + 1);
    units.push(root);
    units.extend(planned);

    report("Detecting moves");
    let moves = detect_moves(&units, settings);
    settle_replacements(&mut units, &moves);

    report("Building merged document");
    let (merged, revisions) = reconstruct(original, modified, &units, &moves, settings, timestamp)?;
    verify(&merged, modified, &revisions)?;

    let summary = RevisionSummary::from_revisions(&revisions);
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        "Compared {} documents: {} revisions ({}) in {:.1}ms",
        modified.kind,
        revisions.len(),
        summary.text(),
        duration_ms
    );

    Ok(Comparison {
        merged,
        revisions,
        summary,
        duration_ms,
    })
}
