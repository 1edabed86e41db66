//! Dataset diffing
//!
//! Combines classification with per-scene text and HTML renderings.

use crate::classify::{classify, DiffStatus, DiffSummary};
use crate::error::DiffError;
use crate::html::{html_table, HtmlOptions};
use crate::unified::unified_diff;
use scene_artifact::{to_pretty_lines, SceneDataset};
use serde::{Deserialize, Serialize};

/// Label prefix for the stored side of a diff
pub const CURRENT_LABEL: &str = "current";
/// Label prefix for the compared side of a diff
pub const INCOMING_LABEL: &str = "incoming";

/// Rendering settings for [`compute_diffs_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Context lines around each change (unified and HTML)
    pub context_lines: usize,
    /// HTML wrap width in characters
    pub wrap_width: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        let html = HtmlOptions::default();
        Self {
            context_lines: html.context,
            wrap_width: html.wrap_width,
        }
    }
}

/// Rendered difference for one scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Scene id
    pub scene_id: String,
    /// What happened to the scene
    pub status: DiffStatus,
    /// Unified diff of the pretty-printed definitions
    pub unified_diff: String,
    /// Side-by-side HTML table
    pub html_diff: String,
}

/// Classify and render every differing scene with default options
///
/// # Errors
/// Returns [`DiffError::MalformedScene`] before any rendering if either
/// dataset holds a non-object scene
pub fn compute_diffs(
    existing: &SceneDataset,
    incoming: &SceneDataset,
) -> Result<(DiffSummary, Vec<DiffEntry>), DiffError> {
    compute_diffs_with(existing, incoming, DiffOptions::default())
}

/// Classify and render every differing scene
///
/// Entries come out grouped added, removed, modified, each group sorted by
/// scene id. Unchanged scenes get no entry.
///
/// # Errors
/// See [`compute_diffs`]
pub fn compute_diffs_with(
    existing: &SceneDataset,
    incoming: &SceneDataset,
    options: DiffOptions,
) -> Result<(DiffSummary, Vec<DiffEntry>), DiffError> {
    let summary = classify(existing, incoming)?;

    let entries: Vec<DiffEntry> = summary
        .changes()
        .map(|(status, scene_id)| render_entry(scene_id, status, existing, incoming, options))
        .collect();

    tracing::debug!(
        added = summary.added.len(),
        removed = summary.removed.len(),
        modified = summary.modified.len(),
        unchanged = summary.unchanged.len(),
        "computed scene diff"
    );
    Ok((summary, entries))
}

fn render_entry(
    scene_id: &str,
    status: DiffStatus,
    existing: &SceneDataset,
    incoming: &SceneDataset,
    options: DiffOptions,
) -> DiffEntry {
    let old = to_pretty_lines(existing.get(scene_id));
    let new = to_pretty_lines(incoming.get(scene_id));
    let old_label = format!("{CURRENT_LABEL}/{scene_id}");
    let new_label = format!("{INCOMING_LABEL}/{scene_id}");

    DiffEntry {
        scene_id: scene_id.to_string(),
        status,
        unified_diff: unified_diff(&old, &new, &old_label, &new_label, options.context_lines),
        html_diff: html_table(
            &old,
            &new,
            &old_label,
            &new_label,
            HtmlOptions {
                context: options.context_lines,
                wrap_width: options.wrap_width,
            },
        ),
    }
}
