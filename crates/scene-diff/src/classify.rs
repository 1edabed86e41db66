//! Scene classification
//!
//! Sorts the union of two datasets' scene ids into four disjoint sets by
//! comparing canonical forms scene by scene.

use crate::error::{DiffError, Side};
use scene_artifact::{json_kind, to_canonical_string, SceneDataset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Status of a scene that differs between two datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// Only in the incoming dataset
    Added,
    /// Only in the existing dataset
    Removed,
    /// In both, canonical forms differ
    Modified,
}

/// Order in which diff entries are grouped
///
/// Entries are listed added first, then removed, then modified; within a
/// group by ascending scene id.
pub const STATUS_ORDER: [DiffStatus; 3] = [DiffStatus::Added, DiffStatus::Removed, DiffStatus::Modified];

impl DiffStatus {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

impl Display for DiffStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition of `existing_ids ∪ incoming_ids`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Only in incoming
    pub added: BTreeSet<String>,
    /// Only in existing
    pub removed: BTreeSet<String>,
    /// In both, different
    pub modified: BTreeSet<String>,
    /// In both, canonically equal
    pub unchanged: BTreeSet<String>,
}

impl DiffSummary {
    /// Ids with the given status
    #[must_use]
    pub fn ids(&self, status: DiffStatus) -> &BTreeSet<String> {
        match status {
            DiffStatus::Added => &self.added,
            DiffStatus::Removed => &self.removed,
            DiffStatus::Modified => &self.modified,
        }
    }

    /// Whether the two datasets hold the same scenes
    #[inline]
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Number of ids that differ
    #[inline]
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Total number of ids across all four sets
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.change_count() + self.unchanged.len()
    }

    /// Non-unchanged ids in [`STATUS_ORDER`]
    pub fn changes(&self) -> impl Iterator<Item = (DiffStatus, &str)> {
        STATUS_ORDER
            .into_iter()
            .flat_map(move |status| self.ids(status).iter().map(move |id| (status, id.as_str())))
    }
}

/// Reject datasets containing non-object scenes
///
/// Runs over both sides before any comparison so a malformed payload never
/// yields a partial result.
///
/// # Errors
/// Returns [`DiffError::MalformedScene`] for the first offending scene,
/// existing side first
pub fn check_scenes(existing: &SceneDataset, incoming: &SceneDataset) -> Result<(), DiffError> {
    for (side, dataset) in [(Side::Existing, existing), (Side::Incoming, incoming)] {
        if let Some((scene_id, value)) = dataset.iter().find(|(_, v)| !v.is_object()) {
            return Err(DiffError::MalformedScene {
                side,
                scene_id: scene_id.to_string(),
                kind: json_kind(value),
            });
        }
    }
    Ok(())
}

/// Classify every scene id of two datasets
///
/// # Errors
/// Returns [`DiffError::MalformedScene`] if either dataset holds a
/// non-object scene
pub fn classify(existing: &SceneDataset, incoming: &SceneDataset) -> Result<DiffSummary, DiffError> {
    check_scenes(existing, incoming)?;

    let mut summary = DiffSummary::default();
    for (scene_id, current) in existing.iter() {
        match incoming.get(scene_id) {
            None => {
                summary.removed.insert(scene_id.to_string());
            }
            Some(next) if to_canonical_string(current) == to_canonical_string(next) => {
                summary.unchanged.insert(scene_id.to_string());
            }
            Some(_) => {
                summary.modified.insert(scene_id.to_string());
            }
        }
    }
    summary.added = incoming
        .ids()
        .filter(|id| !existing.contains(id))
        .map(str::to_owned)
        .collect();

    Ok(summary)
}
