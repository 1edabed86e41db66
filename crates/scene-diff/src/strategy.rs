//! Import strategies and plans
//!
//! Provides the [`ImportStrategy`] trait for turning a diff classification
//! into a change plan. Both strategies agree on new, updated, and unchanged
//! scenes; they differ only in what happens to scenes the incoming dataset
//! does not mention.

use crate::classify::{classify, DiffSummary};
use crate::error::DiffError;
use scene_artifact::SceneDataset;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Named import strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategyKind {
    /// Overlay incoming scenes; keep existing-only scenes
    Merge,
    /// Make the dataset exactly the incoming scenes
    Replace,
}

impl ImportStrategyKind {
    /// Every strategy, in plan output order
    pub const ALL: [Self; 2] = [Self::Merge, Self::Replace];

    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }

    /// Strategy implementation for this name
    #[must_use]
    pub fn strategy(self) -> &'static dyn ImportStrategy {
        match self {
            Self::Merge => &MergeStrategy,
            Self::Replace => &ReplaceStrategy,
        }
    }
}

impl Display for ImportStrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStrategyKind {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            _ => Err(DiffError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Change plan for importing one dataset over another
///
/// Id lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
    /// Strategy that produced this plan
    pub strategy: ImportStrategyKind,
    /// Scenes to create
    pub new_ids: Vec<String>,
    /// Scenes to overwrite
    pub updated_ids: Vec<String>,
    /// Scenes left as they are
    pub unchanged_ids: Vec<String>,
    /// Scenes to delete (always empty for merge)
    pub removed_ids: Vec<String>,
}

impl ImportPlan {
    /// Whether applying the plan would change anything
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.new_ids.is_empty() && self.updated_ids.is_empty() && self.removed_ids.is_empty()
    }

    /// Materialize the dataset this plan produces
    ///
    /// Starts from `existing`, drops `removed_ids`, and copies `new_ids` and
    /// `updated_ids` from `incoming`. Ids missing from `incoming` are skipped.
    #[must_use]
    pub fn apply(&self, existing: &SceneDataset, incoming: &SceneDataset) -> SceneDataset {
        let mut result = existing.clone();
        for scene_id in &self.removed_ids {
            result.remove(scene_id);
        }
        for scene_id in self.new_ids.iter().chain(&self.updated_ids) {
            if let Some(definition) = incoming.get(scene_id) {
                result.insert(scene_id.clone(), definition.clone());
            }
        }
        result
    }
}

/// Import strategy
///
/// Implementations must derive plans from the classification alone so that
/// plans and diffs for the same input pair always agree.
pub trait ImportStrategy: Send + Sync + fmt::Debug {
    /// Strategy name
    fn kind(&self) -> ImportStrategyKind;

    /// Scenes this strategy deletes
    fn removed_ids(&self, summary: &DiffSummary) -> Vec<String>;

    /// Build the plan for a classification
    fn plan(&self, summary: &DiffSummary) -> ImportPlan {
        ImportPlan {
            strategy: self.kind(),
            new_ids: summary.added.iter().cloned().collect(),
            updated_ids: summary.modified.iter().cloned().collect(),
            unchanged_ids: summary.unchanged.iter().cloned().collect(),
            removed_ids: self.removed_ids(summary),
        }
    }
}

/// Keep scenes the incoming dataset does not mention
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeStrategy;

impl ImportStrategy for MergeStrategy {
    fn kind(&self) -> ImportStrategyKind {
        ImportStrategyKind::Merge
    }

    fn removed_ids(&self, _summary: &DiffSummary) -> Vec<String> {
        Vec::new()
    }
}

/// Delete scenes the incoming dataset does not mention
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceStrategy;

impl ImportStrategy for ReplaceStrategy {
    fn kind(&self) -> ImportStrategyKind {
        ImportStrategyKind::Replace
    }

    fn removed_ids(&self, summary: &DiffSummary) -> Vec<String> {
        summary.removed.iter().cloned().collect()
    }
}

/// Plans for every strategy from an existing classification
#[must_use]
pub fn plans_for_summary(summary: &DiffSummary) -> Vec<ImportPlan> {
    ImportStrategyKind::ALL
        .into_iter()
        .map(|kind| kind.strategy().plan(summary))
        .collect()
}

/// Merge and replace plans for importing `incoming` over `existing`
///
/// # Errors
/// Returns [`DiffError::MalformedScene`] if either dataset holds a
/// non-object scene
pub fn compute_import_plans(
    existing: &SceneDataset,
    incoming: &SceneDataset,
) -> Result<Vec<ImportPlan>, DiffError> {
    let summary = classify(existing, incoming)?;
    Ok(plans_for_summary(&summary))
}
