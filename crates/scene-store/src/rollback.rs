//! Read-only rollback planning
//!
//! Compares a candidate dataset (usually a backup) against the current one
//! and reports what restoring it would change. Nothing is written; applying
//! the plan goes through [`ConcurrencyGuard::restore`](crate::ConcurrencyGuard::restore).

use crate::backup::BackupStore;
use crate::error::{Result, StoreError};
use crate::repository::DatasetRepository;
use chrono::{DateTime, Utc};
use scene_artifact::{SceneDataset, VersionInfo};
use scene_diff::{compute_diffs, DiffEntry, DiffSummary, ImportPlan, ImportStrategy, ReplaceStrategy};
use scene_schema::migrate;
use serde::Serialize;
use std::sync::Arc;

/// What restoring a dataset would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackPlan {
    /// Version stored now
    pub current: VersionInfo,
    /// Version after the rollback
    pub target: VersionInfo,
    /// Classification, current vs. target
    pub summary: DiffSummary,
    /// Per-scene renderings
    pub entries: Vec<DiffEntry>,
    /// Replace plan turning current into target
    pub plan: ImportPlan,
}

/// Plans rollbacks against a repository
#[derive(Clone)]
pub struct RollbackPlanner {
    repository: Arc<dyn DatasetRepository>,
    backups: Option<BackupStore>,
}

impl std::fmt::Debug for RollbackPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackPlanner")
            .field("backups", &self.backups)
            .finish_non_exhaustive()
    }
}

impl RollbackPlanner {
    /// Planner without access to backups
    #[must_use]
    pub fn new(repository: Arc<dyn DatasetRepository>) -> Self {
        Self {
            repository,
            backups: None,
        }
    }

    /// Allow planning from stored backups
    #[must_use]
    pub fn with_backups(mut self, backups: BackupStore) -> Self {
        self.backups = Some(backups);
        self
    }

    /// Plan restoring `scenes`
    ///
    /// `scenes` is migrated from `schema_version` first. The target version
    /// is stamped with `generated_at` (now when `None`).
    ///
    /// # Errors
    /// - [`StoreError::Migration`] if `scenes` cannot be migrated
    /// - repository errors loading the current dataset
    pub fn plan_rollback(
        &self,
        scenes: &SceneDataset,
        schema_version: Option<i64>,
        generated_at: Option<DateTime<Utc>>,
    ) -> Result<RollbackPlan> {
        let target_scenes = migrate(scenes, schema_version)?;
        let (current_scenes, current) = self.repository.current()?;
        let (summary, entries) = compute_diffs(&current_scenes, &target_scenes)?;
        let plan = ReplaceStrategy.plan(&summary);
        let target = VersionInfo::compute(&generated_at.unwrap_or_else(Utc::now), &target_scenes);

        tracing::debug!(
            current = %current,
            target = %target,
            changes = summary.change_count(),
            "planned rollback"
        );
        Ok(RollbackPlan {
            current,
            target,
            summary,
            entries,
            plan,
        })
    }

    /// Plan restoring a stored backup
    ///
    /// The target keeps the backup's original version.
    ///
    /// # Errors
    /// - [`StoreError::Config`] if no backup store is configured
    /// - [`StoreError::NotFound`] / [`StoreError::Corrupt`] from the backup store
    pub fn plan_from_backup(&self, backup_id: &str) -> Result<RollbackPlan> {
        let backups = self
            .backups
            .as_ref()
            .ok_or_else(|| StoreError::Config("no backup directory configured".to_string()))?;
        let (scenes, entry) = backups.load(backup_id)?;
        self.plan_rollback(&scenes, None, Some(entry.version.generated_at))
    }
}
