//! Optimistic concurrency for dataset writes
//!
//! Every mutation names the version it was computed against. If the stored
//! dataset has moved on, the write is refused with the authoritative
//! version and nothing is touched.
//!
//! ```text
//! load → VersionInfo ─┬─ expected ≠ current → VersionConflict
//!                     └─ ok → backup? → mutate → save → new VersionInfo
//! ```

use crate::backup::BackupStore;
use crate::error::{Result, StoreError};
use crate::repository::DatasetRepository;
use scene_artifact::{validate_scene_id, Scene, SceneDataset, VersionInfo};
use scene_schema::migrate;
use serde_json::Value;
use std::sync::Arc;

/// Guarded writer over a dataset repository
#[derive(Clone)]
pub struct ConcurrencyGuard {
    repository: Arc<dyn DatasetRepository>,
    backups: Option<BackupStore>,
}

impl std::fmt::Debug for ConcurrencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGuard")
            .field("backups", &self.backups)
            .finish_non_exhaustive()
    }
}

impl ConcurrencyGuard {
    /// Guard without automatic backups
    #[must_use]
    pub fn new(repository: Arc<dyn DatasetRepository>) -> Self {
        Self {
            repository,
            backups: None,
        }
    }

    /// Snapshot the dataset before every mutation
    #[must_use]
    pub fn with_backups(mut self, backups: BackupStore) -> Self {
        self.backups = Some(backups);
        self
    }

    /// Underlying repository
    #[inline]
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn DatasetRepository> {
        &self.repository
    }

    /// Version of the stored dataset
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be loaded
    pub fn current_version(&self) -> Result<VersionInfo> {
        Ok(self.repository.current()?.1)
    }

    /// Create or replace one scene
    ///
    /// The definition is validated before the dataset is read.
    ///
    /// # Errors
    /// - [`StoreError::Scene`] if the id is empty or the definition is invalid
    /// - [`StoreError::VersionConflict`] if `expected_version_id` is stale
    /// - I/O and corruption errors from the repository
    pub fn update(
        &self,
        scene_id: &str,
        definition: Value,
        expected_version_id: Option<&str>,
    ) -> Result<VersionInfo> {
        validate_scene_id(scene_id)?;
        Scene::parse(scene_id, &definition)?;

        self.mutate("update", expected_version_id, |scenes| {
            scenes.insert(scene_id, definition);
            Ok(())
        })
    }

    /// Remove one scene
    ///
    /// # Errors
    /// - [`StoreError::VersionConflict`] if `expected_version_id` is stale
    /// - [`StoreError::NotFound`] if the scene does not exist
    pub fn delete(&self, scene_id: &str, expected_version_id: Option<&str>) -> Result<VersionInfo> {
        self.mutate("delete", expected_version_id, |scenes| {
            scenes
                .remove(scene_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("scene", scene_id))
        })
    }

    /// Replace the whole dataset
    ///
    /// `scenes` is migrated from `schema_version` and validated first.
    ///
    /// # Errors
    /// - [`StoreError::Migration`] if `scenes` cannot be migrated
    /// - [`StoreError::VersionConflict`] if `expected_version_id` is stale
    pub fn restore(
        &self,
        scenes: &SceneDataset,
        schema_version: Option<i64>,
        expected_version_id: Option<&str>,
    ) -> Result<VersionInfo> {
        let replacement = migrate(scenes, schema_version)?;
        self.mutate("restore", expected_version_id, |current| {
            *current = replacement;
            Ok(())
        })
    }

    fn mutate(
        &self,
        operation: &'static str,
        expected_version_id: Option<&str>,
        apply: impl FnOnce(&mut SceneDataset) -> Result<()>,
    ) -> Result<VersionInfo> {
        let (mut scenes, current) = self.repository.current()?;

        if let Some(expected) = expected_version_id {
            if !current.matches(expected) {
                tracing::warn!(
                    operation,
                    expected,
                    current = %current.version_id,
                    "rejected stale write"
                );
                return Err(StoreError::VersionConflict {
                    current_version_id: current.version_id,
                });
            }
        }

        let before = scenes.clone();
        apply(&mut scenes)?;

        if let Some(backups) = &self.backups {
            backups.snapshot(&before, &current)?;
        }

        let saved_at = self.repository.save(&scenes)?;
        let version = VersionInfo::compute(&saved_at, &scenes);
        tracing::info!(
            operation,
            from = %current.version_id,
            to = %version.version_id,
            scenes = scenes.len(),
            "dataset updated"
        );
        Ok(version)
    }
}
