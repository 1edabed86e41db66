//! Pre-mutation snapshots
//!
//! Each snapshot is `<backup_dir>/<version_id>.json`, holding the dataset as
//! it was before a guarded write together with its [`VersionInfo`].

use crate::error::{Result, StoreError};
use crate::fs::{atomic_write, ensure_dir, read_optional};
use chrono::{DateTime, Utc};
use scene_artifact::{SceneDataset, VersionId, VersionInfo};
use scene_schema::{migrate, CURRENT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_EXTENSION: &str = "json";

/// One stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// Backup id (the snapshot's version id)
    pub id: String,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Version of the snapshotted dataset
    pub version: VersionInfo,
    /// Snapshot file
    pub path: PathBuf,
}

/// On-disk snapshot layout
#[derive(Debug, Serialize, Deserialize)]
struct BackupFile {
    created_at: DateTime<Utc>,
    version: VersionInfo,
    schema_version: i64,
    scenes: SceneDataset,
}

/// Directory of dataset snapshots
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    max_backups: Option<usize>,
}

impl BackupStore {
    /// Store rooted at `dir` with unlimited retention
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_backups: None,
        }
    }

    /// Keep only the newest `max` snapshots
    #[inline]
    #[must_use]
    pub fn with_max_backups(mut self, max: Option<usize>) -> Self {
        self.max_backups = max;
        self
    }

    /// Backup directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a snapshot of `scenes` at `version`, then apply retention
    ///
    /// Retention is best effort: snapshots it cannot read are left alone
    /// and logged, never failing the write.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the snapshot cannot be written
    pub fn snapshot(&self, scenes: &SceneDataset, version: &VersionInfo) -> Result<BackupEntry> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(&version.version_id);
        let file = BackupFile {
            created_at: Utc::now(),
            version: version.clone(),
            schema_version: CURRENT_SCHEMA_VERSION,
            scenes: scenes.clone(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|e| StoreError::corrupt(&path, e))?;
        atomic_write(&path, text.as_bytes())?;
        tracing::info!(backup = %version.version_id, path = %path.display(), "wrote dataset backup");

        let entry = BackupEntry {
            id: version.version_id.clone(),
            created_at: file.created_at,
            version: file.version,
            path,
        };
        self.prune();
        Ok(entry)
    }

    /// All snapshots, newest first
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] naming the first unreadable snapshot
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        for id in self.ids()? {
            let (_, entry) = self.load(&id)?;
            entries.push(entry);
        }
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    /// Load one snapshot's dataset and metadata
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if `id` is not a version id
    /// - [`StoreError::NotFound`] if no such snapshot exists
    /// - [`StoreError::Corrupt`] if the snapshot cannot be parsed
    pub fn load(&self, id: &str) -> Result<(SceneDataset, BackupEntry)> {
        id.parse::<VersionId>()?;
        let path = self.path_for(id);
        let text = read_optional(&path)?.ok_or_else(|| StoreError::not_found("backup", id))?;
        let file: BackupFile = serde_json::from_str(&text).map_err(|e| StoreError::corrupt(&path, e))?;
        let scenes = migrate(&file.scenes, Some(file.schema_version)).map_err(|e| StoreError::corrupt(&path, e))?;

        let entry = BackupEntry {
            id: id.to_string(),
            created_at: file.created_at,
            version: file.version,
            path,
        };
        Ok((scenes, entry))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{BACKUP_EXTENSION}"))
    }

    fn ids(&self) -> Result<Vec<String>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut ids = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if stem.parse::<VersionId>().is_ok() {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn prune(&self) {
        let Some(max) = self.max_backups else {
            return;
        };
        let ids = match self.ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "skipped backup retention");
                return;
            }
        };

        let mut entries = Vec::new();
        for id in ids {
            match self.load(&id) {
                Ok((_, entry)) => entries.push(entry),
                Err(e) => tracing::warn!(backup = %id, error = %e, "retention skipped unreadable backup"),
            }
        }
        sort_newest_first(&mut entries);

        for stale in entries.into_iter().skip(max) {
            match fs::remove_file(&stale.path) {
                Ok(()) => tracing::debug!(backup = %stale.id, "pruned dataset backup"),
                Err(e) => tracing::warn!(backup = %stale.id, error = %e, "failed to prune dataset backup"),
            }
        }
    }
}

fn sort_newest_first(entries: &mut [BackupEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scene_test_utils::{alpha_beta, alpha_gamma, fixed_timestamp, TempWorkspace};

    #[test]
    fn snapshot_then_load() {
        let ws = TempWorkspace::new();
        let store = BackupStore::new(ws.backups_dir());
        let version = VersionInfo::compute(&fixed_timestamp(), &alpha_beta());

        let entry = store.snapshot(&alpha_beta(), &version).unwrap();
        assert_eq!(entry.path, ws.backups_dir().join(format!("{}.json", version.version_id)));

        let (scenes, loaded) = store.load(&entry.id).unwrap();
        assert_eq!(scenes, alpha_beta());
        assert_eq!(loaded.version, version);
    }

    #[test]
    fn list_is_newest_first_and_retention_prunes() {
        let ws = TempWorkspace::new();
        let store = BackupStore::new(ws.backups_dir()).with_max_backups(Some(1));

        let older = VersionInfo::compute(&fixed_timestamp(), &alpha_beta());
        let newer = VersionInfo::compute(&(fixed_timestamp() + Duration::hours(1)), &alpha_gamma());
        store.snapshot(&alpha_beta(), &older).unwrap();
        store.snapshot(&alpha_gamma(), &newer).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, newer.version_id);
    }

    #[test]
    fn retention_skips_unreadable_snapshots() {
        let ws = TempWorkspace::new();
        std::fs::create_dir_all(ws.backups_dir()).unwrap();
        let corrupt = ws.backups_dir().join("20200101T000000Z-deadbeef.json");
        std::fs::write(&corrupt, "{").unwrap();

        let store = BackupStore::new(ws.backups_dir()).with_max_backups(Some(1));
        let older = VersionInfo::compute(&fixed_timestamp(), &alpha_beta());
        let newer = VersionInfo::compute(&(fixed_timestamp() + Duration::hours(1)), &alpha_gamma());
        store.snapshot(&alpha_beta(), &older).unwrap();
        let entry = store.snapshot(&alpha_gamma(), &newer).unwrap();

        assert!(corrupt.exists());
        assert!(entry.path.exists());
        assert!(!store.path_for(&older.version_id).exists());
        assert!(matches!(store.list(), Err(StoreError::Corrupt { path, .. }) if path == corrupt));
    }

    #[test]
    fn rejects_non_version_ids() {
        let ws = TempWorkspace::new();
        let store = BackupStore::new(ws.backups_dir());
        assert!(matches!(store.load("../scenes"), Err(StoreError::Validation(_))));
        assert!(matches!(
            store.load("20240101T000000Z-abcd1234"),
            Err(StoreError::NotFound { kind: "backup", .. })
        ));
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let ws = TempWorkspace::new();
        assert!(BackupStore::new(ws.backups_dir()).list().unwrap().is_empty());
    }
}
