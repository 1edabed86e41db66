//! Dataset repositories
//!
//! A repository hands out the current dataset together with the timestamp
//! that stamps its version, and persists replacements.

use crate::error::{Result, StoreError};
use crate::fs::{atomic_write, read_optional};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use scene_artifact::{SceneDataset, VersionInfo};
use scene_schema::{load_document, render_document};
use std::fs;
use std::path::{Path, PathBuf};

/// Source of truth for the scene dataset
pub trait DatasetRepository: Send + Sync {
    /// Current dataset and its timestamp
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be read or parsed
    fn load(&self) -> Result<(SceneDataset, DateTime<Utc>)>;

    /// Replace the dataset, returning the new timestamp
    ///
    /// # Errors
    /// Returns an error if the dataset cannot be written; the previous
    /// dataset is left intact
    fn save(&self, scenes: &SceneDataset) -> Result<DateTime<Utc>>;

    /// Current dataset and its version
    ///
    /// # Errors
    /// See [`DatasetRepository::load`]
    fn current(&self) -> Result<(SceneDataset, VersionInfo)> {
        let (scenes, loaded_at) = self.load()?;
        let version = VersionInfo::compute(&loaded_at, &scenes);
        tracing::debug!(version = %version, scenes = scenes.len(), "computed current version");
        Ok((scenes, version))
    }
}

/// Dataset stored as one JSON document on disk
///
/// The timestamp is the file's modification time. A missing file reads as
/// an empty dataset stamped at the Unix epoch.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Repository over `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Dataset file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Result<DateTime<Utc>> {
        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}

impl DatasetRepository for JsonFileRepository {
    fn load(&self) -> Result<(SceneDataset, DateTime<Utc>)> {
        let Some(text) = read_optional(&self.path)? else {
            tracing::debug!(path = %self.path.display(), "dataset file absent, starting empty");
            return Ok((SceneDataset::new(), DateTime::<Utc>::UNIX_EPOCH));
        };
        let scenes = load_document(&text).map_err(|e| StoreError::corrupt(&self.path, e))?;
        Ok((scenes, self.modified()?))
    }

    fn save(&self, scenes: &SceneDataset) -> Result<DateTime<Utc>> {
        atomic_write(&self.path, render_document(scenes).as_bytes())?;
        let saved_at = self.modified()?;
        tracing::debug!(path = %self.path.display(), scenes = scenes.len(), "saved dataset");
        Ok(saved_at)
    }
}

/// Dataset held in memory with a caller-controlled clock
#[derive(Debug)]
pub struct InMemoryRepository {
    state: RwLock<(SceneDataset, DateTime<Utc>)>,
    clock: RwLock<Option<DateTime<Utc>>>,
}

impl InMemoryRepository {
    /// Repository holding `scenes` stamped at `timestamp`
    #[must_use]
    pub fn new(scenes: SceneDataset, timestamp: DateTime<Utc>) -> Self {
        Self {
            state: RwLock::new((scenes, timestamp)),
            clock: RwLock::new(None),
        }
    }

    /// Fix the timestamp that later saves report (defaults to now)
    pub fn set_clock<Tz: TimeZone>(&self, at: &DateTime<Tz>) {
        *self.clock.write() = Some(at.with_timezone(&Utc));
    }

    /// Snapshot of the stored dataset
    #[must_use]
    pub fn scenes(&self) -> SceneDataset {
        self.state.read().0.clone()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new(SceneDataset::new(), DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl DatasetRepository for InMemoryRepository {
    fn load(&self) -> Result<(SceneDataset, DateTime<Utc>)> {
        Ok(self.state.read().clone())
    }

    fn save(&self, scenes: &SceneDataset) -> Result<DateTime<Utc>> {
        let saved_at = self.clock.read().unwrap_or_else(Utc::now);
        *self.state.write() = (scenes.clone(), saved_at);
        Ok(saved_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_test_utils::{alpha_beta, fixed_timestamp, TempWorkspace};

    #[test]
    fn file_round_trip_keeps_scenes() {
        let ws = TempWorkspace::new();
        let repo = JsonFileRepository::new(ws.dataset_path());
        repo.save(&alpha_beta()).unwrap();

        let (scenes, _) = repo.load().unwrap();
        assert_eq!(scenes, alpha_beta());

        let text = fs::read_to_string(ws.dataset_path()).unwrap();
        assert!(text.starts_with("{\n  \"scenes\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn missing_file_is_empty_at_epoch() {
        let ws = TempWorkspace::new();
        let (scenes, at) = JsonFileRepository::new(ws.dataset_path()).load().unwrap();
        assert!(scenes.is_empty());
        assert_eq!(at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn legacy_bare_file_is_migrated_on_load() {
        let ws = TempWorkspace::new();
        ws.write_dataset_text(
            r#"{"schema_version": 1, "scenes": {"a": {"description": "A", "choices": {"go": "Go"}}}}"#,
        );
        let (scenes, _) = JsonFileRepository::new(ws.dataset_path()).load().unwrap();
        assert_eq!(
            scenes.get("a").unwrap()["choices"],
            serde_json::json!([{"command": "go", "description": "Go"}])
        );
    }

    #[test]
    fn corrupt_file_names_its_path() {
        let ws = TempWorkspace::new();
        let path = ws.write_dataset_text("{not json");
        let err = JsonFileRepository::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { path: ref p, .. } if p == &path));
    }

    #[test]
    fn memory_repository_uses_its_clock() {
        let repo = InMemoryRepository::default();
        repo.set_clock(&fixed_timestamp());
        assert_eq!(repo.save(&alpha_beta()).unwrap(), fixed_timestamp());
        assert_eq!(repo.load().unwrap(), (alpha_beta(), fixed_timestamp()));
    }
}
