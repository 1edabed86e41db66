//! Store configuration
//!
//! Loaded from a TOML file, then overridden by environment variables:
//!
//! | variable                 | field         |
//! |--------------------------|---------------|
//! | `SCENE_LEDGER_DATASET`   | `dataset_path`|
//! | `SCENE_LEDGER_BRANCHES`  | `branch_root` |
//! | `SCENE_LEDGER_BACKUPS`   | `backup_dir` (also enables `auto_backup`) |

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`StoreConfig::dataset_path`]
pub const ENV_DATASET: &str = "SCENE_LEDGER_DATASET";
/// Environment variable overriding [`StoreConfig::branch_root`]
pub const ENV_BRANCHES: &str = "SCENE_LEDGER_BRANCHES";
/// Environment variable overriding [`StoreConfig::backup_dir`]
pub const ENV_BACKUPS: &str = "SCENE_LEDGER_BACKUPS";

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Dataset file
    pub dataset_path: PathBuf,
    /// Directory holding one file per branch
    pub branch_root: PathBuf,
    /// Directory for pre-mutation snapshots
    pub backup_dir: Option<PathBuf>,
    /// Snapshot the dataset before every guarded mutation
    pub auto_backup: bool,
    /// Keep at most this many snapshots (newest first)
    pub max_backups: Option<usize>,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With dataset file
    #[inline]
    #[must_use]
    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    /// With branch directory
    #[inline]
    #[must_use]
    pub fn with_branch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.branch_root = path.into();
        self
    }

    /// With backup directory; enables automatic backups
    #[inline]
    #[must_use]
    pub fn with_backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(path.into());
        self.auto_backup = true;
        self
    }

    /// With backup retention
    #[inline]
    #[must_use]
    pub fn with_max_backups(mut self, max: usize) -> Self {
        self.max_backups = Some(max);
        self
    }

    /// Backup directory, if automatic backups are on
    #[must_use]
    pub fn auto_backup_dir(&self) -> Option<&Path> {
        if self.auto_backup {
            self.backup_dir.as_deref()
        } else {
            None
        }
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] on malformed TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a TOML file (defaults when `path` is `None`) and apply
    /// environment overrides
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] if the named file is missing, cannot
    /// be read, or cannot be parsed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| StoreError::Config(format!("failed to read {}: {e}", path.display())))?;
                toml::from_str(&contents)
                    .map_err(|e| StoreError::Config(format!("failed to parse {}: {e}", path.display())))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `SCENE_LEDGER_*` overrides; blank values are ignored
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get(ENV_DATASET) {
            self.dataset_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_BRANCHES) {
            self.branch_root = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_BACKUPS) {
            self.backup_dir = Some(PathBuf::from(value));
            self.auto_backup = true;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("scenes.json"),
            branch_root: PathBuf::from("branches"),
            backup_dir: None,
            auto_backup: false,
            max_backups: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn parses_partial_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            dataset_path = "data/scenes.json"
            backup_dir = "data/backups"
            auto_backup = true
            max_backups = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("data/scenes.json"));
        assert_eq!(config.branch_root, PathBuf::from("branches"));
        assert_eq!(config.auto_backup_dir(), Some(Path::new("data/backups")));
        assert_eq!(config.max_backups, Some(5));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            StoreConfig::from_toml_str("datasetpath = \"x\""),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn backup_dir_without_flag_is_inert() {
        let config = StoreConfig::from_toml_str("backup_dir = \"b\"").unwrap();
        assert_eq!(config.auto_backup_dir(), None);
    }

    #[test]
    fn env_overrides_win_and_blanks_are_ignored() {
        let env: HashMap<&str, &str> = [
            (ENV_DATASET, "/srv/scenes.json"),
            (ENV_BRANCHES, "  "),
            (ENV_BACKUPS, "/srv/backups"),
        ]
        .into_iter()
        .collect();

        let mut config = StoreConfig::new().with_branch_root("custom");
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.dataset_path, PathBuf::from("/srv/scenes.json"));
        assert_eq!(config.branch_root, PathBuf::from("custom"));
        assert_eq!(config.auto_backup_dir(), Some(Path::new("/srv/backups")));
    }

    #[test]
    fn named_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        match StoreConfig::load(Some(&missing)) {
            Err(StoreError::Config(message)) => assert!(message.contains("absent.toml"), "{message}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn named_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene-ledger.toml");
        std::fs::write(&path, "max_backups = 4\n").unwrap();
        assert_eq!(StoreConfig::load(Some(&path)).unwrap().max_backups, Some(4));
    }
}
