//! Testing utilities for the scene ledger workspace
//!
//! Shared fixtures and dataset builders.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use chrono::{DateTime, TimeZone, Utc};
use scene_artifact::SceneDataset;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 2024-01-01T00:00:00Z
pub fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn dataset(value: Value) -> SceneDataset {
    SceneDataset::from_value(value).unwrap()
}

/// Minimal valid scene with the given description
pub fn scene(description: &str) -> Value {
    json!({"description": description})
}

/// Scene with one choice leading to `target`
pub fn scene_with_choice(description: &str, command: &str, target: &str) -> Value {
    json!({
        "description": description,
        "choices": [{"command": command, "description": format!("Go to {target}")}],
        "transitions": {command: {"target": target}}
    })
}

/// `{alpha: A, beta: B}`
pub fn alpha_beta() -> SceneDataset {
    dataset(json!({"alpha": scene("A"), "beta": scene("B")}))
}

/// `{alpha: A, gamma: G}`
pub fn alpha_gamma() -> SceneDataset {
    dataset(json!({"alpha": scene("A"), "gamma": scene("G")}))
}

/// Dataset of `count` scenes named `scene_000`, `scene_001`, ...
pub fn numbered(count: usize) -> SceneDataset {
    (0..count)
        .map(|i| (format!("scene_{i:03}"), scene(&format!("Scene {i}"))))
        .collect()
}

/// Temporary directory holding a dataset file path (not yet created)
pub struct TempWorkspace {
    pub dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.path().join("scenes.json")
    }

    pub fn branches_dir(&self) -> PathBuf {
        self.path().join("branches")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.path().join("backups")
    }

    /// Write raw text to the dataset path
    pub fn write_dataset_text(&self, text: &str) -> PathBuf {
        let path = self.dataset_path();
        std::fs::write(&path, text).unwrap();
        path
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
