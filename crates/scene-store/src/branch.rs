//! Named branches of the scene dataset
//!
//! A branch is a frozen candidate dataset plus the diff and import plans
//! computed against the dataset that was current when it was created.
//! Branches are written once and never overwritten.

use crate::error::{Result, StoreError};
use crate::fs::{atomic_create, ensure_dir, read_optional};
use crate::repository::DatasetRepository;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scene_artifact::{SceneDataset, VersionInfo};
use scene_diff::{compute_diffs, plans_for_summary, DiffEntry, DiffSummary, ImportPlan};
use scene_schema::migrate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BRANCH_EXTENSION: &str = "json";

/// Branch identifier for a display name
///
/// Lower-cases, collapses every run of characters outside `[a-z0-9]` into a
/// single hyphen, and trims hyphens from both ends. May return an empty
/// string.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Reject identifiers that are not already slugs
fn check_identifier(id: &str) -> Result<()> {
    if id.is_empty() || slugify(id) != id {
        return Err(StoreError::validation(format!("invalid branch identifier '{id}'")));
    }
    Ok(())
}

/// Diff and plans captured when a branch was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPlan {
    /// Dataset version the branch was compared against
    pub base: VersionInfo,
    /// Version of the branch's own scenes
    pub target: VersionInfo,
    /// Whether the caller's expected base matched (true when none given)
    pub base_version_matches: bool,
    /// Base version the caller expected
    pub expected_base_version: Option<String>,
    /// Scene classification, base vs. branch
    pub summary: DiffSummary,
    /// Per-scene renderings
    pub entries: Vec<DiffEntry>,
    /// Merge and replace plans
    pub plans: Vec<ImportPlan>,
}

/// One persisted branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Slug identifier
    pub id: String,
    /// Display name as given
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Diff and plans against the base
    pub plan: BranchPlan,
    /// Full scene snapshot (current schema)
    pub scenes: SceneDataset,
}

/// Request to create a branch
#[derive(Debug, Clone)]
pub struct NewBranch {
    /// Display name
    pub name: String,
    /// Candidate scenes
    pub scenes: SceneDataset,
    /// Schema version of `scenes` (current when `None`)
    pub schema_version: Option<i64>,
    /// Timestamp for the target version (now when `None`)
    pub generated_at: Option<DateTime<Utc>>,
    /// Base version the caller believes is current
    pub expected_base_version: Option<String>,
}

impl NewBranch {
    /// Request with defaults for every optional field
    #[must_use]
    pub fn new(name: impl Into<String>, scenes: SceneDataset) -> Self {
        Self {
            name: name.into(),
            scenes,
            schema_version: None,
            generated_at: None,
            expected_base_version: None,
        }
    }

    /// With schema version
    #[inline]
    #[must_use]
    pub fn with_schema_version(mut self, version: i64) -> Self {
        self.schema_version = Some(version);
        self
    }

    /// With target timestamp
    #[inline]
    #[must_use]
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// With expected base version
    #[inline]
    #[must_use]
    pub fn with_expected_base(mut self, version_id: impl Into<String>) -> Self {
        self.expected_base_version = Some(version_id.into());
        self
    }
}

/// Key-value storage for serialized branches
pub trait BranchBackend: Send + Sync {
    /// Store `contents` under `id` unless the id is taken
    ///
    /// Returns `false` if a branch with `id` already exists.
    ///
    /// # Errors
    /// Returns an error on storage failure
    fn create(&self, id: &str, contents: &str) -> Result<bool>;

    /// Contents stored under `id`
    ///
    /// # Errors
    /// Returns an error on storage failure
    fn read(&self, id: &str) -> Result<Option<String>>;

    /// Every stored id, ascending
    ///
    /// # Errors
    /// Returns an error on storage failure
    fn ids(&self) -> Result<Vec<String>>;

    /// Remove `id`, returning whether it existed
    ///
    /// # Errors
    /// Returns an error on storage failure
    fn remove(&self, id: &str) -> Result<bool>;

    /// Where `id` lives, for error messages
    fn location(&self, id: &str) -> PathBuf;
}

/// One `<id>.json` file per branch under a root directory
#[derive(Debug, Clone)]
pub struct FsBranchBackend {
    root: PathBuf,
}

impl FsBranchBackend {
    /// Backend rooted at `root` (created on first write)
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Branch directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BranchBackend for FsBranchBackend {
    fn create(&self, id: &str, contents: &str) -> Result<bool> {
        ensure_dir(&self.root)?;
        atomic_create(&self.location(id), contents.as_bytes())
    }

    fn read(&self, id: &str) -> Result<Option<String>> {
        read_optional(&self.location(id))
    }

    fn ids(&self) -> Result<Vec<String>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut ids = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry.map_err(|e| StoreError::io(&self.root, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BRANCH_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let path = self.location(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn location(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{BRANCH_EXTENSION}"))
    }
}

/// Branches held in memory
#[derive(Debug, Default)]
pub struct MemoryBranchBackend {
    branches: RwLock<BTreeMap<String, String>>,
}

impl MemoryBranchBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite stored contents directly
    pub fn put_raw(&self, id: &str, contents: &str) {
        self.branches.write().insert(id.to_string(), contents.to_string());
    }
}

impl BranchBackend for MemoryBranchBackend {
    fn create(&self, id: &str, contents: &str) -> Result<bool> {
        let mut branches = self.branches.write();
        if branches.contains_key(id) {
            return Ok(false);
        }
        branches.insert(id.to_string(), contents.to_string());
        Ok(true)
    }

    fn read(&self, id: &str) -> Result<Option<String>> {
        Ok(self.branches.read().get(id).cloned())
    }

    fn ids(&self) -> Result<Vec<String>> {
        Ok(self.branches.read().keys().cloned().collect())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.branches.write().remove(id).is_some())
    }

    fn location(&self, id: &str) -> PathBuf {
        PathBuf::from("memory").join(format!("{id}.{BRANCH_EXTENSION}"))
    }
}

/// Branch persistence over a dataset repository
#[derive(Clone)]
pub struct BranchStore {
    repository: Arc<dyn DatasetRepository>,
    backend: Arc<dyn BranchBackend>,
}

impl std::fmt::Debug for BranchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchStore").finish_non_exhaustive()
    }
}

impl BranchStore {
    /// Store comparing against `repository` and persisting to `backend`
    #[must_use]
    pub fn new(repository: Arc<dyn DatasetRepository>, backend: Arc<dyn BranchBackend>) -> Self {
        Self { repository, backend }
    }

    /// Diff `request.scenes` against the current dataset and persist the
    /// result as a new branch
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if the name yields an empty identifier
    /// - [`StoreError::Migration`] if the scenes cannot be migrated
    /// - [`StoreError::AlreadyExists`] if the identifier is taken
    pub fn create_branch(&self, request: NewBranch) -> Result<BranchRecord> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("branch name must not be empty"));
        }
        let id = slugify(name);
        if id.is_empty() {
            return Err(StoreError::validation(format!(
                "branch name '{name}' has no letters or digits"
            )));
        }

        let scenes = migrate(&request.scenes, request.schema_version)?;
        let (current, base) = self.repository.current()?;
        let (summary, entries) = compute_diffs(&current, &scenes)?;
        let plans = plans_for_summary(&summary);

        let target = VersionInfo::compute(&request.generated_at.unwrap_or_else(Utc::now), &scenes);
        let base_version_matches = request
            .expected_base_version
            .as_deref()
            .map_or(true, |expected| base.matches(expected));

        let record = BranchRecord {
            id: id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
            plan: BranchPlan {
                base,
                target,
                base_version_matches,
                expected_base_version: request.expected_base_version,
                summary,
                entries,
                plans,
            },
            scenes,
        };

        let contents = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::corrupt(&self.backend.location(&id), e))?;
        if !self.backend.create(&id, &contents)? {
            return Err(StoreError::AlreadyExists { kind: "branch", id });
        }

        if !base_version_matches {
            tracing::warn!(branch = %id, base = %record.plan.base, "branch created against a newer base than expected");
        }
        tracing::info!(
            branch = %id,
            target = %record.plan.target,
            changes = record.plan.summary.change_count(),
            "created branch"
        );
        Ok(record)
    }

    /// Every branch, newest first (ties by id)
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] naming the first unreadable branch
    pub fn list_branches(&self) -> Result<Vec<BranchRecord>> {
        let mut records = Vec::new();
        for id in self.backend.ids()? {
            if let Some(record) = self.read(&id)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Load one branch
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if `id` is not a slug
    /// - [`StoreError::NotFound`] if no such branch exists
    /// - [`StoreError::Corrupt`] if the branch cannot be parsed
    pub fn get_branch(&self, id: &str) -> Result<BranchRecord> {
        check_identifier(id)?;
        self.read(id)?.ok_or_else(|| StoreError::not_found("branch", id))
    }

    /// Delete one branch
    ///
    /// # Errors
    /// - [`StoreError::Validation`] if `id` is not a slug
    /// - [`StoreError::NotFound`] if no such branch exists
    pub fn delete_branch(&self, id: &str) -> Result<()> {
        check_identifier(id)?;
        if !self.backend.remove(id)? {
            return Err(StoreError::not_found("branch", id));
        }
        tracing::info!(branch = %id, "deleted branch");
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Option<BranchRecord>> {
        let Some(contents) = self.backend.read(id)? else {
            return Ok(None);
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::corrupt(&self.backend.location(id), e))
    }
}
