//! Scene Store
//!
//! Versioned persistence for scene datasets. Writes are guarded by version
//! tokens; candidate datasets can be parked as branches or compared against
//! backups before being restored.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ConcurrencyGuard   BranchStore   Rollback  │
//! │        │                 │           │      │
//! │        ├── BackupStore   BranchBackend      │
//! │        ▼                 ▼           ▼      │
//! │            DatasetRepository (trait)        │
//! │       JsonFileRepository │ InMemory...      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_store::{ConcurrencyGuard, JsonFileRepository};
//! use std::sync::Arc;
//!
//! let guard = ConcurrencyGuard::new(Arc::new(JsonFileRepository::new("scenes.json")));
//! let current = guard.current_version()?;
//! guard.update("alpha", definition, Some(&current.version_id))?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backup;
pub mod branch;
pub mod config;
pub mod error;
mod fs;
pub mod guard;
pub mod repository;
pub mod rollback;

pub use backup::{BackupEntry, BackupStore};
pub use branch::{
    slugify, BranchBackend, BranchPlan, BranchRecord, BranchStore, FsBranchBackend, MemoryBranchBackend,
    NewBranch,
};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use guard::ConcurrencyGuard;
pub use repository::{DatasetRepository, InMemoryRepository, JsonFileRepository};
pub use rollback::{RollbackPlan, RollbackPlanner};

use std::sync::Arc;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Every store component wired from one configuration
#[derive(Debug, Clone)]
pub struct SceneLedger {
    /// Guarded writer
    pub guard: ConcurrencyGuard,
    /// Branch persistence
    pub branches: BranchStore,
    /// Rollback planning
    pub rollback: RollbackPlanner,
    /// Snapshot store, when a backup directory is configured
    pub backups: Option<BackupStore>,
}

impl SceneLedger {
    /// File-backed components from `config`
    #[must_use]
    pub fn open(config: &StoreConfig) -> Self {
        let repository: Arc<dyn DatasetRepository> = Arc::new(JsonFileRepository::new(&config.dataset_path));
        let backend: Arc<dyn BranchBackend> = Arc::new(FsBranchBackend::new(&config.branch_root));
        let backups = config
            .backup_dir
            .as_ref()
            .map(|dir| BackupStore::new(dir).with_max_backups(config.max_backups));

        let mut guard = ConcurrencyGuard::new(repository.clone());
        if let Some(dir) = config.auto_backup_dir() {
            guard = guard.with_backups(BackupStore::new(dir).with_max_backups(config.max_backups));
        } else if config.auto_backup {
            tracing::warn!("auto_backup is set without a backup_dir; skipping automatic backups");
        }
        let mut rollback = RollbackPlanner::new(repository.clone());
        if let Some(store) = &backups {
            rollback = rollback.with_backups(store.clone());
        }

        Self {
            guard,
            branches: BranchStore::new(repository, backend),
            rollback,
            backups,
        }
    }
}
