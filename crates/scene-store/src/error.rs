//! Error types for the scene store
//!
//! Every fallible store operation returns [`StoreError`]. Lower-level errors
//! from the schema and diff crates convert with `?`.

use scene_artifact::{SceneError, VersionError};
use scene_diff::DiffError;
use scene_schema::{DocumentError, MigrationError};
use std::path::{Path, PathBuf};

/// Main store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Caller input rejected (bad id, empty name, bad definition)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller's expected version is stale
    #[error("version conflict: current version is {current_version_id}")]
    VersionConflict {
        /// Version the caller should re-fetch and retry against
        current_version_id: String,
    },

    /// Scene, branch, or backup does not exist
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// What was looked up
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Refusing to overwrite an existing record
    #[error("{kind} '{id}' already exists")]
    AlreadyExists {
        /// What was being created
        kind: &'static str,
        /// Identifier that collided
        id: String,
    },

    /// Filesystem failure
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Persisted file exists but cannot be parsed
    #[error("corrupt file {}: {message}", path.display())]
    Corrupt {
        /// Offending file
        path: PathBuf,
        /// Parse failure
        message: String,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Dataset failed migration or narrative validation
    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),

    /// Dataset document could not be parsed
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    /// Scene failed narrative validation
    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    /// Diff computation rejected a payload
    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),
}

impl StoreError {
    /// Check if error is retryable
    ///
    /// Only version conflicts qualify, and only after the caller re-fetches
    /// the current version.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Check if error was caused by caller input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Migration(_) | Self::Document(_) | Self::Scene(_) | Self::Diff(_)
        )
    }

    /// Create I/O error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create corrupt-file error for a path
    #[inline]
    pub fn corrupt(path: &Path, message: impl ToString) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create not-found error
    #[inline]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

impl From<VersionError> for StoreError {
    fn from(err: VersionError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
