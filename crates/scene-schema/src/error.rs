//! Error types for the schema boundary
//!
//! Provides error handling for:
//! - Schema migration (legacy shape → current shape)
//! - Dataset document parsing (text → scenes)

use scene_artifact::{DatasetError, SceneError};

/// Errors while upgrading a dataset to the current schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Dataset claims a version newer than this build understands
    #[error("dataset from the future: schema version {version} is newer than {current}")]
    FutureVersion { version: i64, current: i64 },

    /// Schema versions start at 1
    #[error("invalid schema version {0}: versions start at 1")]
    InvalidVersion(i64),

    /// Version is in range but no migration path exists
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(i64),

    /// Scene definition is not an object
    #[error("scene '{scene_id}' must be a JSON object")]
    SceneNotObject { scene_id: String },

    /// A legacy field has an unexpected shape
    #[error("scene '{scene_id}' field '{field}': {message}")]
    InvalidField {
        scene_id: String,
        field: &'static str,
        message: String,
    },

    /// Two entries of a legacy field share a command
    #[error("scene '{scene_id}' field '{field}': duplicate command '{command}'")]
    DuplicateCommand {
        scene_id: String,
        field: &'static str,
        command: String,
    },

    /// Migrated scene does not match the narrative schema
    #[error("validation failed: {0}")]
    Scene(#[from] SceneError),
}

impl MigrationError {
    /// Create invalid field error
    pub fn invalid_field(
        scene_id: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            scene_id: scene_id.into(),
            field,
            message: message.into(),
        }
    }

    /// Scene id the error is about, if any
    #[must_use]
    pub fn scene_id(&self) -> Option<&str> {
        match self {
            Self::SceneNotObject { scene_id }
            | Self::InvalidField { scene_id, .. }
            | Self::DuplicateCommand { scene_id, .. }
            | Self::Scene(SceneError::NotAnObject { scene_id })
            | Self::Scene(SceneError::Invalid { scene_id, .. }) => Some(scene_id),
            _ => None,
        }
    }
}

/// Errors while reading a dataset document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Text is not valid JSON or has duplicate scene ids
    #[error("syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Envelope is missing its scenes
    #[error("document declares schema_version but has no 'scenes' object")]
    MissingScenes,

    /// Envelope has keys besides `schema_version` and `scenes`
    #[error("unexpected top-level key '{0}' in versioned document")]
    UnexpectedKey(String),

    /// Dataset shape error
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Migration or validation failed
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
