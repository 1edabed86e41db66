//! Narrative scene model
//!
//! Datasets carry scenes as untyped JSON; [`Scene`] is the strongly typed
//! view every stored definition must parse into. Fields the model does not
//! name are kept in `extra` so parsing never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A named node in the narrative graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Text shown when the scene is entered
    pub description: String,

    /// Player-facing options, in display order
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Outcomes keyed by the command that triggers them
    #[serde(default)]
    pub transitions: BTreeMap<String, Transition>,

    /// Any other scene fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One selectable option in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Command the player issues
    pub command: String,
    /// Label shown for the option
    pub description: String,
    /// Any other choice fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of a command; an arbitrary object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transition(pub Map<String, Value>);

impl Transition {
    /// Look up a field of the transition
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl Scene {
    /// Parse a stored definition under the narrative schema
    ///
    /// # Errors
    /// - [`SceneError::EmptyId`] if `scene_id` is empty
    /// - [`SceneError::NotAnObject`] if `definition` is not a JSON object
    /// - [`SceneError::Invalid`] if the object does not match the schema
    pub fn parse(scene_id: &str, definition: &Value) -> Result<Self, SceneError> {
        validate_scene_id(scene_id)?;
        if !definition.is_object() {
            return Err(SceneError::NotAnObject {
                scene_id: scene_id.to_string(),
            });
        }
        Self::deserialize(definition).map_err(|e| SceneError::Invalid {
            scene_id: scene_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Look up a choice by command
    #[must_use]
    pub fn choice(&self, command: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.command == command)
    }
}

/// Reject ids that cannot name a scene
///
/// # Errors
/// Returns [`SceneError::EmptyId`] for an empty or all-whitespace id
pub fn validate_scene_id(scene_id: &str) -> Result<(), SceneError> {
    if scene_id.trim().is_empty() {
        return Err(SceneError::EmptyId);
    }
    Ok(())
}

/// Errors validating a scene definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// Scene id is empty
    #[error("scene id must not be empty")]
    EmptyId,

    /// Definition is not a JSON object
    #[error("scene '{scene_id}' must be a JSON object")]
    NotAnObject { scene_id: String },

    /// Definition does not match the narrative schema
    #[error("scene '{scene_id}' is invalid: {message}")]
    Invalid { scene_id: String, message: String },
}
