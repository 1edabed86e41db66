//! Scene datasets
//!
//! A [`SceneDataset`] maps scene ids to untyped scene definitions, ordered by
//! id. It is the unit that gets checksummed, diffed, and persisted.

use crate::hash::Checksum;
use crate::scene::{Scene, SceneError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Mapping of scene id to scene definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneDataset(BTreeMap<String, Value>);

impl SceneDataset {
    /// Empty dataset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing mapping
    #[inline]
    #[must_use]
    pub fn from_map(scenes: BTreeMap<String, Value>) -> Self {
        Self(scenes)
    }

    /// Build from a JSON object
    ///
    /// # Errors
    /// Returns [`DatasetError::NotAnObject`] if `value` is not an object
    pub fn from_value(value: Value) -> Result<Self, DatasetError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(DatasetError::NotAnObject(json_kind(&other))),
        }
    }

    /// The dataset as a JSON object
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Checksum of the canonical form of the whole dataset
    #[must_use]
    pub fn checksum(&self) -> Checksum {
        Checksum::of_value(&self.to_value())
    }

    /// Scene definition by id
    #[inline]
    #[must_use]
    pub fn get(&self, scene_id: &str) -> Option<&Value> {
        self.0.get(scene_id)
    }

    /// Whether a scene exists
    #[inline]
    #[must_use]
    pub fn contains(&self, scene_id: &str) -> bool {
        self.0.contains_key(scene_id)
    }

    /// Insert or replace a scene, returning the previous definition
    #[inline]
    pub fn insert(&mut self, scene_id: impl Into<String>, definition: Value) -> Option<Value> {
        self.0.insert(scene_id.into(), definition)
    }

    /// Remove a scene, returning its definition
    #[inline]
    pub fn remove(&mut self, scene_id: &str) -> Option<Value> {
        self.0.remove(scene_id)
    }

    /// Scene ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(id, definition)` pairs in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of scenes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dataset has no scenes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying mapping
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    /// Consume into the underlying mapping
    #[inline]
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Parse every scene under the narrative schema
    ///
    /// Stops at the first invalid scene (in id order).
    ///
    /// # Errors
    /// Returns the [`SceneError`] of the first invalid scene
    pub fn validate(&self) -> Result<(), SceneError> {
        for (scene_id, definition) in self.iter() {
            Scene::parse(scene_id, definition)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Value)> for SceneDataset {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SceneDataset {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Name of a JSON value's kind, for error messages
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors building a dataset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    /// Top-level value is not an object
    #[error("scene dataset must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
