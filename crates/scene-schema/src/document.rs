//! Dataset documents
//!
//! A document is the text form of a dataset, either a bare scene mapping
//! (implicitly current schema) or an envelope:
//!
//! ```json
//! {"schema_version": 1, "scenes": {"alpha": {"description": "A"}}}
//! ```
//!
//! The presence of `schema_version` is what marks the envelope form. Scene
//! ids must be unique in the raw text; later duplicates are not silently
//! dropped.

use crate::error::DocumentError;
use crate::migrate::{migrate, CURRENT_SCHEMA_VERSION};
use scene_artifact::{to_pretty_string, SceneDataset};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

const SCHEMA_VERSION_KEY: &str = "schema_version";
const SCENES_KEY: &str = "scenes";

/// A parsed, not yet migrated document
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDocument {
    /// Scenes as written
    pub scenes: SceneDataset,
    /// Declared schema version (`None` for bare mappings)
    pub schema_version: Option<i64>,
}

impl DatasetDocument {
    /// Parse document text
    ///
    /// # Errors
    /// - [`DocumentError::Syntax`] for invalid JSON or duplicate scene ids
    /// - [`DocumentError::MissingScenes`] / [`DocumentError::UnexpectedKey`]
    ///   for malformed envelopes
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument = serde_json::from_str(text)?;
        raw.into_document()
    }

    /// Migrate to the current schema and validate
    ///
    /// # Errors
    /// Returns [`DocumentError::Migration`] if migration or validation fails
    pub fn into_current(self) -> Result<SceneDataset, DocumentError> {
        Ok(migrate(&self.scenes, self.schema_version)?)
    }
}

/// Parse, migrate, and validate document text in one step
///
/// # Errors
/// See [`DatasetDocument::parse`] and [`DatasetDocument::into_current`]
pub fn load_document(text: &str) -> Result<SceneDataset, DocumentError> {
    DatasetDocument::parse(text)?.into_current()
}

/// Render a dataset as a versioned envelope (pretty, sorted keys)
#[must_use]
pub fn render_document(scenes: &SceneDataset) -> String {
    let mut envelope = Map::new();
    envelope.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(CURRENT_SCHEMA_VERSION));
    envelope.insert(SCENES_KEY.to_string(), scenes.to_value());
    format!("{}\n", to_pretty_string(&Value::Object(envelope)))
}

/// Top-level object with duplicate detection
struct RawDocument {
    schema_version: Option<Value>,
    entries: BTreeMap<String, Value>,
    scenes: Option<UniqueScenes>,
}

impl RawDocument {
    fn into_document(self) -> Result<DatasetDocument, DocumentError> {
        let Some(version) = self.schema_version else {
            // Bare mapping: a key named "scenes" is just another scene.
            let mut entries = self.entries;
            if let Some(scenes) = self.scenes {
                entries.insert(SCENES_KEY.to_string(), Value::Object(scenes.0.into_iter().collect()));
            }
            return Ok(DatasetDocument {
                scenes: SceneDataset::from_map(entries),
                schema_version: None,
            });
        };

        if let Some(key) = self.entries.into_keys().next() {
            return Err(DocumentError::UnexpectedKey(key));
        }
        let scenes = self.scenes.ok_or(DocumentError::MissingScenes)?;
        let schema_version = version.as_i64().ok_or_else(|| {
            DocumentError::Syntax(de::Error::custom(format!(
                "schema_version must be an integer, got {version}"
            )))
        })?;

        Ok(DatasetDocument {
            scenes: SceneDataset::from_map(scenes.0),
            schema_version: Some(schema_version),
        })
    }
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawDocumentVisitor;

        impl<'de> Visitor<'de> for RawDocumentVisitor {
            type Value = RawDocument;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a scene mapping or a {schema_version, scenes} object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut schema_version = None;
                let mut scenes = None;
                let mut entries = BTreeMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    let duplicate = match key.as_str() {
                        SCHEMA_VERSION_KEY => schema_version.replace(map.next_value()?).is_some(),
                        SCENES_KEY => scenes.replace(map.next_value::<UniqueScenes>()?).is_some(),
                        _ => {
                            let value = map.next_value::<Value>()?;
                            entries.insert(key.clone(), value).is_some()
                        }
                    };
                    if duplicate {
                        return Err(de::Error::custom(format!("duplicate key '{key}'")));
                    }
                }

                Ok(RawDocument {
                    schema_version,
                    entries,
                    scenes,
                })
            }
        }

        deserializer.deserialize_map(RawDocumentVisitor)
    }
}

/// Scene mapping that rejects repeated ids
struct UniqueScenes(BTreeMap<String, Value>);

impl<'de> Deserialize<'de> for UniqueScenes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UniqueScenesVisitor;

        impl<'de> Visitor<'de> for UniqueScenesVisitor {
            type Value = UniqueScenes;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object of scene definitions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scenes = BTreeMap::new();
                while let Some((scene_id, definition)) = map.next_entry::<String, Value>()? {
                    if scenes.contains_key(&scene_id) {
                        return Err(de::Error::custom(format!("duplicate scene id '{scene_id}'")));
                    }
                    scenes.insert(scene_id, definition);
                }
                Ok(UniqueScenes(scenes))
            }
        }

        deserializer.deserialize_map(UniqueScenesVisitor)
    }
}
