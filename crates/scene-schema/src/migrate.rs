//! Schema migration
//!
//! Upgrades datasets written under older schema versions to the current
//! shape before anything else touches them. Steps run in ascending version
//! order, scenes in ascending id order, and the first failure aborts the
//! whole migration so callers never see a half-migrated dataset.
//!
//! Version 1 differs from version 2 in two fields:
//! - `transitions` was a list of `{command, ...}` objects; it is now an
//!   object keyed by command.
//! - `choices` was an object keyed by command; it is now a list of
//!   `{command, description, ...}` objects.

use crate::error::MigrationError;
use scene_artifact::SceneDataset;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Oldest schema version that can still be read
pub const LEGACY_SCHEMA_VERSION: i64 = 1;

/// Upgrades one scene from `from` to `from + 1`
type SceneStep = fn(&str, Map<String, Value>) -> Result<Map<String, Value>, MigrationError>;

/// Registered upgrade steps, keyed by the version they upgrade from
const STEPS: &[(i64, SceneStep)] = &[(1, upgrade_scene_v1)];

/// Migrate `dataset` to the current schema and validate every scene
///
/// `schema_version` of `None` means the dataset is already current. The
/// input is never mutated.
///
/// # Errors
/// - [`MigrationError::FutureVersion`] if the version is newer than current
/// - [`MigrationError::InvalidVersion`] if the version is below 1
/// - [`MigrationError::UnsupportedVersion`] if no upgrade path exists
/// - scene-level errors naming the offending scene id and field
pub fn migrate(
    dataset: &SceneDataset,
    schema_version: Option<i64>,
) -> Result<SceneDataset, MigrationError> {
    let version = schema_version.unwrap_or(CURRENT_SCHEMA_VERSION);
    check_version(version)?;

    let mut migrated = SceneDataset::new();
    for (scene_id, definition) in dataset.iter() {
        let Value::Object(scene) = definition else {
            return Err(MigrationError::SceneNotObject {
                scene_id: scene_id.to_string(),
            });
        };

        let mut scene = scene.clone();
        for from in version..CURRENT_SCHEMA_VERSION {
            let step = step_for(from).ok_or(MigrationError::UnsupportedVersion(version))?;
            scene = step(scene_id, scene)?;
        }
        migrated.insert(scene_id, Value::Object(scene));
    }

    migrated.validate()?;

    if version != CURRENT_SCHEMA_VERSION {
        tracing::debug!(
            from = version,
            to = CURRENT_SCHEMA_VERSION,
            scenes = migrated.len(),
            "migrated scene dataset"
        );
    }
    Ok(migrated)
}

fn check_version(version: i64) -> Result<(), MigrationError> {
    if version > CURRENT_SCHEMA_VERSION {
        return Err(MigrationError::FutureVersion {
            version,
            current: CURRENT_SCHEMA_VERSION,
        });
    }
    if version < LEGACY_SCHEMA_VERSION {
        return Err(MigrationError::InvalidVersion(version));
    }
    Ok(())
}

fn step_for(from: i64) -> Option<SceneStep> {
    STEPS
        .iter()
        .find(|(version, _)| *version == from)
        .map(|(_, step)| *step)
}

/// Upgrade one version-1 scene to version 2
///
/// Fields already in the version-2 shape are left alone.
///
/// # Errors
/// Returns an error naming the scene and field on malformed or duplicate
/// entries
pub fn upgrade_scene_v1(
    scene_id: &str,
    mut scene: Map<String, Value>,
) -> Result<Map<String, Value>, MigrationError> {
    if let Some(transitions) = scene.remove("transitions") {
        scene.insert(
            "transitions".to_string(),
            upgrade_transitions(scene_id, transitions)?,
        );
    }
    if let Some(choices) = scene.remove("choices") {
        scene.insert("choices".to_string(), upgrade_choices(scene_id, choices)?);
    }
    Ok(scene)
}

/// `[{command, ...}]` → `{command: {command, ...}}`
fn upgrade_transitions(scene_id: &str, transitions: Value) -> Result<Value, MigrationError> {
    const FIELD: &str = "transitions";

    let items = match transitions {
        Value::Array(items) => items,
        already @ Value::Object(_) => return Ok(already),
        other => {
            return Err(MigrationError::invalid_field(
                scene_id,
                FIELD,
                format!("expected a list, got {}", scene_artifact::json_kind(&other)),
            ))
        }
    };

    let mut keyed = Map::new();
    for (index, item) in items.into_iter().enumerate() {
        let command = item
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                MigrationError::invalid_field(
                    scene_id,
                    FIELD,
                    format!("entry {index} has no string 'command'"),
                )
            })?;

        if keyed.contains_key(&command) {
            return Err(MigrationError::DuplicateCommand {
                scene_id: scene_id.to_string(),
                field: FIELD,
                command,
            });
        }
        keyed.insert(command, item);
    }
    Ok(Value::Object(keyed))
}

/// `{command: {...} | scalar}` → `[{command, description, ...}]`
///
/// An object value keeps its own `command` if it has one; otherwise the key
/// is used. A non-object value becomes `{description: <text>}`.
fn upgrade_choices(scene_id: &str, choices: Value) -> Result<Value, MigrationError> {
    const FIELD: &str = "choices";

    let keyed = match choices {
        Value::Object(keyed) => keyed,
        already @ Value::Array(_) => return Ok(already),
        other => {
            return Err(MigrationError::invalid_field(
                scene_id,
                FIELD,
                format!("expected an object, got {}", scene_artifact::json_kind(&other)),
            ))
        }
    };

    let mut seen = BTreeSet::new();
    let mut list = Vec::with_capacity(keyed.len());
    for (key, value) in keyed {
        let mut choice = match value {
            Value::Object(fields) => fields,
            scalar => {
                let mut fields = Map::new();
                fields.insert("description".to_string(), Value::String(display_text(&scalar)));
                fields
            }
        };

        let command = match choice.get("command") {
            Some(Value::String(own)) => own.clone(),
            _ => key,
        };
        if !seen.insert(command.clone()) {
            return Err(MigrationError::DuplicateCommand {
                scene_id: scene_id.to_string(),
                field: FIELD,
                command,
            });
        }
        choice.insert("command".to_string(), Value::String(command));
        list.push(Value::Object(choice));
    }
    Ok(Value::Array(list))
}

/// Plain text of a scalar: strings unquoted, everything else as JSON
fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dataset(value: Value) -> SceneDataset {
        SceneDataset::from_value(value).unwrap()
    }

    #[test]
    fn current_version_passes_through() {
        let input = dataset(json!({
            "alpha": {"description": "A", "choices": [{"command": "go", "description": "Go"}]}
        }));
        assert_eq!(migrate(&input, None).unwrap(), input);
        assert_eq!(migrate(&input, Some(CURRENT_SCHEMA_VERSION)).unwrap(), input);
    }

    #[test]
    fn current_version_ignores_key_order() {
        let a: SceneDataset =
            serde_json::from_str(r#"{"alpha": {"transitions": {}, "description": "A"}}"#).unwrap();
        let migrated = migrate(&a, None).unwrap();
        assert_eq!(
            migrated.get("alpha"),
            Some(&json!({"description": "A", "transitions": {}}))
        );
    }

    #[test]
    fn future_version_fails() {
        let err = migrate(&SceneDataset::new(), Some(3)).unwrap_err();
        assert_eq!(err, MigrationError::FutureVersion { version: 3, current: 2 });
        assert!(err.to_string().contains("dataset from the future"));
    }

    #[test]
    fn version_below_one_fails() {
        assert_eq!(
            migrate(&SceneDataset::new(), Some(0)).unwrap_err(),
            MigrationError::InvalidVersion(0)
        );
        assert_eq!(
            migrate(&SceneDataset::new(), Some(-4)).unwrap_err(),
            MigrationError::InvalidVersion(-4)
        );
    }

    #[test]
    fn v1_transitions_become_keyed_map() {
        let input = dataset(json!({
            "hall": {
                "description": "Hall",
                "transitions": [
                    {"command": "north", "target": "tower"},
                    {"command": "south", "target": "gate"}
                ]
            }
        }));
        let out = migrate(&input, Some(1)).unwrap();
        assert_eq!(
            out.get("hall").unwrap()["transitions"],
            json!({
                "north": {"command": "north", "target": "tower"},
                "south": {"command": "south", "target": "gate"}
            })
        );
    }

    #[test]
    fn v1_duplicate_transition_command_fails() {
        let input = dataset(json!({
            "hall": {
                "description": "Hall",
                "transitions": [{"command": "north"}, {"command": "north"}]
            }
        }));
        let err = migrate(&input, Some(1)).unwrap_err();
        assert_eq!(
            err,
            MigrationError::DuplicateCommand {
                scene_id: "hall".to_string(),
                field: "transitions",
                command: "north".to_string(),
            }
        );
        assert_eq!(err.scene_id(), Some("hall"));
    }

    #[test]
    fn v1_transition_without_command_names_scene_and_field() {
        let input = dataset(json!({
            "hall": {"description": "Hall", "transitions": [{"target": "x"}]}
        }));
        let err = migrate(&input, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::InvalidField { ref scene_id, field: "transitions", .. } if scene_id == "hall"
        ));
    }

    #[test]
    fn v1_choices_become_list() {
        let input = dataset(json!({
            "hall": {
                "description": "Hall",
                "choices": {
                    "look": {"description": "Look around"},
                    "north": "Go north",
                    "wait": 3
                }
            }
        }));
        let out = migrate(&input, Some(1)).unwrap();
        assert_eq!(
            out.get("hall").unwrap()["choices"],
            json!([
                {"command": "look", "description": "Look around"},
                {"command": "north", "description": "Go north"},
                {"command": "wait", "description": "3"}
            ])
        );
    }

    #[test]
    fn v1_duplicate_choice_command_fails() {
        let input = dataset(json!({
            "hall": {
                "description": "Hall",
                "choices": {
                    "north": {"command": "south", "description": "Sneaky"},
                    "south": {"description": "Go south"}
                }
            }
        }));
        assert!(matches!(
            migrate(&input, Some(1)).unwrap_err(),
            MigrationError::DuplicateCommand { field: "choices", ref command, .. } if command == "south"
        ));
    }

    #[test]
    fn v1_already_current_fields_are_untouched() {
        let input = dataset(json!({
            "hall": {
                "description": "Hall",
                "choices": [{"command": "go", "description": "Go"}],
                "transitions": {"go": {"target": "x"}}
            }
        }));
        assert_eq!(migrate(&input, Some(1)).unwrap(), input);
    }

    #[test]
    fn non_object_scene_fails() {
        let input = dataset(json!({"hall": "nope"}));
        assert_eq!(
            migrate(&input, Some(1)).unwrap_err(),
            MigrationError::SceneNotObject {
                scene_id: "hall".to_string()
            }
        );
    }

    #[test]
    fn migrated_scenes_are_validated() {
        let input = dataset(json!({"hall": {"choices": {}}}));
        let err = migrate(&input, Some(1)).unwrap_err();
        assert!(matches!(err, MigrationError::Scene(_)));
        assert_eq!(err.scene_id(), Some("hall"));
    }

    #[test]
    fn input_is_not_mutated() {
        let input = dataset(json!({
            "hall": {"description": "Hall", "transitions": [{"command": "n"}]}
        }));
        let before = input.clone();
        let _ = migrate(&input, Some(1)).unwrap();
        assert_eq!(input, before);
    }
}
