//! Scene Artifact
//!
//! Scene datasets and the primitives that identify their states.
//!
//! # Core Concepts
//!
//! - [`SceneDataset`]: Mapping of scene id to untyped scene definition
//! - [`Scene`]: Strongly typed narrative view of one definition
//! - [`Checksum`]: SHA-256 of a dataset's canonical JSON form
//! - [`VersionInfo`]: `<UTC timestamp>-<checksum prefix>` version token
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_artifact::{SceneDataset, VersionInfo};
//!
//! let dataset: SceneDataset = serde_json::from_str(r#"{"alpha": {"description": "A"}}"#)?;
//! let version = VersionInfo::compute(&chrono::Utc::now(), &dataset);
//! println!("{}", version.version_id);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod canon;
mod dataset;
mod hash;
mod scene;
mod version;

pub use canon::{canonicalize, to_canonical_string, to_pretty_lines, to_pretty_string};
pub use dataset::{json_kind, DatasetError, SceneDataset};
pub use hash::{Checksum, HashError, SHORT_LEN};
pub use scene::{validate_scene_id, Choice, Scene, SceneError, Transition};
pub use version::{format_version_id, VersionError, VersionId, VersionInfo, VERSION_TIMESTAMP_FORMAT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    #[test]
    fn dataset_version_lifecycle() {
        let mut dataset = SceneDataset::from_value(json!({
            "alpha": {"description": "A"},
            "beta": {"description": "B"}
        }))
        .unwrap();
        dataset.validate().unwrap();

        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let before = VersionInfo::compute(&ts, &dataset);

        dataset.insert("beta", json!({"description": "B2"}));
        let after = VersionInfo::compute(&ts, &dataset);

        assert_ne!(before.checksum, after.checksum);
        assert_ne!(before.version_id, after.version_id);

        let parsed: VersionId = after.version_id.parse().unwrap();
        assert!(parsed.names_checksum(&after.checksum));
        assert_eq!(parsed.timestamp(), ts);
    }

    fn shuffled(map: &Map<String, Value>, rotate: usize) -> String {
        let mut entries: Vec<_> = map.iter().collect();
        let len = entries.len().max(1);
        entries.rotate_left(rotate % len);
        let body: Vec<String> = entries
            .iter()
            .map(|(k, v)| format!("{}:{}", Value::String((*k).clone()), v))
            .collect();
        format!("{{{}}}", body.join(","))
    }

    proptest! {
        #[test]
        fn prop_checksum_independent_of_key_order(
            entries in prop::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 1..8),
            rotate in 0usize..8,
        ) {
            let map: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, json!({"description": v})))
                .collect();
            let original = Value::Object(map.clone());
            let reordered: Value = serde_json::from_str(&shuffled(&map, rotate)).unwrap();
            prop_assert_eq!(Checksum::of_value(&original), Checksum::of_value(&reordered));
        }

        #[test]
        fn prop_checksum_sensitive_to_values(text in "[ -~]{0,16}", suffix in "[ -~]{1,4}") {
            let a = json!({"alpha": {"description": text.clone()}});
            let b = json!({"alpha": {"description": format!("{text}{suffix}")}});
            prop_assert_ne!(Checksum::of_value(&a), Checksum::of_value(&b));
        }
    }
}
