use proptest::prelude::*;
use scene_artifact::SceneDataset;
use scene_diff::{classify, compute_diffs, compute_import_plans, DiffStatus, ImportStrategyKind};
use scene_test_utils::{alpha_beta, alpha_gamma, dataset, numbered, scene, scene_with_choice};
use serde_json::json;
use std::collections::BTreeSet;

fn arb_dataset() -> impl Strategy<Value = SceneDataset> {
    prop::collection::btree_map("[a-f]{1,2}", "[A-C]{1,2}", 0..8).prop_map(|scenes| {
        scenes
            .into_iter()
            .map(|(id, text)| (id, json!({"description": text})))
            .collect()
    })
}

#[test]
fn alpha_beta_gamma_scenario() {
    let (summary, entries) = compute_diffs(&alpha_beta(), &alpha_gamma()).unwrap();
    assert_eq!(summary.added, BTreeSet::from(["gamma".to_string()]));
    assert_eq!(summary.removed, BTreeSet::from(["beta".to_string()]));
    assert!(summary.modified.is_empty());
    assert_eq!(summary.unchanged, BTreeSet::from(["alpha".to_string()]));

    let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![DiffStatus::Added, DiffStatus::Removed]);

    let plans = compute_import_plans(&alpha_beta(), &alpha_gamma()).unwrap();
    assert_eq!(plans[0].strategy, ImportStrategyKind::Merge);
    assert!(plans[0].removed_ids.is_empty());
    assert_eq!(plans[1].removed_ids, vec!["beta".to_string()]);
}

#[test]
fn retargeted_transition_is_a_modification() {
    let existing = dataset(json!({"a": scene_with_choice("A", "go", "b"), "b": scene("B")}));
    let incoming = dataset(json!({"a": scene_with_choice("A", "go", "c"), "b": scene("B")}));

    let (summary, entries) = compute_diffs(&existing, &incoming).unwrap();
    assert_eq!(summary.modified, BTreeSet::from(["a".to_string()]));
    assert_eq!(summary.unchanged, BTreeSet::from(["b".to_string()]));

    let diff = &entries[0].unified_diff;
    assert!(diff.starts_with("--- current/a\n+++ incoming/a\n"));
    assert!(diff.contains("-      \"target\": \"b\"\n"));
    assert!(diff.contains("+      \"target\": \"c\"\n"));
    assert!(diff.contains("-      \"description\": \"Go to b\"\n"));
}

#[test]
fn replace_plan_trims_a_shrunken_dataset() {
    let plans = compute_import_plans(&numbered(5), &numbered(3)).unwrap();

    let merge = &plans[0];
    let replace = &plans[1];
    assert!(merge.is_noop());
    assert_eq!(replace.removed_ids, vec!["scene_003".to_string(), "scene_004".to_string()]);
    assert_eq!(replace.unchanged_ids.len(), 3);
    assert_eq!(replace.apply(&numbered(5), &numbered(3)), numbered(3));
}

#[test]
fn malformed_scene_fails_before_rendering() {
    let bad = SceneDataset::from_value(json!({"alpha": [1, 2]})).unwrap();
    let err = compute_diffs(&alpha_beta(), &bad).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("incoming"));
    assert!(message.contains("alpha"));
}

proptest! {
    #[test]
    fn prop_summary_partitions_union(existing in arb_dataset(), incoming in arb_dataset()) {
        let summary = classify(&existing, &incoming).unwrap();
        let groups = [&summary.added, &summary.removed, &summary.modified, &summary.unchanged];

        let total: usize = groups.iter().map(|g| g.len()).sum();
        let union: BTreeSet<&String> = groups.iter().flat_map(|g| g.iter()).collect();
        prop_assert_eq!(total, union.len());

        let expected: BTreeSet<&str> = existing.ids().chain(incoming.ids()).collect();
        let actual: BTreeSet<&str> = union.into_iter().map(String::as_str).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_plans_agree_with_diff(existing in arb_dataset(), incoming in arb_dataset()) {
        let (summary, entries) = compute_diffs(&existing, &incoming).unwrap();
        let plans = compute_import_plans(&existing, &incoming).unwrap();

        for plan in &plans {
            prop_assert_eq!(&plan.new_ids, &summary.added.iter().cloned().collect::<Vec<_>>());
            prop_assert_eq!(&plan.updated_ids, &summary.modified.iter().cloned().collect::<Vec<_>>());
            prop_assert_eq!(&plan.unchanged_ids, &summary.unchanged.iter().cloned().collect::<Vec<_>>());
        }
        prop_assert_eq!(entries.len(), summary.change_count());

        // Replace lands exactly on the incoming dataset.
        prop_assert_eq!(plans[1].apply(&existing, &incoming), incoming.clone());
    }

    #[test]
    fn prop_self_diff_is_empty(dataset in arb_dataset()) {
        let (summary, entries) = compute_diffs(&dataset, &dataset).unwrap();
        prop_assert!(entries.is_empty());
        prop_assert!(summary.is_identical());
        prop_assert_eq!(summary.unchanged.len(), dataset.len());
    }
}
