//! Subcommand handlers
//!
//! Each handler returns the document to print so the binary stays a thin
//! shell around the store.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use scene_diff::{compute_diffs, compute_import_plans, DiffEntry};
use scene_schema::{render_document, DatasetDocument};
use scene_store::{BackupStore, DatasetRepository, NewBranch, RollbackPlan, SceneLedger};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Handler result
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Output {
    /// Pretty-printed JSON
    Json(Value),
    /// Raw text, printed as is
    Text(String),
}

fn to_json(value: impl serde::Serialize) -> Result<Output> {
    Ok(Output::Json(serde_json::to_value(value)?))
}

fn read_document(path: &str) -> Result<DatasetDocument> {
    let text = fs::read_to_string(Path::new(path)).with_context(|| format!("failed to read {path}"))?;
    DatasetDocument::parse(&text).with_context(|| format!("failed to parse {path}"))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .with_context(|| format!("missing argument <{name}>"))
}

fn expected_version(args: &ArgMatches) -> Option<&str> {
    args.get_one::<String>("expect").map(String::as_str)
}

fn entries_json(entries: &[DiffEntry], html: bool) -> Vec<Value> {
    entries
        .iter()
        .map(|entry| {
            let mut value = json!({
                "scene_id": entry.scene_id,
                "status": entry.status,
                "unified_diff": entry.unified_diff,
            });
            if html {
                value["html_diff"] = Value::String(entry.html_diff.clone());
            }
            value
        })
        .collect()
}

/// `version`
pub(crate) fn version(ledger: &SceneLedger) -> Result<Output> {
    to_json(ledger.guard.current_version()?)
}

/// `diff <incoming> [--html]`
pub(crate) fn diff(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    let incoming = read_document(required(args, "incoming")?)?.into_current()?;
    let (current, version) = ledger.guard.repository().current()?;
    let (summary, entries) = compute_diffs(&current, &incoming)?;

    Ok(Output::Json(json!({
        "current": version,
        "summary": summary,
        "entries": entries_json(&entries, args.get_flag("html")),
    })))
}

/// `plan <incoming>`
pub(crate) fn plan(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    let incoming = read_document(required(args, "incoming")?)?.into_current()?;
    let (current, version) = ledger.guard.repository().current()?;
    let plans = compute_import_plans(&current, &incoming)?;

    Ok(Output::Json(json!({
        "current": version,
        "plans": plans,
    })))
}

/// `migrate <file> [--schema-version N]`
pub(crate) fn migrate(args: &ArgMatches) -> Result<Output> {
    let mut document = read_document(required(args, "file")?)?;
    if let Some(version) = args.get_one::<i64>("schema-version") {
        document.schema_version = Some(*version);
    }
    Ok(Output::Text(render_document(&document.into_current()?)))
}

/// `update <scene-id> <definition> [--expect V]`
pub(crate) fn update(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    let scene_id = required(args, "scene-id")?;
    let path = required(args, "definition")?;
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let definition: Value = serde_json::from_str(&text).with_context(|| format!("failed to parse {path}"))?;

    to_json(ledger.guard.update(scene_id, definition, expected_version(args))?)
}

/// `delete <scene-id> [--expect V]`
pub(crate) fn delete(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    to_json(ledger.guard.delete(required(args, "scene-id")?, expected_version(args))?)
}

/// `branch create|list|show|delete`
pub(crate) fn branch(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    match args.subcommand() {
        Some(("create", args)) => {
            let document = read_document(required(args, "file")?)?;
            let mut request = NewBranch::new(required(args, "name")?.as_str(), document.scenes);
            request.schema_version = document.schema_version;
            if let Some(at) = args.get_one::<String>("generated-at") {
                request = request.with_generated_at(parse_timestamp(at)?);
            }
            if let Some(expected) = args.get_one::<String>("expect-base") {
                request = request.with_expected_base(expected.as_str());
            }
            let record = ledger.branches.create_branch(request)?;
            Ok(Output::Json(json!({
                "id": record.id,
                "name": record.name,
                "created_at": record.created_at,
                "base": record.plan.base,
                "target": record.plan.target,
                "base_version_matches": record.plan.base_version_matches,
                "summary": record.plan.summary,
            })))
        }
        Some(("list", _)) => {
            let branches: Vec<Value> = ledger
                .branches
                .list_branches()?
                .into_iter()
                .map(|record| {
                    json!({
                        "id": record.id,
                        "name": record.name,
                        "created_at": record.created_at,
                        "target": record.plan.target.version_id,
                        "changes": record.plan.summary.change_count(),
                    })
                })
                .collect();
            Ok(Output::Json(Value::Array(branches)))
        }
        Some(("show", args)) => to_json(ledger.branches.get_branch(required(args, "id")?)?),
        Some(("delete", args)) => {
            let id = required(args, "id")?;
            ledger.branches.delete_branch(id)?;
            Ok(Output::Json(json!({"deleted": id})))
        }
        _ => bail!("unknown branch subcommand"),
    }
}

/// `rollback plan|apply`
pub(crate) fn rollback(ledger: &SceneLedger, args: &ArgMatches) -> Result<Output> {
    match args.subcommand() {
        Some(("plan", args)) => to_json(rollback_plan(ledger, args)?),
        Some(("apply", args)) => {
            let plan = rollback_plan(ledger, args)?;
            let scenes = match args.get_one::<String>("backup") {
                Some(id) => backups(ledger)?.load(id)?.0,
                None => read_document(required(args, "file")?)?.into_current()?,
            };
            let expected = expected_version(args).unwrap_or(&plan.current.version_id);
            let version = ledger.guard.restore(&scenes, None, Some(expected))?;
            Ok(Output::Json(json!({
                "previous": plan.current,
                "current": version,
                "summary": plan.summary,
            })))
        }
        _ => bail!("unknown rollback subcommand"),
    }
}

/// `backups`
pub(crate) fn list_backups(ledger: &SceneLedger) -> Result<Output> {
    to_json(backups(ledger)?.list()?)
}

fn backups(ledger: &SceneLedger) -> Result<&BackupStore> {
    ledger
        .backups
        .as_ref()
        .context("no backup directory configured (set backup_dir or SCENE_LEDGER_BACKUPS)")
}

fn rollback_plan(ledger: &SceneLedger, args: &ArgMatches) -> Result<RollbackPlan> {
    if let Some(id) = args.get_one::<String>("backup") {
        return Ok(ledger.rollback.plan_from_backup(id)?);
    }
    let document = read_document(required(args, "file")?)?;
    Ok(ledger
        .rollback
        .plan_rollback(&document.scenes, document.schema_version, None)?)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("invalid RFC 3339 timestamp '{text}'"))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_cli;
    use pretty_assertions::assert_eq;
    use scene_store::{StoreConfig, StoreError};
    use scene_test_utils::{alpha_beta, TempWorkspace};

    struct Fixture {
        ws: TempWorkspace,
        ledger: SceneLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let ws = TempWorkspace::new();
            ws.write_dataset_text(&render_document(&alpha_beta()));
            let config = StoreConfig::new()
                .with_dataset_path(ws.dataset_path())
                .with_branch_root(ws.branches_dir())
                .with_backup_dir(ws.backups_dir());
            let ledger = SceneLedger::open(&config);
            Self { ws, ledger }
        }

        fn file(&self, name: &str, contents: &str) -> String {
            let path = self.ws.path().join(name);
            fs::write(&path, contents).unwrap();
            path.display().to_string()
        }

        fn run(&self, argv: &[&str]) -> Result<Output> {
            let matches = build_cli().try_get_matches_from(argv.iter().copied())?;
            crate::dispatch(&self.ledger, &matches)
        }

        fn json(&self, argv: &[&str]) -> Value {
            match self.run(argv).unwrap() {
                Output::Json(value) => value,
                Output::Text(text) => panic!("expected JSON, got {text}"),
            }
        }
    }

    #[test]
    fn diff_reports_scenario() {
        let fx = Fixture::new();
        let incoming = fx.file(
            "incoming.json",
            r#"{"alpha": {"description": "A"}, "gamma": {"description": "G"}}"#,
        );

        let out = fx.json(&["scene-ledger", "diff", &incoming]);
        assert_eq!(out["summary"]["added"], json!(["gamma"]));
        assert_eq!(out["summary"]["removed"], json!(["beta"]));
        assert!(out["entries"][0].get("html_diff").is_none());

        let out = fx.json(&["scene-ledger", "diff", "--html", &incoming]);
        assert!(out["entries"][0]["html_diff"].as_str().unwrap().contains("<table"));

        let out = fx.json(&["scene-ledger", "plan", &incoming]);
        assert_eq!(out["plans"][1]["removed_ids"], json!(["beta"]));
    }

    #[test]
    fn update_requires_current_version() {
        let fx = Fixture::new();
        let definition = fx.file("alpha.json", r#"{"description": "A2"}"#);

        let err = fx
            .run(&["scene-ledger", "update", "alpha", &definition, "--expect", "stale"])
            .unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some_and(StoreError::is_retryable));

        let current = fx.json(&["scene-ledger", "version"]);
        let expect = current["version_id"].as_str().unwrap();
        let next = fx.json(&["scene-ledger", "update", "alpha", &definition, "--expect", expect]);
        assert_ne!(next["checksum"], current["checksum"]);

        let backups = fx.json(&["scene-ledger", "backups"]);
        assert_eq!(backups[0]["id"], current["version_id"]);
    }

    #[test]
    fn migrate_prints_current_document() {
        let fx = Fixture::new();
        let legacy = fx.file(
            "legacy.json",
            r#"{"schema_version": 1, "scenes": {"a": {"description": "A", "choices": {"go": {"description": "Go"}}}}}"#,
        );
        let Output::Text(text) = fx.run(&["scene-ledger", "migrate", &legacy]).unwrap() else {
            panic!("expected text");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schema_version"], 2);
        assert_eq!(value["scenes"]["a"]["choices"][0]["command"], "go");
    }

    #[test]
    fn branch_lifecycle() {
        let fx = Fixture::new();
        let incoming = fx.file("b.json", r#"{"alpha": {"description": "A"}}"#);

        let created = fx.json(&["scene-ledger", "branch", "create", "Trim Beta", &incoming]);
        assert_eq!(created["id"], "trim-beta");

        let listed = fx.json(&["scene-ledger", "branch", "list"]);
        assert_eq!(listed[0]["changes"], 1);

        let shown = fx.json(&["scene-ledger", "branch", "show", "trim-beta"]);
        assert_eq!(shown["plan"]["summary"]["removed"], json!(["beta"]));

        fx.json(&["scene-ledger", "branch", "delete", "trim-beta"]);
        assert!(fx.run(&["scene-ledger", "branch", "show", "trim-beta"]).is_err());
    }

    #[test]
    fn rollback_from_backup() {
        let fx = Fixture::new();
        let original = fx.json(&["scene-ledger", "version"]);
        fx.json(&["scene-ledger", "delete", "beta"]);
        let id = original["version_id"].as_str().unwrap();

        let plan = fx.json(&["scene-ledger", "rollback", "plan", "--backup", id]);
        assert_eq!(plan["plan"]["new_ids"], json!(["beta"]));

        fx.json(&["scene-ledger", "rollback", "apply", "--backup", id]);
        let now = fx.json(&["scene-ledger", "version"]);
        assert_eq!(now["checksum"], original["checksum"]);
    }

    #[test]
    fn timestamps_must_be_rfc3339() {
        assert!(parse_timestamp("2024-01-01T00:00:00Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
