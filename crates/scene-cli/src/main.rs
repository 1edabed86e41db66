//! `scene-ledger`: operator CLI for versioned scene datasets
//!
//! Every command prints JSON on stdout; logs go to stderr.

mod commands;
mod logging;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::Output;
use scene_store::{SceneLedger, StoreConfig, StoreError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "scene-ledger.toml";

fn expect_arg() -> Arg {
    Arg::new("expect")
        .long("expect")
        .value_name("VERSION")
        .help("Refuse the write unless the dataset is at this version")
}

fn source_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("file")
                .help("Dataset document to roll back to")
                .required_unless_present("backup")
                .conflicts_with("backup"),
        )
        .arg(
            Arg::new("backup")
                .long("backup")
                .value_name("ID")
                .help("Roll back to a stored backup"),
        )
}

pub(crate) fn build_cli() -> Command {
    Command::new("scene-ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Versioned scene dataset storage")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: scene-ledger.toml if present)"),
        )
        .arg(
            Arg::new("dataset")
                .long("dataset")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Dataset file"),
        )
        .arg(
            Arg::new("branches")
                .long("branches")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Branch directory"),
        )
        .arg(
            Arg::new("backups")
                .long("backups")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Backup directory (enables automatic backups)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("version").about("Print the current dataset version"))
        .subcommand(
            Command::new("diff")
                .about("Diff a dataset document against the current dataset")
                .arg(Arg::new("incoming").required(true).help("Incoming dataset document"))
                .arg(
                    Arg::new("html")
                        .long("html")
                        .action(ArgAction::SetTrue)
                        .help("Include side-by-side HTML tables"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Show merge and replace import plans")
                .arg(Arg::new("incoming").required(true).help("Incoming dataset document")),
        )
        .subcommand(
            Command::new("migrate")
                .about("Migrate a dataset document to the current schema")
                .arg(Arg::new("file").required(true).help("Dataset document"))
                .arg(
                    Arg::new("schema-version")
                        .long("schema-version")
                        .value_parser(value_parser!(i64))
                        .help("Override the document's schema version"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Create or replace one scene")
                .arg(Arg::new("scene-id").required(true))
                .arg(Arg::new("definition").required(true).help("JSON file with the scene definition"))
                .arg(expect_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete one scene")
                .arg(Arg::new("scene-id").required(true))
                .arg(expect_arg()),
        )
        .subcommand(
            Command::new("branch")
                .about("Manage branches")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Create a branch from a dataset document")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("file").required(true).help("Dataset document"))
                        .arg(
                            Arg::new("expect-base")
                                .long("expect-base")
                                .value_name("VERSION")
                                .help("Version the branch is expected to be based on"),
                        )
                        .arg(
                            Arg::new("generated-at")
                                .long("generated-at")
                                .value_name("RFC3339")
                                .help("Timestamp for the branch version"),
                        ),
                )
                .subcommand(Command::new("list").about("List branches, newest first"))
                .subcommand(Command::new("show").arg(Arg::new("id").required(true)))
                .subcommand(Command::new("delete").arg(Arg::new("id").required(true))),
        )
        .subcommand(
            Command::new("rollback")
                .about("Plan or apply a rollback")
                .subcommand_required(true)
                .subcommand(source_args(Command::new("plan").about("Show what a rollback would change")))
                .subcommand(source_args(
                    Command::new("apply")
                        .about("Restore a dataset document or backup")
                        .arg(expect_arg()),
                )),
        )
        .subcommand(Command::new("backups").about("List stored backups, newest first"))
}

fn load_config(matches: &ArgMatches) -> Result<StoreConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StoreConfig::load(Some(path))?,
        None => {
            let implicit = Path::new(DEFAULT_CONFIG);
            StoreConfig::load(implicit.exists().then_some(implicit))?
        }
    };

    if let Some(path) = matches.get_one::<PathBuf>("dataset") {
        config.dataset_path.clone_from(path);
    }
    if let Some(path) = matches.get_one::<PathBuf>("branches") {
        config.branch_root.clone_from(path);
    }
    if let Some(path) = matches.get_one::<PathBuf>("backups") {
        config = config.with_backup_dir(path);
    }
    Ok(config)
}

pub(crate) fn dispatch(ledger: &SceneLedger, matches: &ArgMatches) -> Result<Output> {
    match matches.subcommand() {
        Some(("version", _)) => commands::version(ledger),
        Some(("diff", args)) => commands::diff(ledger, args),
        Some(("plan", args)) => commands::plan(ledger, args),
        Some(("migrate", args)) => commands::migrate(args),
        Some(("update", args)) => commands::update(ledger, args),
        Some(("delete", args)) => commands::delete(ledger, args),
        Some(("branch", args)) => commands::branch(ledger, args),
        Some(("rollback", args)) => commands::rollback(ledger, args),
        Some(("backups", _)) => commands::list_backups(ledger),
        _ => anyhow::bail!("no subcommand given"),
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    tracing::debug!(dataset = %config.dataset_path.display(), "loaded configuration");
    let ledger = SceneLedger::open(&config);

    match dispatch(&ledger, matches)? {
        Output::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Output::Text(text) => print!("{text}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    logging::init(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            // Stale writes get a distinct code so scripts can re-fetch and retry.
            let retryable = err.downcast_ref::<StoreError>().is_some_and(StoreError::is_retryable);
            ExitCode::from(if retryable { 2 } else { 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_test_utils::TempWorkspace;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn rollback_needs_exactly_one_source() {
        assert!(build_cli()
            .try_get_matches_from(["scene-ledger", "rollback", "plan"])
            .is_err());
        assert!(build_cli()
            .try_get_matches_from(["scene-ledger", "rollback", "plan", "x.json", "--backup", "id"])
            .is_err());
        assert!(build_cli()
            .try_get_matches_from(["scene-ledger", "rollback", "apply", "--backup", "id", "--expect", "v"])
            .is_ok());
    }

    #[test]
    fn flags_override_config() {
        let ws = TempWorkspace::new();
        let config_path = ws.path().join("scene-ledger.toml");
        std::fs::write(&config_path, "dataset_path = \"from-config.json\"\nbranch_root = \"cfg-branches\"\n").unwrap();
        let config_arg = config_path.to_string_lossy().into_owned();

        let matches = build_cli()
            .try_get_matches_from([
                "scene-ledger",
                "--config",
                config_arg.as_str(),
                "version",
                "--dataset",
                "/tmp/d.json",
                "--backups",
                "/tmp/b",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("/tmp/d.json"));
        assert_eq!(config.branch_root, PathBuf::from("cfg-branches"));
        assert!(config.auto_backup);
    }

    #[test]
    fn named_config_file_must_exist() {
        let matches = build_cli()
            .try_get_matches_from(["scene-ledger", "--config", "/nonexistent/scene-ledger.toml", "version"])
            .unwrap();
        let err = load_config(&matches).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Config(_))
        ));
    }
}
