//! The `clean` command run against store files on disk.

use std::path::Path;

use clap::Parser;
use tempfile::NamedTempFile;
use warden::clean::{self, CleanOutcome};
use warden::cli::{CleanArgs, Cli, Commands};
use warden::{EngineError, StoreConfig, StoreError};

const STORE: &str = r#"
[[users]]
id = 1

[[abilities]]
id = 1
name = "ban-users"

[[abilities]]
id = 2
name = "throw-dishes"

[[abilities]]
id = 3
name = "update"
entity_type = "account"
entity_id = 1

[[abilities]]
id = 4
name = "update"
entity_type = "account"
entity_id = 2

[[permissions]]
ability_id = 2
authority = { kind = "user", id = 1 }

[[permissions]]
ability_id = 3
authority = { kind = "user", id = 1 }

[[permissions]]
ability_id = 4
authority = { kind = "user", id = 1 }

[entities]
account = [2]
"#;

const UNKNOWN_TYPE: &str = r#"
[[abilities]]
id = 5
name = "pay"
entity_type = "invoice"
entity_id = 9

[[permissions]]
ability_id = 5
authority = { kind = "user", id = 1 }
"#;

fn store_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create store file");
    std::fs::write(file.path(), content).expect("Failed to write store file");
    file
}

fn clean_args(path: &Path, flags: &[&str]) -> CleanArgs {
    let path = path.to_str().expect("Temp path is not UTF-8");
    let mut argv = vec!["warden", "clean", "--store", path];
    argv.extend_from_slice(flags);

    match Cli::try_parse_from(argv).expect("Failed to parse arguments").command {
        Commands::Clean(args) => args,
    }
}

fn run_clean(path: &Path, flags: &[&str]) -> CleanOutcome {
    clean::run(&clean_args(path, flags)).expect("Failed to run clean")
}

fn ability_ids(path: &Path) -> Vec<u64> {
    StoreConfig::from_file(path)
        .expect("Failed to reload store")
        .abilities
        .iter()
        .map(|a| a.id)
        .collect()
}

#[test]
fn test_no_flags_runs_both_passes_and_writes_back() {
    let file = store_file(STORE);

    let outcome = run_clean(file.path(), &[]);

    assert!(outcome.is_success());
    assert_eq!(
        outcome.lines,
        vec!["Deleted 1 orphaned ability.", "Deleted 1 ability with a missing model."]
    );
    assert_eq!(ability_ids(file.path()), vec![2, 4]);

    let again = run_clean(file.path(), &[]);
    assert_eq!(
        again.lines,
        vec!["No orphaned abilities.", "No abilities with missing models."]
    );
}

#[test]
fn test_orphaned_flag_runs_one_pass() {
    let file = store_file(STORE);

    let outcome = run_clean(file.path(), &["--orphaned"]);

    assert_eq!(outcome.lines, vec!["Deleted 1 orphaned ability."]);
    assert_eq!(ability_ids(file.path()), vec![2, 3, 4]);
}

#[test]
fn test_missing_flag_runs_one_pass() {
    let file = store_file(STORE);

    let outcome = run_clean(file.path(), &["--missing"]);

    assert_eq!(outcome.lines, vec!["Deleted 1 ability with a missing model."]);
    assert_eq!(ability_ids(file.path()), vec![1, 2, 4]);
}

#[test]
fn test_dry_run_leaves_the_file_unchanged() {
    let file = store_file(STORE);

    let outcome = run_clean(file.path(), &["--dry-run"]);

    assert_eq!(
        outcome.lines,
        vec![
            "Would delete 1 orphaned ability.",
            "Would delete 1 ability with a missing model.",
        ]
    );
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), STORE);
}

#[test]
fn test_unknown_entity_type_fails_only_the_missing_pass() {
    let file = store_file(&format!("{UNKNOWN_TYPE}{STORE}"));

    let outcome = run_clean(file.path(), &[]);

    assert!(!outcome.is_success());
    assert_eq!(outcome.lines, vec!["Deleted 1 orphaned ability."]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].pass, "missing");
    assert!(matches!(
        outcome.failures[0].error,
        EngineError::Store(StoreError::UnknownEntityType(ref t)) if t == "invoice"
    ));

    // The orphan is gone; the account ability survives the aborted pass.
    assert_eq!(ability_ids(file.path()), vec![2, 3, 4, 5]);
}

#[test]
fn test_unreadable_store_is_an_error() {
    let file = store_file("[[abilities]]\nid = \"not a number\"\n");

    assert!(clean::run(&clean_args(file.path(), &[])).is_err());
}
