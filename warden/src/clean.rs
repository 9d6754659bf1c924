//! The `clean` command: cleanup passes over a store file.

use anyhow::Context;
use tracing::debug;
use warden_engine::{Cleanup, EngineError, Removed, Scope, TenantScope};
use warden_store::MemoryStore;

use crate::cli::CleanArgs;
use crate::report;

/// A cleanup pass that failed. Its deletions, if any, were not made.
#[derive(Debug)]
pub struct PassFailure {
    pub pass: &'static str,
    pub error: EngineError,
}

/// What a `clean` run printed and which passes failed.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub lines: Vec<String>,
    pub failures: Vec<PassFailure>,
}

impl CleanOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the requested passes over the store file at `args.store`.
///
/// The cleaned store is written back unless `args.dry_run` is set. A failing
/// pass is reported in the outcome rather than as an error, so the other
/// pass's line is still printed and its deletions still saved. Errors are
/// returned only for loading and saving the file.
pub fn run(args: &CleanArgs) -> anyhow::Result<CleanOutcome> {
    let path = args.store.as_path();
    let store = MemoryStore::from_file(path)
        .with_context(|| format!("Failed to load store from {}", path.display()))?;

    let settings = store.settings();
    let scope = Scope::from_tenant(args.tenant.clone().or_else(|| settings.tenant.clone()))
        .only_relations(settings.only_scope_relations);
    debug!(tenant = ?scope.value(), dry_run = args.dry_run, "cleaning ability store");

    let results = Cleanup::new(&store, &scope).run(args.options());

    let mut outcome = CleanOutcome::default();
    for (pass, result, line) in [
        ("orphaned", results.orphaned, report::orphaned as fn(Removed, bool) -> String),
        ("missing", results.missing, report::missing),
    ] {
        match result {
            Some(Ok(removed)) => outcome.lines.push(line(removed, args.dry_run)),
            Some(Err(error)) => outcome.failures.push(PassFailure { pass, error }),
            None => {}
        }
    }

    if !args.dry_run {
        store
            .to_config()
            .write_to(path)
            .with_context(|| format!("Failed to write store to {}", path.display()))?;
    }

    Ok(outcome)
}
