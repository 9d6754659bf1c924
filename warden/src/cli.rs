//! Command-line arguments of the `warden` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use warden_engine::CleanupOptions;

#[derive(Debug, Parser)]
#[command(name = "warden")]
#[command(about = "Warden - ability store maintenance", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Delete orphaned abilities and abilities whose model is gone
    Clean(CleanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CleanArgs {
    /// Store file (TOML)
    #[arg(short, long)]
    pub store: PathBuf,

    /// Delete abilities no user or role holds
    #[arg(short, long)]
    pub orphaned: bool,

    /// Delete abilities bound to a model that no longer exists
    #[arg(short, long)]
    pub missing: bool,

    /// Tenant to clean, overriding the store's configured tenant
    #[arg(short, long)]
    pub tenant: Option<String>,

    /// Report without writing the store back
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanArgs {
    /// The passes to run. Giving neither flag runs both.
    pub fn options(&self) -> CleanupOptions {
        let options = CleanupOptions {
            orphaned: self.orphaned,
            missing: self.missing,
        };

        if options == CleanupOptions::default() {
            CleanupOptions::all()
        } else {
            options
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_args(args: &[&str]) -> CleanArgs {
        let mut argv = vec!["warden", "clean", "--store", "store.toml"];
        argv.extend_from_slice(args);

        let cli = Cli::try_parse_from(argv).expect("Failed to parse arguments");
        match cli.command {
            Commands::Clean(args) => args,
        }
    }

    #[test]
    fn test_no_flags_selects_both_passes() {
        assert_eq!(clean_args(&[]).options(), CleanupOptions::all());
    }

    #[test]
    fn test_single_pass_flags() {
        assert_eq!(
            clean_args(&["--orphaned"]).options(),
            CleanupOptions {
                orphaned: true,
                missing: false,
            }
        );
        assert_eq!(
            clean_args(&["-m"]).options(),
            CleanupOptions {
                orphaned: false,
                missing: true,
            }
        );
        assert_eq!(clean_args(&["-o", "-m"]).options(), CleanupOptions::all());
    }

    #[test]
    fn test_tenant_and_dry_run() {
        let args = clean_args(&["--tenant", "acme", "--dry-run"]);
        assert_eq!(args.tenant.as_deref(), Some("acme"));
        assert!(args.dry_run);
        assert_eq!(args.store, PathBuf::from("store.toml"));
    }

    #[test]
    fn test_store_is_required() {
        assert!(Cli::try_parse_from(["warden", "clean"]).is_err());
    }
}
