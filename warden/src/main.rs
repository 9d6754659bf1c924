// Operator tooling for Warden ability stores

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use warden::clean;
use warden::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Clean(args) => {
            let outcome = clean::run(&args)?;

            for line in &outcome.lines {
                println!("{line}");
            }
            for failure in &outcome.failures {
                error!(pass = failure.pass, error = %failure.error, "cleanup pass failed");
            }

            if !outcome.is_success() {
                anyhow::bail!("{} cleanup pass(es) failed", outcome.failures.len());
            }
        }
    }

    Ok(())
}
