//! Fiszki CLI - flashcards from the command line
//!
//! Categories and word pairs live in a local database and are kept in sync
//! with a Supabase project when one is configured.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::category::run_category;
use crate::commands::common::CliEnv;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::stats::run_stats;
use crate::commands::sync::run_sync;
use crate::commands::transfer::{run_export, run_import};
use crate::commands::word::run_word;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "fiszki=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    let resolve_env = || CliEnv::resolve(cli.db_path.clone(), cli.state_dir.clone(), profile);

    match cli.command {
        Commands::Category { command } => run_category(command, &resolve_env()?).await,
        Commands::Word { command } => run_word(command, &resolve_env()?).await,
        Commands::Export { category, output } => {
            run_export(&category, output.as_deref(), &resolve_env()?).await
        }
        Commands::Import { path } => run_import(path.as_deref(), &resolve_env()?).await,
        Commands::Stats { json } => run_stats(json, &resolve_env()?).await,
        Commands::Sync { command } => run_sync(command, &resolve_env()?).await,
        Commands::Auth { command } => run_auth(command, &resolve_env()?).await,
        Commands::Config { command } => run_config(command, profile),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}
