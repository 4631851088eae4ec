//! Nook CLI - keep the local Nook cache in sync with the cloud
//!
//! One-shot push/pull/sync commands plus a `watch` loop for unattended use.

mod cli;
mod commands;
mod config;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::{run_config_init, run_config_path, run_config_show};
use crate::commands::delete::run_delete;
use crate::commands::generate::run_generate;
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, SyncDirection};
use crate::commands::watch::run_watch;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: tracing_subscriber::filter::Directive = "nook=info"
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let config_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }
    let config = CliConfig::load(&config_path)?;

    match cli.command {
        Commands::Push => run_sync(SyncDirection::Push, &config, &db_path).await?,
        Commands::Pull => run_sync(SyncDirection::Pull, &config, &db_path).await?,
        Commands::Sync => run_sync(SyncDirection::Full, &config, &db_path).await?,
        Commands::Generate {
            date,
            collection,
            dry_run,
            json,
        } => run_generate(&collection, date, dry_run, json, &db_path).await?,
        Commands::Watch { interval, no_live } => {
            run_watch(&config, interval, !no_live, &db_path).await?;
        }
        Commands::Status { json } => run_status(&config, json, &db_path).await?,
        Commands::Delete { collection, id } => {
            run_delete(&collection, &id, &config, &db_path).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show { json } => run_config_show(&config, json)?,
            ConfigCommands::Init { force } => run_config_init(&config, &config_path, force)?,
            ConfigCommands::Path => run_config_path(&config_path),
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}
