//! `lens`: read surface over build and migration audit logs.
//!
//! # Usage
//!
//! ```bash
//! lens build-logs [INDEX_MODEL] [--limit N] [--id ID]
//! lens migration-logs [INDEX_MODEL] [--limit N] [--id ID]
//! lens health MODEL [--pick N]
//! lens admin stats|compact|purge-builds
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/index-lens/config.toml)
//! 3. Environment variables (LENS_*)
//! 4. CLI flags

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use lens_cli::{
    handle_admin, handle_build_logs, handle_health, handle_migration_logs, Cli, Commands, Lens,
};
use lens_types::Settings;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    if let Some(db_path) = cli.db_path {
        settings.db_path = db_path;
    }

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!(db_path = %settings.db_path, connection = %settings.connection, "Settings loaded");
    let lens = Lens::open(settings)?;

    let output = match cli.command {
        Commands::BuildLogs {
            index_model,
            limit,
            id,
        } => handle_build_logs(&lens, index_model.as_deref(), limit, id.as_deref())?,
        Commands::MigrationLogs {
            index_model,
            limit,
            id,
        } => handle_migration_logs(&lens, index_model.as_deref(), limit, id.as_deref())?,
        Commands::Health { model, pick } => handle_health(&lens, &model, pick)?,
        Commands::Admin { command } => handle_admin(&lens, command)?,
    };
    print!("{}", output);

    Ok(())
}
