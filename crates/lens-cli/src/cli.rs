//! CLI argument parsing for `lens`.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Build and migration audit logs for search indexes
#[derive(Parser, Debug)]
#[command(name = "lens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/index-lens/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build logs: dashboard, failed builds of one index model, or one record
    BuildLogs {
        /// Index model identifier or type name
        index_model: Option<String>,

        /// Maximum rows
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Show one record by ID or ID prefix
        #[arg(long)]
        id: Option<String>,
    },

    /// Migration logs: dashboard, history of one index model, or one record
    MigrationLogs {
        /// Index model identifier or type name
        index_model: Option<String>,

        /// Maximum rows
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Show one record by ID or ID prefix
        #[arg(long)]
        id: Option<String>,
    },

    /// Full health check of a model and its index
    Health {
        /// Base model name, e.g. User
        model: String,

        /// Pick the Nth match (1-based) when the name is ambiguous
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

/// Admin subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Show database statistics
    Stats,

    /// Trigger RocksDB compaction
    Compact,

    /// Delete every build record
    PurgeBuilds {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}
