//! `lens` command-line library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (build-logs, migration-logs, health, admin)
//! - `render`: Plain-text rendering of records, dashboards and reports

pub mod cli;
pub mod commands;
pub mod render;

pub use cli::{AdminCommands, Cli, Commands};
pub use commands::{handle_admin, handle_build_logs, handle_health, handle_migration_logs, Lens};
