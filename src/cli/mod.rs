//! CLI interface for prop-sentry
//!
//! Provides subcommands for:
//! - `run`: Drive the engine from a captured replay feed
//! - `status`: Show the persisted risk ledger
//! - `config`: Show effective configuration

mod run;
pub mod status;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "prop-sentry")]
#[command(about = "Risk-governed execution engine for funded trading accounts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a captured account feed through the engine
    Run(RunArgs),
    /// Show the persisted risk ledger
    Status,
    /// Show effective configuration
    Config,
}
