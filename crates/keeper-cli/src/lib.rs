//! Keeper command-line interface.

pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use keeper_core::Config;
use std::path::PathBuf;

/// Keeper - a multi-user secret vault
#[derive(Parser)]
#[command(name = "keeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "KEEPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the RPC server
    Serve(commands::serve::ServeArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &config_path, cli.verbose).await,
        Commands::Config(args) => commands::config::run(args, &config_path),
        Commands::Version => {
            println!("keeper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
