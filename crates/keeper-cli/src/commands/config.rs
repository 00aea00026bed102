//! Configuration management commands.

use clap::Args;
use keeper_core::{id, Config, SecretString};
use std::path::Path;

const REDACTED: &str = "[REDACTED]";

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration, secrets redacted
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,

    /// Write a starter configuration with a fresh token secret
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Run the config command.
pub fn run(args: ConfigArgs, path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load_or_default(path)?;
            println!("{}", serde_json::to_string_pretty(&redacted(&config)?)?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Validate => {
            let config = Config::load_or_default(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
            println!("Configuration is valid");
        }

        ConfigCommand::Init { force } => {
            init(path, force)?;
            println!("Created config file: {}", path.display());
        }
    }

    Ok(())
}

/// The configuration as JSON with the token secret masked.
pub fn redacted(config: &Config) -> anyhow::Result<serde_json::Value> {
    let mut json = serde_json::to_value(config)?;
    if !config.auth.token_secret.is_empty() {
        json["auth"]["token_secret"] = serde_json::Value::String(REDACTED.to_string());
    }
    Ok(json)
}

/// Write a default configuration carrying a generated signing key.
pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    let mut config = Config::default();
    config.auth.token_secret = SecretString::new(id::secret_key());
    config.save(path)?;
    Ok(())
}
