//! Serve command.

use crate::logging;
use clap::Args;
use keeper_core::config::BindMode;
use keeper_core::Config;
use keeper_gateway::{Gateway, GatewayConfig};
use keeper_storage::Backends;
use keeper_vault::Vault;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Serve command arguments. Flags win over the config file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Bind mode (loopback, lan)
    #[arg(short, long, env = "KEEPER_BIND")]
    pub bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "KEEPER_PORT")]
    pub port: Option<u16>,

    /// SQLite database URL or path
    #[arg(long, env = "KEEPER_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory holding object buckets
    #[arg(long, env = "KEEPER_OBJECTS_ROOT")]
    pub objects_root: Option<PathBuf>,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    pub memory: bool,
}

impl ServeArgs {
    /// Overlay the flags on a loaded configuration.
    pub fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(bind) = &self.bind {
            config.server.bind = match bind.as_str() {
                "loopback" => BindMode::Loopback,
                "lan" => BindMode::Lan,
                other => anyhow::bail!("Invalid bind mode: {} (expected loopback or lan)", other),
            };
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        if let Some(root) = &self.objects_root {
            config.objects.root = Some(root.clone());
        }
        Ok(())
    }
}

/// Run the serve command.
pub async fn run(args: ServeArgs, config_path: &Path, verbose: u8) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    args.apply(&mut config)?;
    logging::init(&config.logging, verbose);
    config.validate()?;
    info!(path = %config_path.display(), "configuration loaded");

    let backends = if args.memory {
        warn!("Running with in-memory storage; data is lost on exit");
        Backends::in_memory()
    } else {
        Backends::open(&config).await?
    };

    let vault = Vault::new(&backends, &config.auth);
    let gateway = Gateway::new(GatewayConfig::from(&config.server), vault).await;
    gateway.run().await?;
    Ok(())
}
