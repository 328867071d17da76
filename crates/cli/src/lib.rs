/// Configuration.
pub mod config;

/// Commands.
pub mod commands;

use std::path::PathBuf;

use clap::Parser;
use commands::{Command, Commands, Context};
use config::Config;

const CONFIG_DIR: &str = "accrual";
const CONFIG_FILE: &str = "config.toml";

/// Batch earn requests and compute referral bonuses.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the config file.
    ///
    /// Defaults to `accrual/config.toml` in the user config directory.
    #[arg(long = "config", short, global = true)]
    config_path: Option<PathBuf>,
    /// Flags overriding the config file.
    #[command(flatten)]
    flags: Config,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Resolve the config and run the command.
    pub async fn run(&self) -> eyre::Result<()> {
        let config_path = match &self.config_path {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = self.flags.resolve(&config_path)?;
        tracing::debug!(path = %config_path.display(), ?config, "resolved config");
        self.command
            .execute(Context::new(&config_path, &config))
            .await
    }
}

fn default_config_path() -> eyre::Result<PathBuf> {
    use etcetera::{choose_base_strategy, BaseStrategy};

    let strategy = choose_base_strategy()?;
    Ok(strategy.config_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}
