use std::path::Path;

use batch::Batch;
use enum_dispatch::enum_dispatch;
use init_config::InitConfig;
use referrals::Referrals;

use crate::config::Config;

mod batch;
mod init_config;
mod referrals;
mod utils;

/// Commands.
#[enum_dispatch]
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Initialize config file.
    InitConfig(InitConfig),
    /// Partition earn requests into batches.
    Batch(Batch),
    /// Compute referral bonuses.
    Referrals(Referrals),
}

#[enum_dispatch(Commands)]
pub(crate) trait Command {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()>;
}

/// Execution context of a command.
pub struct Context<'a> {
    config_path: &'a Path,
    config: &'a Config,
}

impl<'a> Context<'a> {
    pub(super) fn new(config_path: &'a Path, config: &'a Config) -> Self {
        Self {
            config_path,
            config,
        }
    }

    pub(crate) fn config_path(&self) -> &Path {
        self.config_path
    }

    pub(crate) fn config(&self) -> &Config {
        self.config
    }
}
