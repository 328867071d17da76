use std::io::ErrorKind;

use tokio::{fs, io::AsyncWriteExt};

use crate::config::Config;

use super::{Command, Context};

/// Write the default config file.
#[derive(Debug, clap::Args)]
pub struct InitConfig {
    /// Overwrite an existing config file.
    #[arg(long, short)]
    force: bool,
}

impl Command for InitConfig {
    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()> {
        let path = ctx.config_path();
        let content = toml::to_string_pretty(&Config::default())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true);
        if self.force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = match options.open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                eyre::bail!(
                    "`{}` already exists, use `--force` to overwrite it",
                    path.display()
                );
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        tracing::info!(path = %path.display(), "wrote default config");
        Ok(())
    }
}
