// Write an example configuration file

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use dex_testbed_sdk::create_example_config;

use super::utils::success;

#[derive(Args, Debug)]
pub struct InitConfigCmd {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(cmd: InitConfigCmd, config_path: &Path) -> Result<()> {
    if config_path.exists() && !cmd.force {
        bail!("{} already exists, pass --force to overwrite", config_path.display());
    }

    create_example_config(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    success(&format!("Wrote {}", config_path.display()));
    Ok(())
}
