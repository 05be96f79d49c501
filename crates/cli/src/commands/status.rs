// Print the persisted deployment record

use std::path::Path;

use anyhow::{Context, Result};
use dex_testbed_sdk::{DeploymentStore, JsonFileStore};

use super::utils::load_config;
use super::Overrides;

pub fn execute(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let store = JsonFileStore::new(&config.deployments_dir);
    let record = store.load(&config.network.name);

    if record.is_empty() {
        println!(
            "No deployments recorded for '{}' ({})",
            config.network.name,
            store.path_for(&config.network.name).display()
        );
        return Ok(());
    }

    let json = record.to_json_pretty().context("Failed to render deployment record")?;
    println!("{}", json);
    Ok(())
}
