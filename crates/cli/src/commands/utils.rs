// Utility functions for CLI commands

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dex_testbed_sdk::gateway::NetworkClient;
use dex_testbed_sdk::{ArtifactSet, EthersGateway, JsonFileStore, Orchestrator, ProvisionConfig, DEV_PRIVATE_KEY};
use tracing::{info, warn};

use super::Overrides;

/// Networks that fall back to the development key when none is given.
const LOCAL_NETWORKS: [&str; 3] = ["", "localhost", "local"];

/// Load the configuration file, or the built-in defaults when it does not
/// exist, then apply command-line overrides.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<ProvisionConfig> {
    let mut config = if path.exists() {
        ProvisionConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?
    } else {
        info!(path = %path.display(), "No configuration file, using defaults");
        ProvisionConfig::default()
    };

    if let Some(network) = &overrides.network {
        config.network.name = network.clone();
    }
    if let Some(rpc_url) = &overrides.rpc_url {
        config.network.rpc_url = rpc_url.clone();
    }
    if let Some(dir) = &overrides.deployments_dir {
        config.deployments_dir = dir.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Signing key from the overrides, or the development key on local networks.
pub fn private_key(config: &ProvisionConfig, overrides: &Overrides) -> Result<String> {
    if let Some(key) = &overrides.private_key {
        return Ok(key.clone());
    }
    if LOCAL_NETWORKS.contains(&config.network.name.as_str()) {
        warn!("No private key provided, using the development account");
        return Ok(DEV_PRIVATE_KEY.to_string());
    }
    bail!(
        "A private key is required for network '{}' (--private-key or PRIVATE_KEY)",
        config.network.name
    )
}

/// Connect to the network and wire up an orchestrator over the record store.
pub async fn connect(config: ProvisionConfig, overrides: &Overrides) -> Result<Orchestrator> {
    let key = private_key(&config, overrides)?;
    let artifacts = ArtifactSet::load(&config).context("Failed to load contract artifacts")?;

    let gateway = EthersGateway::connect(&config.network.rpc_url, &key, artifacts)
        .await
        .with_context(|| format!("Failed to connect to {}", config.network.rpc_url))?;

    if let Some(expected) = config.network.chain_id {
        let actual = gateway.chain_id().await.context("Failed to read chain id")?;
        if actual != expected {
            bail!(
                "Network '{}' reports chain id {}, expected {}",
                config.network.name,
                actual,
                expected
            );
        }
    }

    info!(network = %config.network.name, signer = ?gateway.signer(), "Ready");
    let store = JsonFileStore::new(&config.deployments_dir);
    let network = config.network.name.clone();
    Ok(Orchestrator::new(Arc::new(gateway), Arc::new(store), config, network))
}

/// Print success message with checkmark
pub fn success(msg: &str) {
    println!("[OK] {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            network: Some("kairos".into()),
            rpc_url: Some("https://rpc.example".into()),
            deployments_dir: Some(dir.path().join("records")),
            ..Default::default()
        };

        let config = load_config(&dir.path().join("missing.toml"), &overrides).unwrap();
        assert_eq!(config.network.name, "kairos");
        assert_eq!(config.network.rpc_url, "https://rpc.example");
        assert_eq!(config.deployments_dir, dir.path().join("records"));
        assert_eq!(config.tokens.len(), 4);
    }

    #[test]
    fn test_private_key_fallback_is_local_only() {
        let config = ProvisionConfig::default();
        assert_eq!(private_key(&config, &Overrides::default()).unwrap(), DEV_PRIVATE_KEY);

        let mut remote = ProvisionConfig::default();
        remote.network.name = "kairos".into();
        assert!(private_key(&remote, &Overrides::default()).is_err());

        let overrides = Overrides {
            private_key: Some("0x01".into()),
            ..Default::default()
        };
        assert_eq!(private_key(&remote, &overrides).unwrap(), "0x01");
    }
}
