//! Compiled contract artifacts
//!
//! Contracts are deployed from prebuilt `{ "abi": [...], "bytecode": "0x..." }`
//! documents (the hardhat artifact layout). The bytecode is never compiled
//! here.

use std::fs;
use std::path::Path;

use ethers::abi::Abi;
use ethers::types::Bytes;
use serde::Deserialize;

use crate::config::ProvisionConfig;
use crate::{GatewayError, GatewayResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
    #[serde(default, rename = "contractName")]
    pub name: Option<String>,
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Artifact(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| GatewayError::Artifact(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(json: &str) -> GatewayResult<Self> {
        let artifact: ContractArtifact = serde_json::from_str(json)
            .map_err(|e| GatewayError::Artifact(format!("Malformed artifact: {}", e)))?;
        if artifact.bytecode.is_empty() {
            return Err(GatewayError::Artifact(format!(
                "Artifact {} has no deployable bytecode",
                artifact.name.as_deref().unwrap_or("<unnamed>")
            )));
        }
        Ok(artifact)
    }
}

/// Every artifact the provisioning stages can deploy.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub weth9: ContractArtifact,
    pub factory: ContractArtifact,
    pub position_manager: ContractArtifact,
    pub swap_router: ContractArtifact,
    pub quoter: Option<ContractArtifact>,
    pub token: ContractArtifact,
    pub lending_pool: ContractArtifact,
}

impl ArtifactSet {
    pub fn load(config: &ProvisionConfig) -> GatewayResult<Self> {
        let load = |file: &str| ContractArtifact::load(config.artifact_path(file));
        let artifacts = &config.artifacts;

        Ok(Self {
            weth9: load(&artifacts.weth9)?,
            factory: load(&artifacts.factory)?,
            position_manager: load(&artifacts.position_manager)?,
            swap_router: load(&artifacts.swap_router)?,
            quoter: artifacts.quoter.as_deref().map(load).transpose()?,
            token: load(&artifacts.token)?,
            lending_pool: load(&artifacts.lending_pool)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hardhat_artifact() {
        let json = r#"{
            "contractName": "WETH9Mock",
            "abi": [
                { "type": "function", "name": "deposit", "inputs": [], "outputs": [], "stateMutability": "payable" }
            ],
            "bytecode": "0x6080604052"
        }"#;

        let artifact = ContractArtifact::from_json(json).unwrap();
        assert_eq!(artifact.name.as_deref(), Some("WETH9Mock"));
        assert!(artifact.abi.function("deposit").is_ok());
        assert_eq!(artifact.bytecode.len(), 5);
    }

    #[test]
    fn test_rejects_interface_artifact() {
        let json = r#"{ "abi": [], "bytecode": "0x" }"#;
        assert!(matches!(
            ContractArtifact::from_json(json),
            Err(GatewayError::Artifact(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ContractArtifact::load("/nonexistent/Factory.json").unwrap_err();
        assert!(matches!(err, GatewayError::Artifact(_)));
    }
}
