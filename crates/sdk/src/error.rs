//! Error types for provisioning

use std::path::PathBuf;

use dex_testbed_math::{PriceError, TickError};
use dex_testbed_types::TypesError;
use ethers::types::{H256, U256};
use thiserror::Error;

/// Failure of a network call or transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Call reverted: {0}")]
    Reverted(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction {0:?} was dropped before confirmation")]
    NotConfirmed(H256),
}

impl GatewayError {
    pub fn reverted(reason: impl Into<String>) -> Self {
        GatewayError::Reverted(reason.into())
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, GatewayError::Reverted(_))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write deployment record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize deployment record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Stage '{stage}' requires '{field}' which is not deployed; run the earlier stages first")]
    MissingDependency { stage: String, field: String },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Insufficient {symbol} balance: have {balance}, need {required}")]
    InsufficientBalance {
        symbol: String,
        balance: U256,
        required: U256,
    },

    #[error("Unknown token symbol '{0}'")]
    UnknownToken(String),

    #[error(transparent)]
    ChainCall(#[from] GatewayError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProvisionError {
    pub fn missing(stage: impl Into<String>, field: impl Into<String>) -> Self {
        ProvisionError::MissingDependency {
            stage: stage.into(),
            field: field.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ProvisionError::Config(message.into())
    }
}

impl From<TypesError> for ProvisionError {
    fn from(err: TypesError) -> Self {
        ProvisionError::Config(err.to_string())
    }
}

impl From<TickError> for ProvisionError {
    fn from(err: TickError) -> Self {
        ProvisionError::Config(err.to_string())
    }
}

/// Result type alias for provisioning operations
pub type SdkResult<T> = std::result::Result<T, ProvisionError>;

/// Result type alias for gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
