/// Persisted deployment record
///
/// One document per target network holding every address and derived value
/// produced by the provisioning stages. Stages add or replace the entries
/// they own and never remove entries owned by another stage.

use std::collections::BTreeMap;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::pool_key::PoolKey;
use crate::serde_helpers::decimal_u256;

/// A bootstrapped pool and the position seeded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub address: Address,
    #[serde(with = "decimal_u256")]
    pub position_id: U256,
    #[serde(with = "decimal_u256")]
    pub sqrt_price_x96: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weth9: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_manager: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_router: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoter: Option<Address>,

    #[serde(default)]
    pub tokens: BTreeMap<String, Address>,
    #[serde(default)]
    pub pools: BTreeMap<String, PoolRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aave_pool: Option<Address>,
    /// Receipt tokens keyed `a{SYMBOL}`, e.g. `aUSDT`
    #[serde(default, rename = "aTokens", skip_serializing_if = "BTreeMap::is_empty")]
    pub a_tokens: BTreeMap<String, Address>,
}

impl DeploymentRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn token(&self, symbol: &str) -> Option<Address> {
        self.tokens.get(symbol).copied()
    }

    pub fn pool(&self, key: &PoolKey) -> Option<&PoolRecord> {
        self.pools.get(&key.to_string())
    }

    pub fn set_pool(&mut self, key: &PoolKey, pool: PoolRecord) -> Option<PoolRecord> {
        self.pools.insert(key.to_string(), pool)
    }

    pub fn a_token(&self, asset_symbol: &str) -> Option<Address> {
        self.a_tokens.get(&a_token_key(asset_symbol)).copied()
    }

    pub fn set_a_token(&mut self, asset_symbol: &str, address: Address) {
        self.a_tokens.insert(a_token_key(asset_symbol), address);
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Record key of the receipt token for a lending asset.
pub fn a_token_key(asset_symbol: &str) -> String {
    format!("a{}", asset_symbol)
}
