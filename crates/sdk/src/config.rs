use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use dex_testbed_math::{parse_units, FeeTier};
use serde::{Deserialize, Serialize};

use crate::{ProvisionError, SdkResult};

/// First development account of the common local nodes.
pub const DEV_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Provisioning configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProvisionConfig {
    /// Directory holding one deployment record per network
    pub deployments_dir: PathBuf,

    /// Symbol that aliases the wrapped native token once it is deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_alias: Option<String>,

    pub network: NetworkConfig,

    pub artifacts: ArtifactConfig,

    /// Liquidity seeded into every bootstrapped pool
    pub liquidity: LiquidityConfig,

    /// Demo swap sizes
    pub swaps: SwapConfig,

    /// Lending mock settings
    pub lending: LendingConfig,

    /// Recipient funding settings
    pub funding: FundingConfig,

    /// Fungible tokens deployed by the token stage
    pub tokens: Vec<TokenConfig>,

    /// Pools created by the pool stage
    pub pools: Vec<PoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Network name; selects the deployment record file
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Expected chain id, checked on connect when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// Locations of the compiled contract artifacts (`{ abi, bytecode }` JSON).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
    pub weth9: String,
    pub factory: String,
    pub position_manager: String,
    pub swap_router: String,
    /// Quoter is only deployed when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoter: Option<String>,
    pub token: String,
    pub lending_pool: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Initial supply minted to the signer, in whole tokens
    pub initial_supply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LiquidityConfig {
    /// Whole tokens supplied per side unless overridden
    pub default_scale: u64,

    /// Per-symbol overrides of `default_scale`
    #[serde(default)]
    pub scales: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolConfig {
    pub token_a: String,
    pub token_b: String,
    pub fee: u32,
    /// Initial price; 1:1 after decimal adjustment when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetPrice>,
}

/// `amount_a` of `token_a` is worth `amount_b` of `token_b`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetPrice {
    pub amount_a: String,
    pub amount_b: String,
    #[serde(default)]
    pub basis: PriceBasis,
}

/// How target amounts are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBasis {
    /// Whole tokens, scaled by each token's decimals
    #[default]
    Units,
    /// Smallest units, no scaling
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SwapConfig {
    /// Whole tokens of `token_a` swapped into `token_b`
    pub forward_amount: u64,
    /// Whole tokens of `token_b` swapped back into `token_a`
    pub reverse_amount: u64,
    /// Pools to swap through, by label (`USDT_TKA_3000`)
    #[serde(default)]
    pub pools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LendingConfig {
    /// Asset symbol the mock pool accepts
    pub asset: String,
    /// Used when the asset's decimals cannot be read
    pub default_decimals: u8,
    /// Amount supplied by the demo, in whole tokens
    pub supply_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FundingConfig {
    /// Whole tokens of every recorded token sent to the recipient
    pub amount_per_token: u64,
}

impl ProvisionConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ProvisionError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: ProvisionConfig = toml::from_str(&content).map_err(|e| {
            ProvisionError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> SdkResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProvisionError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            ProvisionError::config(format!("Failed to write config file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.network.name.is_empty() {
            return Err(invalid("network.name", "empty", "non-empty string"));
        }

        if self.tokens.is_empty() {
            return Err(invalid("tokens", "empty", "at least one token"));
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            token.validate()?;
            if !symbols.insert(token.symbol.as_str()) {
                return Err(invalid("tokens.symbol", &token.symbol, "unique symbols"));
            }
        }

        if let Some(alias) = &self.native_alias {
            if !symbols.insert(alias.as_str()) {
                return Err(invalid("native_alias", alias, "a symbol not used by a deployed token"));
            }
        }

        if self.liquidity.default_scale == 0 {
            return Err(invalid("liquidity.default_scale", "0", "greater than 0"));
        }
        for (symbol, scale) in &self.liquidity.scales {
            if *scale == 0 {
                return Err(invalid(&format!("liquidity.scales.{}", symbol), "0", "greater than 0"));
            }
        }

        for pool in &self.pools {
            pool.validate(&symbols)?;
        }

        if self.swaps.forward_amount == 0 || self.swaps.reverse_amount == 0 {
            return Err(invalid("swaps", "0", "non-zero forward and reverse amounts"));
        }
        for label in &self.swaps.pools {
            if self.pool_by_label(label).is_none() {
                return Err(invalid("swaps.pools", label, "the label of a configured pool"));
            }
        }

        if !symbols.contains(self.lending.asset.as_str()) {
            return Err(invalid("lending.asset", &self.lending.asset, "a configured token symbol"));
        }
        parse_units(&self.lending.supply_amount, u32::from(self.lending.default_decimals))?;

        Ok(())
    }

    /// Pool configured as `{token_a}_{token_b}_{fee}`.
    pub fn pool_by_label(&self, label: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.label() == label)
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenConfig> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    /// Whole tokens supplied for `symbol` when seeding a pool.
    pub fn liquidity_scale(&self, symbol: &str) -> u64 {
        self.liquidity
            .scales
            .get(symbol)
            .copied()
            .unwrap_or(self.liquidity.default_scale)
    }

    pub fn artifact_path(&self, file: &str) -> PathBuf {
        self.artifacts.dir.join(file)
    }
}

impl TokenConfig {
    fn validate(&self) -> SdkResult<()> {
        if self.symbol.is_empty() || self.symbol.contains('_') {
            return Err(invalid("tokens.symbol", &self.symbol, "non-empty, without '_'"));
        }
        if self.name.is_empty() {
            return Err(invalid("tokens.name", "empty", "non-empty string"));
        }
        if self.decimals > 36 {
            return Err(invalid("tokens.decimals", &self.decimals.to_string(), "at most 36"));
        }
        Ok(())
    }
}

impl PoolConfig {
    fn validate(&self, symbols: &HashSet<&str>) -> SdkResult<()> {
        for symbol in [&self.token_a, &self.token_b] {
            if !symbols.contains(symbol.as_str()) {
                return Err(invalid("pools.token", symbol, "a configured token symbol"));
            }
        }

        if self.token_a == self.token_b {
            return Err(invalid("pools.token_b", &self.token_b, "different from token_a"));
        }

        FeeTier::try_from(self.fee)?;

        if let Some(target) = &self.target {
            if target.amount_a.trim().is_empty() || target.amount_b.trim().is_empty() {
                return Err(invalid("pools.target", "empty", "two amounts"));
            }
        }

        Ok(())
    }

    /// Label in the order the pair was configured, e.g. `USDT_TKA_3000`.
    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.token_a, self.token_b, self.fee)
    }
}

fn invalid(field: &str, value: &str, expected: &str) -> ProvisionError {
    ProvisionError::config(format!(
        "Invalid value '{}' for {}: expected {}",
        value, field, expected
    ))
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        let token = |symbol: &str, name: &str, decimals: u8| TokenConfig {
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            initial_supply: 1_000_000_000, // 1e9 whole tokens
        };
        let pool = |a: &str, b: &str| PoolConfig {
            token_a: a.to_string(),
            token_b: b.to_string(),
            fee: 3000,
            target: None,
        };

        let mut scales = BTreeMap::new();
        scales.insert("KAIA".to_string(), 100);

        Self {
            deployments_dir: PathBuf::from("deployments"),
            native_alias: Some("KAIA".to_string()),
            network: NetworkConfig {
                name: "localhost".to_string(),
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: None,
            },
            artifacts: ArtifactConfig {
                dir: PathBuf::from("artifacts"),
                weth9: "WETH9Mock.json".to_string(),
                factory: "UniswapV3Factory.json".to_string(),
                position_manager: "NonfungiblePositionManager.json".to_string(),
                swap_router: "SwapRouter.json".to_string(),
                quoter: None,
                token: "ERC20Decimals.json".to_string(),
                lending_pool: "MockAaveV3Pool.json".to_string(),
            },
            liquidity: LiquidityConfig {
                default_scale: 1_000_000,
                scales,
            },
            swaps: SwapConfig {
                forward_amount: 10_000,
                reverse_amount: 10,
                pools: vec![
                    "USDT_TKA_3000".to_string(),
                    "USDT_TKB_3000".to_string(),
                    "USDT_TKC_3000".to_string(),
                ],
            },
            lending: LendingConfig {
                asset: "USDT".to_string(),
                default_decimals: 6,
                supply_amount: "1".to_string(),
            },
            funding: FundingConfig {
                amount_per_token: 2_000,
            },
            tokens: vec![
                token("USDT", "Tether USD", 6),
                token("TKA", "Token A", 18),
                token("TKB", "Token B", 18),
                token("TKC", "Token C", 18),
            ],
            pools: vec![
                pool("USDT", "TKA"),
                pool("USDT", "TKB"),
                pool("USDT", "TKC"),
                PoolConfig {
                    target: Some(TargetPrice {
                        amount_a: "0.15".to_string(),
                        amount_b: "1".to_string(),
                        basis: PriceBasis::Units,
                    }),
                    ..pool("USDT", "KAIA")
                },
            ],
        }
    }
}

/// Write an example configuration file
pub fn create_example_config(path: impl AsRef<Path>) -> SdkResult<()> {
    ProvisionConfig::default().save(path)
}
