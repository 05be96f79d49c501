/// DEX Testbed SDK
///
/// Provisions a concentrated-liquidity DEX test environment on an EVM
/// network and records what it deployed. Provides:
/// - Staged, resumable deployment of AMM infrastructure and tokens
/// - Pool bootstrapping at a target price with full-range liquidity
/// - Allowance management (max approvals and EIP-2612 permits)
/// - Demo swaps, a lending mock and recipient funding
/// - A persisted deployment record per network

pub mod allowance;
pub mod artifacts;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gateway;
pub mod stages;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;

pub use allowance::AllowanceManager;
pub use artifacts::{ArtifactSet, ContractArtifact};
pub use bootstrap::{initial_sqrt_price, AmmAddresses, LiquidityScale, PoolBootstrapper, PoolSpec};
pub use config::*;
pub use error::*;
pub use gateway::{ChainGateway, Deployable, EthersGateway};
pub use stages::{Orchestrator, RunOptions, Stage, StageOutcome, StageReport, StageState};
pub use store::{DeploymentStore, JsonFileStore, MemoryStore, RecordSession};

// Shared types and math
pub use dex_testbed_math as math;
pub use dex_testbed_types as types;
pub use dex_testbed_types::{DeploymentRecord, PoolKey, PoolRecord, TokenRef};
