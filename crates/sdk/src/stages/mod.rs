//! Provisioning stages
//!
//! Each stage loads the deployment record, verifies what it already holds
//! against the chain, performs the missing work and persists its outputs
//! only after the transactions producing them are confirmed. Stages run
//! strictly one after another.

mod funding;
mod infra;
mod lending;
mod pools;
mod swaps;
mod tokens;

use std::fmt;
use std::sync::Arc;

use dex_testbed_types::DeploymentRecord;
use ethers::types::Address;
use tracing::{debug, error, info, warn};

use crate::config::ProvisionConfig;
use crate::gateway::{ChainGateway, Deployable};
use crate::store::DeploymentStore;
use crate::{ProvisionError, SdkResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Infra,
    Tokens,
    Pools,
    Swaps,
    LendingDeploy,
    LendingDemo,
    Fund,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Infra,
        Stage::Tokens,
        Stage::Pools,
        Stage::Swaps,
        Stage::LendingDeploy,
        Stage::LendingDemo,
        Stage::Fund,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Infra => "infra",
            Stage::Tokens => "tokens",
            Stage::Pools => "pools",
            Stage::Swaps => "swaps",
            Stage::LendingDeploy => "lending-deploy",
            Stage::LendingDemo => "lending-demo",
            Stage::Fund => "fund",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of a single stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    Verifying,
    Executing,
    Recorded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Work was performed and recorded
    Completed,
    /// Every output was already recorded with live code; nothing sent
    AlreadyRecorded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Logs state transitions of one stage.
#[derive(Debug)]
pub struct StageTracker {
    stage: Stage,
    state: StageState,
}

impl StageTracker {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            state: StageState::NotStarted,
        }
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    fn enter(&mut self, next: StageState) {
        debug!(stage = %self.stage, from = ?self.state, to = ?next, "Stage transition");
        self.state = next;
    }

    /// Mark the point after which transactions may be sent.
    pub fn executing(&mut self) {
        if self.state != StageState::Executing {
            self.enter(StageState::Executing);
        }
    }
}

/// Switches for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip lending deploy and demo in `run_all`
    pub skip_lending: bool,
    /// Pool keys or labels the pool stage leaves alone
    pub skip_pools: Vec<String>,
    /// Recipient of the funding stage
    pub fund_to: Option<String>,
}

impl RunOptions {
    pub fn skips_pool(&self, names: &[&str]) -> bool {
        self.skip_pools
            .iter()
            .any(|skip| names.iter().any(|name| skip.eq_ignore_ascii_case(name)))
    }
}

/// Everything a stage reads.
pub struct StageContext<'a> {
    pub gateway: &'a dyn ChainGateway,
    pub store: &'a dyn DeploymentStore,
    pub config: &'a ProvisionConfig,
    pub network: &'a str,
    pub options: &'a RunOptions,
    pub stage: Stage,
}

impl StageContext<'_> {
    /// `address` when recorded and backed by deployed code.
    pub async fn live(&self, field: &str, address: Option<Address>) -> SdkResult<Option<Address>> {
        let Some(address) = address else {
            return Ok(None);
        };
        if self.gateway.has_code(address).await? {
            return Ok(Some(address));
        }
        warn!(stage = %self.stage, field, ?address, "Recorded address has no code, treating as stale");
        Ok(None)
    }

    /// Like [`live`](Self::live) but a missing or stale prerequisite is an error.
    pub async fn require(&self, field: &str, address: Option<Address>) -> SdkResult<Address> {
        self.live(field, address)
            .await?
            .ok_or_else(|| ProvisionError::missing(self.stage.name(), field))
    }

    /// Recorded token by symbol, required to be live.
    pub async fn require_token(&self, record: &DeploymentRecord, symbol: &str) -> SdkResult<Address> {
        self.require(&format!("tokens.{}", symbol), record.token(symbol)).await
    }

    /// Deploy and wait for the contract's address.
    pub async fn deploy(&self, tracker: &mut StageTracker, contract: Deployable) -> SdkResult<Address> {
        tracker.executing();
        let label = contract.label().to_string();
        info!(stage = %self.stage, contract = %label, "Deploying");
        let address = self.gateway.deploy(contract).await?;
        info!(stage = %self.stage, contract = %label, ?address, "Deployed");
        Ok(address)
    }

    /// Token decimals, or `fallback` when the token cannot report them.
    pub async fn decimals_or(&self, token: Address, symbol: &str, fallback: u8) -> u8 {
        match self.gateway.decimals(token).await {
            Ok(decimals) => decimals,
            Err(e) => {
                warn!(stage = %self.stage, symbol, error = %e, fallback, "Could not read decimals, using fallback");
                fallback
            }
        }
    }
}

/// Drives stages against one network.
pub struct Orchestrator {
    gateway: Arc<dyn ChainGateway>,
    store: Arc<dyn DeploymentStore>,
    config: ProvisionConfig,
    network: String,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        store: Arc<dyn DeploymentStore>,
        config: ProvisionConfig,
        network: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            config,
            network: network.into(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Current persisted record.
    pub fn record(&self) -> DeploymentRecord {
        self.store.load(&self.network)
    }

    pub async fn run_stage(&self, stage: Stage, options: &RunOptions) -> SdkResult<StageReport> {
        let ctx = StageContext {
            gateway: self.gateway.as_ref(),
            store: self.store.as_ref(),
            config: &self.config,
            network: &self.network,
            options,
            stage,
        };

        let mut tracker = StageTracker::new(stage);
        info!(stage = %stage, network = %self.network, "Starting stage");
        tracker.enter(StageState::Verifying);

        let result = match stage {
            Stage::Infra => infra::run(&ctx, &mut tracker).await,
            Stage::Tokens => tokens::run(&ctx, &mut tracker).await,
            Stage::Pools => pools::run(&ctx, &mut tracker).await,
            Stage::Swaps => swaps::run(&ctx, &mut tracker).await,
            Stage::LendingDeploy => lending::deploy(&ctx, &mut tracker).await,
            Stage::LendingDemo => lending::demo(&ctx, &mut tracker).await,
            Stage::Fund => funding::run(&ctx, &mut tracker).await,
        };

        match result {
            Ok(outcome) => {
                tracker.enter(StageState::Recorded);
                match outcome {
                    StageOutcome::AlreadyRecorded => info!(stage = %stage, "Already recorded, skipped"),
                    StageOutcome::Completed => info!(stage = %stage, "Stage complete"),
                }
                Ok(StageReport { stage, outcome })
            }
            Err(e) => {
                tracker.enter(StageState::Failed);
                error!(stage = %stage, error = %e, "Stage failed");
                Err(e)
            }
        }
    }

    /// Stages in order: infra, tokens, pools, swaps, then lending unless
    /// skipped, then funding when a recipient is given. Stops at the first
    /// failure.
    pub async fn run_all(&self, options: &RunOptions) -> SdkResult<Vec<StageReport>> {
        let mut stages = vec![Stage::Infra, Stage::Tokens, Stage::Pools, Stage::Swaps];
        if !options.skip_lending {
            stages.extend([Stage::LendingDeploy, Stage::LendingDemo]);
        }
        if options.fund_to.is_some() {
            stages.push(Stage::Fund);
        } else {
            info!("No recipient given, funding skipped");
        }

        let mut reports = Vec::with_capacity(stages.len());
        for stage in stages {
            reports.push(self.run_stage(stage, options).await?);
        }
        Ok(reports)
    }
}
