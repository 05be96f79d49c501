// Provisioning stage commands

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use dex_testbed_sdk::{RunOptions, Stage, StageOutcome, StageReport};

use super::utils::{connect, load_config, success};
use super::Overrides;

#[derive(Args, Debug)]
pub struct PoolsCmd {
    /// Pool keys or labels to leave alone, comma separated
    #[arg(long, env = "SKIP_POOLS", value_delimiter = ',')]
    pub skip_pools: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FundCmd {
    /// Recipient address
    #[arg(long, env = "FUND_TO")]
    pub to: String,
}

#[derive(Args, Debug)]
pub struct AllCmd {
    /// Skip the lending deploy and demo
    #[arg(long, env = "SKIP_AAVE")]
    pub skip_aave: bool,

    /// Pool keys or labels to leave alone, comma separated
    #[arg(long, env = "SKIP_POOLS", value_delimiter = ',')]
    pub skip_pools: Vec<String>,

    /// Fund this address once everything is deployed
    #[arg(long, env = "FUND_TO")]
    pub fund_to: Option<String>,
}

impl AllCmd {
    fn options(&self) -> RunOptions {
        RunOptions {
            skip_lending: self.skip_aave,
            skip_pools: trimmed(&self.skip_pools),
            fund_to: self.fund_to.clone().filter(|to| !to.trim().is_empty()),
        }
    }
}

pub async fn execute(stage: Stage, config_path: &Path, overrides: &Overrides) -> Result<()> {
    run(stage, config_path, overrides, RunOptions::default()).await
}

pub async fn execute_pools(cmd: PoolsCmd, config_path: &Path, overrides: &Overrides) -> Result<()> {
    let options = RunOptions {
        skip_pools: trimmed(&cmd.skip_pools),
        ..Default::default()
    };
    run(Stage::Pools, config_path, overrides, options).await
}

pub async fn execute_fund(cmd: FundCmd, config_path: &Path, overrides: &Overrides) -> Result<()> {
    let options = RunOptions {
        fund_to: Some(cmd.to),
        ..Default::default()
    };
    run(Stage::Fund, config_path, overrides, options).await
}

pub async fn execute_all(cmd: AllCmd, config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let orchestrator = connect(config, overrides).await?;

    let reports = orchestrator
        .run_all(&cmd.options())
        .await
        .context("Provisioning failed")?;
    for report in &reports {
        print_report(report);
    }
    success(&format!("All stages finished on '{}'", orchestrator.network()));
    Ok(())
}

async fn run(stage: Stage, config_path: &Path, overrides: &Overrides, options: RunOptions) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let orchestrator = connect(config, overrides).await?;

    let report = orchestrator
        .run_stage(stage, &options)
        .await
        .with_context(|| format!("Stage '{}' failed", stage))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &StageReport) {
    match report.outcome {
        StageOutcome::Completed => success(&format!("{} completed", report.stage)),
        StageOutcome::AlreadyRecorded => success(&format!("{} already recorded", report.stage)),
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
