//! Staged provisioning against the in-memory chain

use std::sync::Arc;

use anyhow::Result;
use dex_testbed_sdk::gateway::{AmmClient, NetworkClient, TokenClient};
use dex_testbed_sdk::testing::SimulatedChain;
use dex_testbed_sdk::{
    ChainGateway, DeploymentRecord, DeploymentStore, MemoryStore, Orchestrator, PoolConfig, PoolKey,
    ProvisionConfig, ProvisionError, RunOptions, Stage, StageOutcome, TokenConfig, TokenRef,
};
use ethers::types::{Address, U256};

const NETWORK: &str = "localhost";

struct Harness {
    chain: Arc<SimulatedChain>,
    store: Arc<MemoryStore>,
    orchestrator: Orchestrator,
}

fn harness(config: ProvisionConfig) -> Harness {
    let chain = Arc::new(SimulatedChain::new());
    let store = Arc::new(MemoryStore::new());
    let gateway: Arc<dyn ChainGateway> = chain.clone();
    let records: Arc<dyn DeploymentStore> = store.clone();
    Harness {
        orchestrator: Orchestrator::new(gateway, records, config, NETWORK),
        chain,
        store,
    }
}

fn pool_key(record: &DeploymentRecord, a: &str, b: &str) -> PoolKey {
    let token_a = TokenRef::new(a, record.token(a).unwrap(), 0);
    let token_b = TokenRef::new(b, record.token(b).unwrap(), 0);
    PoolKey::for_pair(&token_a, &token_b, 3000).unwrap()
}

fn recipient() -> Address {
    Address::repeat_byte(0x42)
}

fn fund_options() -> RunOptions {
    RunOptions {
        fund_to: Some(format!("{:?}", recipient())),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_run_all_provisions_environment() -> Result<()> {
    let h = harness(ProvisionConfig::default());

    let reports = h.orchestrator.run_all(&fund_options()).await?;
    let stages: Vec<_> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, Stage::ALL.to_vec());
    assert!(reports.iter().all(|r| r.outcome == StageOutcome::Completed));

    let record = h.orchestrator.record();
    assert!(record.factory.is_some());
    assert!(record.position_manager.is_some());
    assert!(record.swap_router.is_some());
    assert!(record.quoter.is_none());
    assert_eq!(record.token("KAIA"), record.weth9);
    assert_eq!(record.tokens.len(), 5);
    assert_eq!(record.pools.len(), 4);

    for (a, b) in [("USDT", "TKA"), ("USDT", "TKB"), ("USDT", "TKC"), ("USDT", "KAIA")] {
        let pool = record.pool(&pool_key(&record, a, b)).unwrap();
        assert!(h.chain.pool_liquidity(pool.address).await? > 0);
    }

    // Lending demo supplied one USDT
    let a_usdt = record.a_token("USDT").unwrap();
    assert_eq!(h.chain.balance_of(a_usdt, h.chain.signer()).await?, U256::exp10(6));

    // 2000 of every deployed token; wrapped native is short and skipped
    let usdt = record.token("USDT").unwrap();
    let tka = record.token("TKA").unwrap();
    let kaia = record.token("KAIA").unwrap();
    assert_eq!(h.chain.balance_of(usdt, recipient()).await?, U256::from(2_000u64) * U256::exp10(6));
    assert_eq!(h.chain.balance_of(tka, recipient()).await?, U256::from(2_000u64) * U256::exp10(18));
    assert_eq!(h.chain.balance_of(kaia, recipient()).await?, U256::zero());

    Ok(())
}

#[tokio::test]
async fn test_rerun_skips_recorded_stages() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();
    h.orchestrator.run_all(&options).await?;

    let before = h.chain.transaction_count();
    for stage in [Stage::Infra, Stage::Tokens, Stage::LendingDeploy] {
        let report = h.orchestrator.run_stage(stage, &options).await?;
        assert_eq!(report.outcome, StageOutcome::AlreadyRecorded, "{}", stage);
    }
    assert_eq!(h.chain.transaction_count(), before);

    Ok(())
}

#[tokio::test]
async fn test_stale_addresses_are_redeployed() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();
    h.orchestrator.run_stage(Stage::Infra, &options).await?;
    h.orchestrator.run_stage(Stage::Tokens, &options).await?;
    let first = h.orchestrator.record();

    // Point at a fresh network: every recorded address is now stale
    h.chain.reset();

    let report = h.orchestrator.run_stage(Stage::Infra, &options).await?;
    assert_eq!(report.outcome, StageOutcome::Completed);
    let report = h.orchestrator.run_stage(Stage::Tokens, &options).await?;
    assert_eq!(report.outcome, StageOutcome::Completed);

    let second = h.orchestrator.record();
    assert_ne!(first.factory, second.factory);
    assert_ne!(first.token("USDT"), second.token("USDT"));
    assert_eq!(second.token("KAIA"), second.weth9);
    assert!(h.chain.has_code(second.token("USDT").unwrap()).await?);

    Ok(())
}

#[tokio::test]
async fn test_periphery_follows_redeployed_core() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();
    h.orchestrator.run_stage(Stage::Infra, &options).await?;
    let first = h.orchestrator.record();

    h.chain.destroy(first.factory.unwrap());
    h.orchestrator.run_stage(Stage::Infra, &options).await?;

    let second = h.orchestrator.record();
    assert_eq!(first.weth9, second.weth9);
    assert_ne!(first.factory, second.factory);
    assert_ne!(first.position_manager, second.position_manager);
    assert_ne!(first.swap_router, second.swap_router);

    Ok(())
}

#[tokio::test]
async fn test_missing_dependencies_fail_before_any_transaction() {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();

    for (stage, expected) in [
        (Stage::Pools, "factory"),
        (Stage::Swaps, "swapRouter"),
        (Stage::LendingDeploy, "tokens.USDT"),
        (Stage::LendingDemo, "tokens.USDT"),
    ] {
        match h.orchestrator.run_stage(stage, &options).await {
            Err(ProvisionError::MissingDependency { field, .. }) => assert_eq!(field, expected, "{}", stage),
            other => panic!("{} should fail on a missing dependency, got {:?}", stage, other),
        }
    }

    assert!(matches!(
        h.orchestrator.run_stage(Stage::Fund, &fund_options()).await,
        Err(ProvisionError::MissingDependency { .. })
    ));
    assert_eq!(h.chain.transaction_count(), 0);
    assert!(h.store.load(NETWORK).is_empty());
}

#[tokio::test]
async fn test_pools_require_tokens() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    h.orchestrator.run_stage(Stage::Infra, &RunOptions::default()).await?;
    let before = h.chain.transaction_count();

    match h.orchestrator.run_stage(Stage::Pools, &RunOptions::default()).await {
        Err(ProvisionError::MissingDependency { stage, field }) => {
            assert_eq!(stage, "pools");
            assert_eq!(field, "tokens.USDT");
        }
        other => panic!("expected a missing token, got {:?}", other),
    }
    assert_eq!(h.chain.transaction_count(), before);

    Ok(())
}

#[tokio::test]
async fn test_skipped_pools_are_left_alone() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions {
        skip_pools: vec!["USDT_KAIA_3000".to_string()],
        ..Default::default()
    };
    for stage in [Stage::Infra, Stage::Tokens, Stage::Pools] {
        h.orchestrator.run_stage(stage, &options).await?;
    }

    let record = h.orchestrator.record();
    assert_eq!(record.pools.len(), 3);
    assert!(record.pool(&pool_key(&record, "USDT", "KAIA")).is_none());

    Ok(())
}

#[tokio::test]
async fn test_pools_persist_one_at_a_time() -> Result<()> {
    let mut config = ProvisionConfig::default();
    config.tokens.truncate(2);
    config.tokens.push(TokenConfig {
        symbol: "TINY".into(),
        name: "Tiny Supply".into(),
        decimals: 18,
        initial_supply: 1,
    });
    config.pools = ["TKA", "TINY"]
        .iter()
        .map(|b| PoolConfig {
            token_a: "USDT".into(),
            token_b: b.to_string(),
            fee: 3000,
            target: None,
        })
        .collect();
    config.swaps.pools = vec!["USDT_TKA_3000".into()];
    config.validate()?;

    let h = harness(config);
    let options = RunOptions::default();
    h.orchestrator.run_stage(Stage::Infra, &options).await?;
    h.orchestrator.run_stage(Stage::Tokens, &options).await?;

    // One whole TINY cannot back a million-token position
    let result = h.orchestrator.run_stage(Stage::Pools, &options).await;
    assert!(matches!(result, Err(ProvisionError::ChainCall(_))));

    let record = h.store.load(NETWORK);
    assert!(record.pool(&pool_key(&record, "USDT", "TKA")).is_some());
    assert!(record.pool(&pool_key(&record, "USDT", "TINY")).is_none());

    Ok(())
}

#[tokio::test]
async fn test_lending_falls_back_to_default_decimals() -> Result<()> {
    let mut config = ProvisionConfig::default();
    config.lending.default_decimals = 8;
    let h = harness(config);
    let options = RunOptions::default();
    h.orchestrator.run_stage(Stage::Infra, &options).await?;
    h.orchestrator.run_stage(Stage::Tokens, &options).await?;

    let usdt = h.orchestrator.record().token("USDT").unwrap();
    h.chain.hide_decimals(usdt);

    let report = h.orchestrator.run_stage(Stage::LendingDeploy, &options).await?;
    assert_eq!(report.outcome, StageOutcome::Completed);

    let record = h.orchestrator.record();
    assert!(record.aave_pool.is_some());
    let a_usdt = record.a_token("USDT").unwrap();
    assert_eq!(record.a_tokens.keys().collect::<Vec<_>>(), ["aUSDT"]);
    assert_eq!(h.chain.decimals(a_usdt).await?, 8);

    Ok(())
}

#[tokio::test]
async fn test_invalid_recipient_sends_nothing() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    h.orchestrator.run_stage(Stage::Infra, &RunOptions::default()).await?;
    h.orchestrator.run_stage(Stage::Tokens, &RunOptions::default()).await?;
    let before = h.chain.transaction_count();

    for bad in ["0x1234", "not-an-address", "", "0x0000000000000000000000000000000000000000"] {
        let options = RunOptions {
            fund_to: Some(bad.to_string()),
            ..Default::default()
        };
        let result = h.orchestrator.run_stage(Stage::Fund, &options).await;
        assert!(matches!(result, Err(ProvisionError::InvalidRecipient(_))), "{:?}", bad);
    }
    assert_eq!(h.chain.transaction_count(), before);

    Ok(())
}

#[tokio::test]
async fn test_funding_skips_short_balances() -> Result<()> {
    let mut config = ProvisionConfig::default();
    config.tokens[1].initial_supply = 1_000;
    let h = harness(config);
    h.orchestrator.run_stage(Stage::Infra, &RunOptions::default()).await?;
    h.orchestrator.run_stage(Stage::Tokens, &RunOptions::default()).await?;

    let report = h.orchestrator.run_stage(Stage::Fund, &fund_options()).await?;
    assert_eq!(report.outcome, StageOutcome::Completed);

    let record = h.orchestrator.record();
    let tka = record.token("TKA").unwrap();
    let tkb = record.token("TKB").unwrap();
    assert_eq!(h.chain.balance_of(tka, recipient()).await?, U256::zero());
    assert_eq!(h.chain.balance_of(tkb, recipient()).await?, U256::from(2_000u64) * U256::exp10(18));

    Ok(())
}

#[tokio::test]
async fn test_swaps_move_pool_price() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();
    for stage in [Stage::Infra, Stage::Tokens, Stage::Pools] {
        h.orchestrator.run_stage(stage, &options).await?;
    }

    let record = h.orchestrator.record();
    let pool = record.pool(&pool_key(&record, "USDT", "TKA")).unwrap().clone();
    let tka = record.token("TKA").unwrap();
    let tka_before = h.chain.balance_of(tka, h.chain.signer()).await?;

    h.orchestrator.run_stage(Stage::Swaps, &options).await?;

    assert_ne!(h.chain.pool_sqrt_price(pool.address).await?, pool.sqrt_price_x96);
    // Net of both legs the signer gained TKA
    assert!(h.chain.balance_of(tka, h.chain.signer()).await? > tka_before);

    Ok(())
}

#[tokio::test]
async fn test_pool_rerun_keeps_initial_price_after_swaps() -> Result<()> {
    let h = harness(ProvisionConfig::default());
    let options = RunOptions::default();
    for stage in [Stage::Infra, Stage::Tokens, Stage::Pools, Stage::Swaps] {
        h.orchestrator.run_stage(stage, &options).await?;
    }

    let record = h.orchestrator.record();
    let key = pool_key(&record, "USDT", "TKA");
    let first = record.pool(&key).unwrap().clone();
    assert_ne!(h.chain.pool_sqrt_price(first.address).await?, first.sqrt_price_x96);

    h.orchestrator.run_stage(Stage::Pools, &options).await?;

    let record = h.orchestrator.record();
    let second = record.pool(&key).unwrap();
    assert_eq!(second.address, first.address);
    assert_eq!(second.sqrt_price_x96, first.sqrt_price_x96);
    assert_eq!(second.position_id, first.position_id + 1);

    Ok(())
}
