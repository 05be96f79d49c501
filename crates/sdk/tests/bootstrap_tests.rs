//! Pool bootstrapping end to end

use anyhow::Result;
use dex_testbed_sdk::gateway::{AmmClient, Deployable, NetworkClient, TokenClient};
use dex_testbed_sdk::math::FeeTier;
use dex_testbed_sdk::testing::SimulatedChain;
use dex_testbed_sdk::{AmmAddresses, LiquidityScale, PoolBootstrapper, PoolSpec, PriceBasis, TargetPrice, TokenRef};
use ethers::types::{Address, U256};

struct Deployed {
    amm: AmmAddresses,
    usdt: TokenRef,
    tka: TokenRef,
}

async fn deploy_token(chain: &SimulatedChain, symbol: &str, decimals: u8) -> Result<TokenRef> {
    let address = chain
        .deploy(Deployable::Token {
            name: format!("{} token", symbol),
            symbol: symbol.to_string(),
            decimals,
            initial_supply: U256::from(1_000_000_000u64) * U256::exp10(usize::from(decimals)),
            owner: chain.signer(),
        })
        .await?;
    Ok(TokenRef::new(symbol, address, u32::from(decimals)))
}

async fn deploy(chain: &SimulatedChain) -> Result<Deployed> {
    let weth9 = chain.deploy(Deployable::Weth9).await?;
    let factory = chain.deploy(Deployable::Factory).await?;
    let position_manager = chain
        .deploy(Deployable::PositionManager {
            factory,
            weth9,
            descriptor: Address::zero(),
        })
        .await?;

    Ok(Deployed {
        amm: AmmAddresses {
            factory,
            position_manager,
            weth9: Some(weth9),
        },
        usdt: deploy_token(chain, "USDT", 6).await?,
        tka: deploy_token(chain, "TKA", 18).await?,
    })
}

fn spec(d: &Deployed, target: Option<TargetPrice>) -> PoolSpec {
    PoolSpec {
        token_a: d.usdt.clone(),
        token_b: d.tka.clone(),
        fee: FeeTier::Medium,
        target,
        scale: LiquidityScale {
            token_a: 1_000_000,
            token_b: 1_000_000,
        },
    }
}

fn raw_one_to_one() -> TargetPrice {
    TargetPrice {
        amount_a: "1".into(),
        amount_b: "1".into(),
        basis: PriceBasis::Raw,
    }
}

#[tokio::test]
async fn test_raw_parity_initializes_at_q96() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;

    let bootstrapper = PoolBootstrapper::new(&chain, d.amm);
    let (key, pool) = bootstrapper.bootstrap(&spec(&d, Some(raw_one_to_one())), None).await?;

    assert_eq!(pool.sqrt_price_x96, U256::one() << 96);
    assert_eq!(chain.pool_sqrt_price(pool.address).await?, U256::one() << 96);
    assert!(chain.pool_liquidity(pool.address).await? > 0);
    assert_eq!(pool.position_id, U256::one());
    assert_eq!(key.fee, 3000);

    let fetched = chain.get_pool(d.amm.factory, d.tka.address, d.usdt.address, 3000).await?;
    assert_eq!(fetched, pool.address);

    Ok(())
}

#[tokio::test]
async fn test_reinitializing_keeps_price_and_mints_again() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;
    let bootstrapper = PoolBootstrapper::new(&chain, d.amm);

    let (first_key, first) = bootstrapper.bootstrap(&spec(&d, Some(raw_one_to_one())), None).await?;
    let liquidity = chain.pool_liquidity(first.address).await?;

    // A different target does not move an initialized pool
    let (second_key, second) = bootstrapper.bootstrap(&spec(&d, None), Some(&first)).await?;

    assert_eq!(first_key, second_key);
    assert_eq!(first.address, second.address);
    assert_eq!(first.sqrt_price_x96, second.sqrt_price_x96);
    assert_eq!(second.position_id, first.position_id + 1);
    assert!(chain.pool_liquidity(second.address).await? > liquidity);

    Ok(())
}

#[tokio::test]
async fn test_initial_price_survives_trading() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;
    let bootstrapper = PoolBootstrapper::new(&chain, d.amm);

    let (_, first) = bootstrapper.bootstrap(&spec(&d, None), None).await?;
    assert_eq!(first.sqrt_price_x96, chain.pool_sqrt_price(first.address).await?);

    // Trading moved the price
    chain.set_pool_sqrt_price(first.address, first.sqrt_price_x96 * 2);

    let (_, kept) = bootstrapper.bootstrap(&spec(&d, None), Some(&first)).await?;
    assert_eq!(kept.sqrt_price_x96, first.sqrt_price_x96);

    // Nothing recorded for the pool: the live price is all there is
    let (_, adopted) = bootstrapper.bootstrap(&spec(&d, None), None).await?;
    assert_eq!(adopted.sqrt_price_x96, first.sqrt_price_x96 * 2);

    Ok(())
}

#[tokio::test]
async fn test_key_is_order_independent() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;
    let bootstrapper = PoolBootstrapper::new(&chain, d.amm);

    let (key, pool) = bootstrapper.bootstrap(&spec(&d, None), None).await?;

    let mut flipped = spec(&d, None);
    std::mem::swap(&mut flipped.token_a, &mut flipped.token_b);
    let (flipped_key, flipped_pool) = bootstrapper.bootstrap(&flipped, None).await?;

    assert_eq!(key, flipped_key);
    assert_eq!(pool.address, flipped_pool.address);

    Ok(())
}

#[tokio::test]
async fn test_wrapped_native_side_is_wrapped_on_demand() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;
    let weth9 = d.amm.weth9.unwrap();
    let native_before = chain.native_balance(chain.signer());

    let spec = PoolSpec {
        token_a: d.usdt.clone(),
        token_b: TokenRef::new("KAIA", weth9, 18),
        fee: FeeTier::Medium,
        target: Some(TargetPrice {
            amount_a: "0.15".into(),
            amount_b: "1".into(),
            basis: PriceBasis::Units,
        }),
        scale: LiquidityScale {
            token_a: 1_000_000,
            token_b: 100,
        },
    };
    let (_, pool) = PoolBootstrapper::new(&chain, d.amm).bootstrap(&spec, None).await?;

    let wrapped = U256::from(100u64) * U256::exp10(18);
    assert_eq!(chain.native_balance(chain.signer()), native_before - wrapped);
    assert!(chain.balance_of(weth9, pool.address).await? > U256::zero());

    Ok(())
}

#[tokio::test]
async fn test_bootstrap_approves_position_manager_once() -> Result<()> {
    let chain = SimulatedChain::new();
    let d = deploy(&chain).await?;
    let bootstrapper = PoolBootstrapper::new(&chain, d.amm);

    bootstrapper.bootstrap(&spec(&d, None), None).await?;
    assert_eq!(chain.approval_count(), 2);

    bootstrapper.bootstrap(&spec(&d, None), None).await?;
    assert_eq!(chain.approval_count(), 2);

    Ok(())
}
