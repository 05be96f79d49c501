//! Demo swaps through the seeded pools, one in each direction.

use dex_testbed_math::scale_units;
use dex_testbed_types::{PoolKey, TokenRef};
use ethers::types::{Address, U256};
use tracing::info;

use super::{StageContext, StageOutcome, StageTracker};
use crate::allowance::AllowanceManager;
use crate::bootstrap::MINT_DEADLINE_SECS;
use crate::gateway::SwapRequest;
use crate::utils::{deadline_in, format_units, to_u256};
use crate::{ProvisionError, SdkResult};

struct SwapLeg {
    key: PoolKey,
    fee: u32,
    token_a: TokenRef,
    token_b: TokenRef,
}

pub(super) async fn run(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let record = ctx.store.load(ctx.network);
    let router = ctx.require("swapRouter", record.swap_router).await?;
    let weth9 = ctx.live("weth9", record.weth9).await?;

    let mut legs = Vec::with_capacity(ctx.config.swaps.pools.len());
    for label in &ctx.config.swaps.pools {
        let pool = ctx
            .config
            .pool_by_label(label)
            .ok_or_else(|| ProvisionError::config(format!("Swap pool '{}' is not configured", label)))?;

        let address_a = ctx.require_token(&record, &pool.token_a).await?;
        let address_b = ctx.require_token(&record, &pool.token_b).await?;
        let token_a = TokenRef::new(&pool.token_a, address_a, u32::from(ctx.gateway.decimals(address_a).await?));
        let token_b = TokenRef::new(&pool.token_b, address_b, u32::from(ctx.gateway.decimals(address_b).await?));

        let key = PoolKey::for_pair(&token_a, &token_b, pool.fee)?;
        let recorded = record.pool(&key).map(|p| p.address);
        ctx.require(&format!("pools.{}", key), recorded).await?;

        legs.push(SwapLeg {
            key,
            fee: pool.fee,
            token_a,
            token_b,
        });
    }

    tracker.executing();
    let allowances = AllowanceManager::new(ctx.gateway);
    let forward = ctx.config.swaps.forward_amount;
    let reverse = ctx.config.swaps.reverse_amount;

    for leg in &legs {
        allowances.approve_max(leg.token_a.address, router).await?;
        allowances.approve_max(leg.token_b.address, router).await?;

        info!(pool = %leg.key, "Swapping {} {} for {}", forward, leg.token_a.symbol, leg.token_b.symbol);
        swap(ctx, router, weth9, leg.fee, &leg.token_a, &leg.token_b, forward).await?;

        info!(pool = %leg.key, "Swapping {} {} for {}", reverse, leg.token_b.symbol, leg.token_a.symbol);
        swap(ctx, router, weth9, leg.fee, &leg.token_b, &leg.token_a, reverse).await?;

        log_balances(ctx, leg).await?;
    }

    Ok(StageOutcome::Completed)
}

async fn swap(
    ctx: &StageContext<'_>,
    router: Address,
    weth9: Option<Address>,
    fee: u32,
    token_in: &TokenRef,
    token_out: &TokenRef,
    whole_tokens: u64,
) -> SdkResult<()> {
    let signer = ctx.gateway.signer();
    let amount_in = to_u256(&scale_units(whole_tokens, token_in.decimals))?;

    if weth9 == Some(token_in.address) {
        let balance = ctx.gateway.balance_of(token_in.address, signer).await?;
        if balance < amount_in {
            ctx.gateway.deposit(token_in.address, amount_in - balance).await?;
        }
    }

    let request = SwapRequest {
        token_in: token_in.address,
        token_out: token_out.address,
        fee,
        recipient: signer,
        deadline: deadline_in(MINT_DEADLINE_SECS),
        amount_in,
        amount_out_minimum: U256::zero(),
        sqrt_price_limit_x96: U256::zero(),
    };
    ctx.gateway.exact_input_single(router, &request).await?;
    Ok(())
}

async fn log_balances(ctx: &StageContext<'_>, leg: &SwapLeg) -> SdkResult<()> {
    let signer = ctx.gateway.signer();
    for token in [&leg.token_a, &leg.token_b] {
        let balance = ctx.gateway.balance_of(token.address, signer).await?;
        info!(
            pool = %leg.key,
            symbol = %token.symbol,
            balance = %format_units(balance, token.decimals as u8),
            "Balance after swaps"
        );
    }
    Ok(())
}
