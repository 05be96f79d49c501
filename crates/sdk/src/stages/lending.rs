//! Lending mock: deployment and a permit-then-supply demo.

use dex_testbed_math::parse_units;
use dex_testbed_types::a_token_key;
use tracing::info;

use super::{StageContext, StageOutcome, StageTracker};
use crate::allowance::AllowanceManager;
use crate::gateway::Deployable;
use crate::utils::{format_units, to_u256};
use crate::SdkResult;

pub(super) async fn deploy(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let mut session = ctx.store.session(ctx.network);
    let symbol = ctx.config.lending.asset.as_str();
    let receipt_field = format!("aTokens.{}", a_token_key(symbol));

    let asset = ctx.require_token(&session.record, symbol).await?;

    let pool = match ctx.live("aavePool", session.record.aave_pool).await? {
        Some(pool) => {
            if ctx.live(&receipt_field, session.record.a_token(symbol)).await?.is_some() {
                return Ok(StageOutcome::AlreadyRecorded);
            }
            pool
        }
        None => {
            let decimals = ctx.decimals_or(asset, symbol, ctx.config.lending.default_decimals).await;
            let pool = ctx.deploy(tracker, Deployable::LendingPool { asset, decimals }).await?;
            session.record.aave_pool = Some(pool);
            session.commit()?;
            pool
        }
    };

    let a_token = ctx.gateway.a_token(pool).await?;
    session.record.set_a_token(symbol, a_token);
    session.commit()?;

    info!(?pool, receipt = %a_token_key(symbol), ?a_token, "Lending pool ready");
    Ok(StageOutcome::Completed)
}

pub(super) async fn demo(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let record = ctx.store.load(ctx.network);
    let symbol = ctx.config.lending.asset.as_str();

    let asset = ctx.require_token(&record, symbol).await?;
    let pool = ctx.require("aavePool", record.aave_pool).await?;
    let a_token = ctx
        .require(&format!("aTokens.{}", a_token_key(symbol)), record.a_token(symbol))
        .await?;

    let decimals = ctx.decimals_or(asset, symbol, ctx.config.lending.default_decimals).await;
    let amount = to_u256(&parse_units(&ctx.config.lending.supply_amount, u32::from(decimals))?)?;
    let signer = ctx.gateway.signer();

    tracker.executing();
    AllowanceManager::new(ctx.gateway).permit(asset, pool, amount, None).await?;

    info!(symbol, amount = %format_units(amount, decimals), ?pool, "Supplying");
    ctx.gateway.supply(pool, asset, amount, signer).await?;

    let receipt = ctx.gateway.balance_of(a_token, signer).await?;
    info!(
        receipt = %a_token_key(symbol),
        balance = %format_units(receipt, decimals),
        "Receipt token balance"
    );

    Ok(StageOutcome::Completed)
}
