//! Pool creation and seeding.

use dex_testbed_math::FeeTier;
use dex_testbed_types::{DeploymentRecord, PoolKey, TokenRef};
use tracing::info;

use super::{StageContext, StageOutcome, StageTracker};
use crate::bootstrap::{AmmAddresses, LiquidityScale, PoolBootstrapper, PoolSpec};
use crate::{ProvisionError, SdkResult};

pub(super) async fn run(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let mut session = ctx.store.session(ctx.network);
    let record = &session.record;

    let amm = AmmAddresses {
        factory: ctx.require("factory", record.factory).await?,
        position_manager: ctx.require("positionManager", record.position_manager).await?,
        weth9: ctx.live("weth9", record.weth9).await?,
    };

    // Resolve every pair before the first transaction
    let mut specs = Vec::with_capacity(ctx.config.pools.len());
    for pool in &ctx.config.pools {
        let token_a = resolve(ctx, record, &pool.token_a).await?;
        let token_b = resolve(ctx, record, &pool.token_b).await?;

        let key = PoolKey::for_pair(&token_a, &token_b, pool.fee)?;
        let label = pool.label();
        if ctx.options.skips_pool(&[label.as_str(), key.to_string().as_str()]) {
            info!(pool = %key, "Skipping pool");
            continue;
        }

        specs.push(PoolSpec {
            scale: LiquidityScale {
                token_a: ctx.config.liquidity_scale(&token_a.symbol),
                token_b: ctx.config.liquidity_scale(&token_b.symbol),
            },
            token_a,
            token_b,
            fee: FeeTier::try_from(pool.fee)?,
            target: pool.target.clone(),
        });
    }

    tracker.executing();
    let bootstrapper = PoolBootstrapper::new(ctx.gateway, amm);
    for spec in &specs {
        let key = PoolKey::for_pair(&spec.token_a, &spec.token_b, spec.fee.fee())?;
        let recorded = session.record.pool(&key).cloned();
        let (key, pool) = bootstrapper.bootstrap(spec, recorded.as_ref()).await?;
        info!(pool = %key, address = ?pool.address, position_id = %pool.position_id, "Pool recorded");
        session.record.set_pool(&key, pool);
        session.commit()?;
    }

    Ok(StageOutcome::Completed)
}

async fn resolve(
    ctx: &StageContext<'_>,
    record: &DeploymentRecord,
    symbol: &str,
) -> SdkResult<TokenRef> {
    let known = ctx.config.token(symbol).is_some() || ctx.config.native_alias.as_deref() == Some(symbol);
    if !known && record.token(symbol).is_none() {
        return Err(ProvisionError::UnknownToken(symbol.to_string()));
    }

    let address = ctx.require_token(record, symbol).await?;
    let decimals = ctx.gateway.decimals(address).await?;
    Ok(TokenRef::new(symbol, address, u32::from(decimals)))
}
